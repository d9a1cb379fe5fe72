//! 校验和与滚动计数器
//!
//! 平台报文统一布局：
//! - 最后一个字节为 CRC-8 校验和
//! - 倒数第二个字节的低 4 位为滚动计数器
//!
//! CRC 多项式与 SAE J1850 同族，但初值为 0、无输入/输出反射，
//! 输出异或值按报文地址查表（未知地址使用 [`DEFAULT_FINAL_XOR`]）。

/// CRC-8 生成多项式
pub const CRC8_POLY: u8 = 0x2F;

/// CRC-8 查找表（编译期生成）
pub const CRC8_LUT: [u8; 256] = build_crc8_lut(CRC8_POLY);

/// 未知地址使用的输出异或值
pub const DEFAULT_FINAL_XOR: u8 = 0x00;

/// 按地址的输出异或值
const FINAL_XOR_TABLE: &[(u32, u8)] = &[(0xFF, 0xFF)];

/// 滚动计数器模数（4 位）
pub const COUNTER_MODULUS: u8 = 16;

const fn build_crc8_lut(poly: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ poly
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// 查询地址对应的输出异或值
pub fn final_xor(address: u32) -> u8 {
    FINAL_XOR_TABLE
        .iter()
        .find(|(addr, _)| *addr == address)
        .map(|(_, xor)| *xor)
        .unwrap_or(DEFAULT_FINAL_XOR)
}

/// 计算报文校验和
///
/// `data` 为完整报文负载（包含末尾的校验和字节），计算时跳过最后一个字节，
/// 因此校验和字节当前的内容不影响结果。
///
/// # 示例
///
/// ```rust
/// use giorgio_protocol::checksum;
///
/// let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0x00];
/// assert_eq!(checksum(0x1F6, &data), 0x5A);
/// ```
pub fn checksum(address: u32, data: &[u8]) -> u8 {
    let payload = match data.split_last() {
        Some((_, payload)) => payload,
        None => &[],
    };

    let crc = payload
        .iter()
        .fold(0u8, |crc, byte| CRC8_LUT[(crc ^ byte) as usize]);

    crc ^ final_xor(address)
}

/// 读取报文中的校验和字节
pub fn read_checksum(data: &[u8]) -> Option<u8> {
    data.last().copied()
}

/// 校验报文（最后一个字节与计算值一致）
pub fn verify_checksum(address: u32, data: &[u8]) -> bool {
    read_checksum(data) == Some(checksum(address, data))
}

/// 读取滚动计数器（倒数第二个字节的低 4 位）
pub fn read_counter(data: &[u8]) -> Option<u8> {
    let index = data.len().checked_sub(2)?;
    data.get(index).map(|byte| byte & 0x0F)
}

/// 写入滚动计数器（只修改倒数第二个字节的低 4 位）
///
/// 负载长度小于 2 时不做任何修改。
pub fn write_counter(data: &mut [u8], counter: u8) {
    let Some(index) = data.len().checked_sub(2) else {
        return;
    };
    if let Some(byte) = data.get_mut(index) {
        *byte = (*byte & 0xF0) | (counter & 0x0F);
    }
}

/// 4 位滚动计数器
///
/// 编解码器不持有计数器状态；调用方（帧组装器）为每个报文保存一个实例，
/// 每次发送前调用 [`RollingCounter::advance`]。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RollingCounter {
    value: u8,
}

impl RollingCounter {
    /// 以指定初值创建（自动取低 4 位）
    pub fn new(value: u8) -> Self {
        Self {
            value: value % COUNTER_MODULUS,
        }
    }

    /// 当前值
    pub fn value(self) -> u8 {
        self.value
    }

    /// 计算下一个计数值（不修改自身）
    pub fn next_after(value: u8) -> u8 {
        (value.wrapping_add(1)) % COUNTER_MODULUS
    }

    /// 递增并返回新值
    pub fn advance(&mut self) -> u8 {
        self.value = Self::next_after(self.value);
        self.value
    }
}
