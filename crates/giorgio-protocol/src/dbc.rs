//! 信号数据库
//!
//! 按报文名称把字段映射编码为原始字节、把原始字节解码为字段映射。
//!
//! # 位编号
//!
//! 信号位置使用 Motorola 线性位编号：Byte 0 的 Bit 7 为位置 0，
//! Byte 0 的 Bit 0 为位置 7，Byte 1 的 Bit 7 为位置 8，以此类推。
//! 一个信号占据 `[start, start + size)`，高位在前。
//!
//! ```text
//! EPS_3.EPS_TORQUE (start = 0, size = 12):
//!   raw = (data[0] << 4) | (data[1] >> 4)
//! ```

use std::collections::BTreeMap;

use crate::catalog::FCA_GIORGIO_MESSAGES;
use crate::ids::{SIG_CHECKSUM, SIG_COUNTER};
use crate::{CanFrame, ProtocolError};

/// 字段名 → 物理值
pub type SignalValues = BTreeMap<String, f64>;

/// 信号定义
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalDef {
    /// 信号名称
    pub name: &'static str,
    /// 起始位（Motorola 线性位编号）
    pub start: u16,
    /// 位宽（1-32）
    pub size: u8,
    /// 是否为有符号（二进制补码）
    pub signed: bool,
    /// 缩放系数：物理值 = 原始值 * factor + offset
    pub factor: f64,
    /// 偏移量
    pub offset: f64,
    /// 数值表（原始值 → 标签）
    pub value_table: &'static [(i64, &'static str)],
}

impl SignalDef {
    /// 无缩放、无偏移的无符号信号
    pub const fn raw(name: &'static str, start: u16, size: u8) -> Self {
        Self {
            name,
            start,
            size,
            signed: false,
            factor: 1.0,
            offset: 0.0,
            value_table: &[],
        }
    }

    /// 带缩放/偏移的信号
    pub const fn scaled(name: &'static str, start: u16, size: u8, factor: f64, offset: f64) -> Self {
        Self {
            name,
            start,
            size,
            signed: false,
            factor,
            offset,
            value_table: &[],
        }
    }

    /// 有符号信号
    pub const fn signed(name: &'static str, start: u16, size: u8, factor: f64) -> Self {
        Self {
            name,
            start,
            size,
            signed: true,
            factor,
            offset: 0.0,
            value_table: &[],
        }
    }

    /// 附加数值表
    pub const fn with_values(mut self, table: &'static [(i64, &'static str)]) -> Self {
        self.value_table = table;
        self
    }

    /// 结束位（不含）
    pub fn end(&self) -> usize {
        self.start as usize + self.size as usize
    }

    /// 原始值范围（含端点）
    pub fn raw_range(&self) -> (i64, i64) {
        if self.signed {
            let half = 1i64 << (self.size - 1);
            (-half, half - 1)
        } else {
            (0, (1i64 << self.size) - 1)
        }
    }

    /// 物理值范围（含端点）
    pub fn physical_range(&self) -> (f64, f64) {
        let (lo, hi) = self.raw_range();
        let a = lo as f64 * self.factor + self.offset;
        let b = hi as f64 * self.factor + self.offset;
        (a.min(b), a.max(b))
    }

    /// 物理值 → 原始位模式
    pub fn to_raw(&self, value: f64) -> Result<u64, ProtocolError> {
        let raw = ((value - self.offset) / self.factor).round();
        let (lo, hi) = self.raw_range();
        if !raw.is_finite() || raw < lo as f64 || raw > hi as f64 {
            let (min, max) = self.physical_range();
            return Err(ProtocolError::ValueOutOfRange {
                signal: self.name.to_string(),
                value,
                min,
                max,
            });
        }

        let raw = raw as i64;
        let mask = (1u64 << self.size) - 1;
        Ok((raw as u64) & mask)
    }

    /// 原始位模式 → 物理值
    pub fn to_physical(&self, raw: u64) -> f64 {
        self.raw_value(raw) as f64 * self.factor + self.offset
    }

    /// 原始位模式 → 带符号原始值（数值表查询使用此值）
    pub fn raw_value(&self, raw: u64) -> i64 {
        if self.signed && raw & (1u64 << (self.size - 1)) != 0 {
            raw as i64 - (1i64 << self.size)
        } else {
            raw as i64
        }
    }

    /// 查询数值表标签
    pub fn label(&self, raw: i64) -> Option<&'static str> {
        self.value_table
            .iter()
            .find(|(value, _)| *value == raw)
            .map(|(_, label)| *label)
    }
}

/// 报文定义
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageDef {
    /// 报文名称
    pub name: &'static str,
    /// CAN 地址
    pub address: u32,
    /// 负载长度（字节）
    pub len: u8,
    /// 信号列表
    pub signals: &'static [SignalDef],
}

impl MessageDef {
    /// 按名称查找信号
    pub fn signal(&self, name: &str) -> Option<&SignalDef> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// 是否带滚动计数器
    pub fn has_counter(&self) -> bool {
        self.signal(SIG_COUNTER).is_some()
    }

    /// 是否带校验和
    pub fn has_checksum(&self) -> bool {
        self.signal(SIG_CHECKSUM).is_some()
    }

    fn unknown_signal(&self, signal: &str) -> ProtocolError {
        ProtocolError::UnknownSignal {
            message: self.name.to_string(),
            signal: signal.to_string(),
        }
    }

    /// 编码字段映射
    ///
    /// 未给出的信号按原始值 0 填充；映射中出现目录里没有的字段视为配置错误。
    pub fn encode(&self, values: &SignalValues) -> Result<Vec<u8>, ProtocolError> {
        let mut data = vec![0u8; self.len as usize];
        for (name, value) in values {
            let signal = self.signal(name).ok_or_else(|| self.unknown_signal(name))?;
            let raw = signal.to_raw(*value)?;
            insert_bits(&mut data, signal.start, signal.size, raw);
        }
        Ok(data)
    }

    /// 解码原始字节
    pub fn decode(&self, data: &[u8]) -> Result<SignalValues, ProtocolError> {
        if data.len() < self.len as usize {
            return Err(ProtocolError::InvalidLength {
                message: self.name.to_string(),
                expected: self.len as usize,
                actual: data.len(),
            });
        }

        Ok(self
            .signals
            .iter()
            .map(|signal| {
                let raw = extract_bits(data, signal.start, signal.size);
                (signal.name.to_string(), signal.to_physical(raw))
            })
            .collect())
    }
}

/// 信号数据库
///
/// 控制器只通过此 trait 访问报文布局，便于在测试中替换。
pub trait SignalDatabase {
    /// 按名称查找报文
    fn message(&self, name: &str) -> Option<&MessageDef>;

    /// 按地址查找报文
    fn message_by_address(&self, address: u32) -> Option<&MessageDef>;

    /// 按名称查找报文，找不到时返回配置错误
    fn require(&self, name: &str) -> Result<&MessageDef, ProtocolError> {
        self.message(name).ok_or_else(|| ProtocolError::UnknownMessage {
            name: name.to_string(),
        })
    }

    /// 编码：报文名 + 字段映射 → 原始字节
    fn encode(&self, name: &str, values: &SignalValues) -> Result<Vec<u8>, ProtocolError> {
        self.require(name)?.encode(values)
    }

    /// 解码：报文名 + 原始字节 → 字段映射
    fn decode(&self, name: &str, data: &[u8]) -> Result<SignalValues, ProtocolError> {
        self.require(name)?.decode(data)
    }

    /// 查询信号数值表标签
    fn value_label(&self, message: &str, signal: &str, raw: i64) -> Option<&'static str> {
        self.message(message)?.signal(signal)?.label(raw)
    }
}

/// 基于静态报文表的信号数据库
#[derive(Debug, Clone, Copy)]
pub struct Dbc {
    messages: &'static [MessageDef],
}

impl Dbc {
    /// 使用自定义报文表创建
    pub const fn new(messages: &'static [MessageDef]) -> Self {
        Self { messages }
    }

    /// FCA Giorgio 平台报文表
    pub const fn fca_giorgio() -> Self {
        Self::new(FCA_GIORGIO_MESSAGES)
    }

    /// 全部报文
    pub fn messages(&self) -> &'static [MessageDef] {
        self.messages
    }

    /// 解码整帧（按地址定位报文）
    pub fn decode_frame(
        &self,
        frame: &CanFrame,
    ) -> Result<(&'static MessageDef, SignalValues), ProtocolError> {
        let message = self
            .messages
            .iter()
            .find(|m| m.address == frame.address)
            .ok_or(ProtocolError::UnknownAddress {
                address: frame.address,
            })?;
        let values = message.decode(frame.data_slice())?;
        Ok((message, values))
    }

    /// 检查报文表布局
    ///
    /// 返回第一个越界信号的错误；名称或地址重复也视为错误。
    pub fn validate(&self) -> Result<(), ProtocolError> {
        for (i, message) in self.messages.iter().enumerate() {
            if self.messages[..i]
                .iter()
                .any(|other| other.address == message.address || other.name == message.name)
            {
                return Err(ProtocolError::InvalidCatalog(format!(
                    "duplicate definition of {} (0x{:X})",
                    message.name, message.address
                )));
            }
            for signal in message.signals {
                if signal.size == 0 || signal.size > 32 || signal.end() > message.len as usize * 8 {
                    return Err(ProtocolError::InvalidLength {
                        message: format!("{}.{}", message.name, signal.name),
                        expected: message.len as usize * 8,
                        actual: signal.end(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for Dbc {
    fn default() -> Self {
        Self::fca_giorgio()
    }
}

impl SignalDatabase for Dbc {
    fn message(&self, name: &str) -> Option<&MessageDef> {
        self.messages.iter().find(|m| m.name == name)
    }

    fn message_by_address(&self, address: u32) -> Option<&MessageDef> {
        self.messages.iter().find(|m| m.address == address)
    }
}

/// 写入位段（Motorola 线性位编号，高位在前）
///
/// 超出 `data` 的位被忽略；报文表经过 [`Dbc::validate`] 检查后不会出现。
pub fn insert_bits(data: &mut [u8], start: u16, size: u8, raw: u64) {
    for i in 0..size as usize {
        let bit = ((raw >> (size as usize - 1 - i)) & 1) as u8;
        let pos = start as usize + i;
        let shift = 7 - (pos % 8);
        if let Some(byte) = data.get_mut(pos / 8) {
            *byte = (*byte & !(1 << shift)) | (bit << shift);
        }
    }
}

/// 读取位段（Motorola 线性位编号，高位在前）
pub fn extract_bits(data: &[u8], start: u16, size: u8) -> u64 {
    (0..size as usize).fold(0u64, |acc, i| {
        let pos = start as usize + i;
        let shift = 7 - (pos % 8);
        let bit = data.get(pos / 8).map_or(0, |byte| (byte >> shift) & 1);
        (acc << 1) | bit as u64
    })
}
