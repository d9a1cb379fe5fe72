//! # Giorgio Protocol
//!
//! FCA Giorgio 平台 CAN 总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: CAN 地址、报文名称与总线编号常量
//! - `checksum`: CRC-8 校验和与 4 位滚动计数器
//! - `dbc`: 信号数据库（按报文名称编码/解码字段）
//! - `catalog`: 平台报文目录
//!
//! ## 位序
//!
//! 平台信号使用 Motorola (MSB) 高位在前的位序，
//! 位编号从 Byte 0 的最高位开始线性递增（见 [`dbc`]）。

pub mod catalog;
pub mod checksum;
pub mod dbc;
pub mod ids;

// 重新导出常用类型
pub use checksum::*;
pub use dbc::*;
pub use ids::*;

/// CAN 2.0 标准帧（带总线编号）
///
/// # 设计目的
///
/// `CanFrame` 是决策层与传输层之间的中间抽象：
/// - 控制器只产出字段映射（见 `giorgio-car` 的 `OutgoingFrame`）
/// - 编码阶段把字段映射打包成 `CanFrame`
/// - 传输层（不在本 workspace 内）负责把 `CanFrame` 放上总线
///
/// # 设计特性
///
/// - **Copy trait**：零成本复制，适合 100Hz 周期内的批量构建
/// - **固定 8 字节**：避免堆分配
///
/// # 示例
///
/// ```rust
/// use giorgio_protocol::CanFrame;
///
/// let frame = CanFrame::new(0x1F6, 0, &[1, 2, 3]);
/// assert_eq!(frame.address(), 0x1F6);
/// assert_eq!(frame.data_slice(), &[1, 2, 3]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanFrame {
    /// CAN 地址（11-bit 标准帧）
    pub address: u32,

    /// 总线编号（0 = 动力总线，2 = 摄像头总线）
    pub bus: u8,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,
}

impl CanFrame {
    /// 创建标准帧
    ///
    /// 超过 8 字节的数据会被截断。
    pub fn new(address: u32, bus: u8, data: &[u8]) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            address,
            bus,
            data: fixed_data,
            len: len as u8,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 获取 CAN 地址
    pub fn address(&self) -> u32 {
        self.address
    }

    /// 获取总线编号
    pub fn bus(&self) -> u8 {
        self.bus
    }
}

use thiserror::Error;

/// 协议错误类型
///
/// 这些错误都属于配置错误：报文或字段名在目录中不存在、
/// 数值超出信号位宽。会话启动时应当暴露，不在周期内恢复。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid frame length for {message}: expected {expected}, got {actual}")]
    InvalidLength {
        message: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown CAN address: 0x{address:X}")]
    UnknownAddress { address: u32 },

    #[error("Unknown message: {name}")]
    UnknownMessage { name: String },

    #[error("Unknown signal {signal} in message {message}")]
    UnknownSignal { message: String, signal: String },

    #[error("Value {value} out of range for signal {signal} ({min}..={max})")]
    ValueOutOfRange {
        signal: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid bus number: {bus}")]
    InvalidBus { bus: u8 },

    #[error("Invalid message catalog: {0}")]
    InvalidCatalog(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_frame_new() {
        let frame = CanFrame::new(0x2FA, 2, &[0xAA, 0xBB, 0xCC]);
        assert_eq!(frame.address(), 0x2FA);
        assert_eq!(frame.bus(), 2);
        assert_eq!(frame.len, 3);
        assert_eq!(frame.data_slice(), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(frame.data, [0xAA, 0xBB, 0xCC, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_can_frame_truncates_long_payload() {
        let frame = CanFrame::new(0x1F6, 0, &[1; 12]);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.data_slice().len(), 8);
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::UnknownSignal {
            message: "LKA_COMMAND".to_string(),
            signal: "FOO".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown signal FOO in message LKA_COMMAND");

        let err = ProtocolError::UnknownAddress { address: 0x1F6 };
        assert_eq!(err.to_string(), "Unknown CAN address: 0x1F6");
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn test_can_frame_json() {
        let frame = CanFrame::new(0x1F6, 0, &[0x01, 0x02]);
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"address\":502"));
        let back: CanFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
        assert_eq!(back.data_slice(), &[0x01, 0x02]);
    }

    #[test]
    fn test_can_bus_json() {
        assert_eq!(serde_json::to_string(&CanBus::Camera).unwrap(), "\"Camera\"");
        let bus: CanBus = serde_json::from_str("\"Powertrain\"").unwrap();
        assert_eq!(bus, CanBus::Powertrain);
    }
}
