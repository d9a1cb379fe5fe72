//! 命令定义和实现

pub mod checksum;
pub mod decode;
pub mod inspect;
pub mod params;
pub mod simulate;

pub use checksum::ChecksumCommand;
pub use decode::DecodeCommand;
pub use inspect::InspectCommand;
pub use params::ParamsCommand;
pub use simulate::SimulateCommand;

use anyhow::{Context, Result};

/// 解析十六进制地址（可带 `0x` 前缀）
pub(crate) fn parse_address(input: &str) -> Result<u32> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    u32::from_str_radix(digits, 16).with_context(|| format!("无效的 CAN 地址: {input}"))
}

/// 解析十六进制负载（允许空格分隔）
pub(crate) fn parse_payload(input: &str) -> Result<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let data = hex::decode(&compact).with_context(|| format!("无效的十六进制负载: {input}"))?;
    if data.is_empty() || data.len() > 8 {
        anyhow::bail!("负载长度必须在 1-8 字节之间，当前: {}", data.len());
    }
    Ok(data)
}
