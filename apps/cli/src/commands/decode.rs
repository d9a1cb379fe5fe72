//! decode 命令
//!
//! 按平台报文表解码一帧

use anyhow::{Context, Result};
use clap::Args;
use giorgio_protocol::{CanFrame, Dbc, SignalValues, extract_bits, verify_checksum};

use super::{parse_address, parse_payload};

/// 解码命令参数
#[derive(Args, Debug)]
pub struct DecodeCommand {
    /// CAN 地址（十六进制）
    #[arg(short, long)]
    pub address: String,

    /// 负载（十六进制）
    #[arg(short, long)]
    pub data: String,

    /// 以 JSON 输出字段
    #[arg(long)]
    pub json: bool,
}

/// 单帧解码结果
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub message: &'static str,
    pub address: u32,
    pub len: u8,
    /// 按报文表顺序：(字段, 物理值, 数值表标签)
    pub fields: Vec<(&'static str, f64, Option<&'static str>)>,
    /// 报文不带校验和时为 `None`
    pub checksum_ok: Option<bool>,
}

impl DecodedFrame {
    pub fn values(&self) -> SignalValues {
        self.fields
            .iter()
            .map(|(name, value, _)| (name.to_string(), *value))
            .collect()
    }
}

/// 按地址定位报文并解码
pub fn decode_payload(address: u32, data: &[u8]) -> Result<DecodedFrame> {
    let frame = CanFrame::new(address, 0, data);
    let (message, values) = Dbc::fca_giorgio()
        .decode_frame(&frame)
        .with_context(|| format!("无法解码 0x{address:03X}"))?;

    let fields = message
        .signals
        .iter()
        .map(|signal| {
            let value = values.get(signal.name).copied().unwrap_or_default();
            let raw = signal.raw_value(extract_bits(data, signal.start, signal.size));
            (signal.name, value, signal.label(raw))
        })
        .collect();

    Ok(DecodedFrame {
        message: message.name,
        address: message.address,
        len: message.len,
        fields,
        checksum_ok: message.has_checksum().then(|| verify_checksum(address, data)),
    })
}

impl DecodeCommand {
    pub fn execute(&self) -> Result<()> {
        let address = parse_address(&self.address)?;
        let data = parse_payload(&self.data)?;
        let decoded = decode_payload(address, &data)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&decoded.values())?);
            return Ok(());
        }

        println!("{} (0x{:03X}, {} 字节)", decoded.message, decoded.address, decoded.len);
        for (name, value, label) in &decoded.fields {
            match label {
                Some(label) => println!("  {:<24} {} ({})", name, value, label),
                None => println!("  {:<24} {}", name, value),
            }
        }

        match decoded.checksum_ok {
            Some(true) => println!("✅ 校验和正确"),
            Some(false) => println!("⚠️  校验和不匹配"),
            None => {},
        }

        Ok(())
    }
}
