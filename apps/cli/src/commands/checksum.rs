//! checksum 命令
//!
//! 计算一帧的 CRC-8 校验和，并与帧末字节比较

use anyhow::Result;
use clap::Args;
use giorgio_protocol::{Dbc, checksum, read_checksum, read_counter};

use super::{parse_address, parse_payload};

/// 校验和命令参数
#[derive(Args, Debug)]
pub struct ChecksumCommand {
    /// CAN 地址（十六进制，例如 0x1F6）
    #[arg(short, long)]
    pub address: String,

    /// 完整负载（十六进制，包含末尾的校验和字节）
    #[arg(short, long)]
    pub data: String,

    /// 输出写入正确校验和后的负载
    #[arg(long)]
    pub fix: bool,
}

/// 单帧校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumReport {
    pub address: u32,
    pub expected: u8,
    pub actual: Option<u8>,
    pub counter: Option<u8>,
    pub fixed: Vec<u8>,
}

impl ChecksumReport {
    pub fn compute(address: u32, data: &[u8]) -> Self {
        let expected = checksum(address, data);
        let mut fixed = data.to_vec();
        if let Some(last) = fixed.last_mut() {
            *last = expected;
        }

        Self {
            address,
            expected,
            actual: read_checksum(data),
            counter: read_counter(data),
            fixed,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.actual == Some(self.expected)
    }
}

impl ChecksumCommand {
    pub fn execute(&self) -> Result<()> {
        let address = parse_address(&self.address)?;
        let data = parse_payload(&self.data)?;
        let report = ChecksumReport::compute(address, &data);

        let name = Dbc::fca_giorgio()
            .messages()
            .iter()
            .find(|m| m.address == address)
            .map_or("<unknown>", |m| m.name);

        println!("报文:     0x{:03X} ({})", address, name);
        println!("负载:     {}", hex::encode_upper(&data));
        if let Some(counter) = report.counter {
            println!("计数器:   {}", counter);
        }
        println!("计算值:   0x{:02X}", report.expected);
        if let Some(actual) = report.actual {
            println!("帧末字节: 0x{:02X}", actual);
        }

        if report.is_valid() {
            println!("✅ 校验和正确");
        } else {
            println!("❌ 校验和不匹配");
        }

        if self.fix {
            println!("修正后:   {}", hex::encode_upper(&report.fixed));
        }

        Ok(())
    }
}
