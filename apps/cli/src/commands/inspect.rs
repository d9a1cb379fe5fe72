//! inspect 命令
//!
//! 读取 `simulate --record` 录制的帧日志，按报文/总线过滤，
//! 并用报文表重新校验每一帧

use anyhow::Result;
use clap::Args;
use giorgio_tools::FrameLog;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::decode::decode_payload;

/// 日志检查命令参数
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// 帧日志文件（JSON Lines）
    #[arg(short, long)]
    pub log: PathBuf,

    /// 只看此报文
    #[arg(short, long)]
    pub message: Option<String>,

    /// 只看此总线
    #[arg(short, long)]
    pub bus: Option<u8>,

    /// 逐帧打印
    #[arg(short, long)]
    pub verbose: bool,
}

/// 检查结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectReport {
    pub frames: usize,
    pub cycle_span: u64,
    pub per_message: BTreeMap<String, usize>,
    /// 校验和错误或负载与录制字段不一致的帧：(周期, 报文)
    pub failures: Vec<(u64, String)>,
}

/// 按条件过滤日志
pub fn select(log: &FrameLog, message: Option<&str>, bus: Option<u8>) -> FrameLog {
    let log = match message {
        Some(message) => log.filter_by_message(message),
        None => log.clone(),
    };
    match bus {
        Some(bus) => log.filter_by_bus(bus),
        None => log,
    }
}

/// 重新解码每一帧，检查校验和与录制的字段
pub fn inspect_log(log: &FrameLog) -> Result<InspectReport> {
    let mut report = InspectReport {
        frames: log.frame_count(),
        cycle_span: log.cycle_span(),
        ..Default::default()
    };

    for frame in &log.frames {
        *report.per_message.entry(frame.message.clone()).or_default() += 1;

        let data = frame.data()?;
        let decoded = decode_payload(frame.address, &data)?;
        let values = decoded.values();
        let consistent = decoded.message == frame.message
            && frame.fields.iter().all(|(name, value)| values.get(name) == Some(value));
        if decoded.checksum_ok == Some(false) || !consistent {
            report.failures.push((frame.cycle, frame.message.clone()));
        }
    }

    Ok(report)
}

impl InspectCommand {
    pub fn execute(&self) -> Result<()> {
        let log = FrameLog::load(&self.log)?;
        let selected = select(&log, self.message.as_deref(), self.bus);

        println!("📁 日志: {}", self.log.display());
        println!("   场景: {}  录制时间: {}", log.metadata.scenario, log.metadata.start_time);

        if self.verbose {
            for frame in &selected.frames {
                println!(
                    "{:>6}  can{}  {:03X}  {:<12} {}",
                    frame.cycle, frame.bus, frame.address, frame.message, frame.data_hex
                );
            }
        }

        let report = inspect_log(&selected)?;
        println!(
            "   帧数: {} / {}（覆盖 {} 周期）",
            report.frames,
            log.frame_count(),
            report.cycle_span
        );
        for (message, count) in &report.per_message {
            println!("   • {:<12} {}", message, count);
        }

        if report.failures.is_empty() {
            println!("✅ 全部帧校验通过");
            Ok(())
        } else {
            for (cycle, message) in &report.failures {
                println!("❌ 周期 {} 的 {} 校验失败", cycle, message);
            }
            anyhow::bail!("{} 帧校验失败", report.failures.len());
        }
    }
}
