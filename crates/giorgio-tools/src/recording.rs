//! # 帧日志
//!
//! 控制器输出帧的录制格式，所有工具共用。
//!
//! 格式：JSON Lines
//!
//! ```text
//! {"magic":"GIORGIO_FRAMELOG","version":1,...}      ← 第一行：元数据
//! {"cycle":0,"message":"LKA_COMMAND","bus":0,...}   ← 之后每行一帧
//! ...
//! ```

use anyhow::{Context, Result};
use giorgio_car::OutgoingFrame;
use giorgio_protocol::{CanFrame, SignalValues};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// 帧日志魔数（元数据行中的标识）
pub const MAGIC: &str = "GIORGIO_FRAMELOG";

/// 当前格式版本
pub const VERSION: u8 = 1;

/// 帧日志
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameLog {
    /// 元数据
    pub metadata: LogMetadata,

    /// 按周期顺序排列的帧
    pub frames: Vec<RecordedFrame>,
}

impl FrameLog {
    /// 创建新的日志
    pub fn new(metadata: LogMetadata) -> Self {
        Self {
            metadata,
            frames: Vec::new(),
        }
    }

    /// 添加帧
    pub fn add_frame(&mut self, frame: RecordedFrame) {
        self.frames.push(frame);
    }

    /// 记录一个周期的输出
    ///
    /// `encoded` 为同一批帧打包后的结果，顺序与 `frames` 一致。
    pub fn record_cycle(&mut self, cycle: u64, frames: &[OutgoingFrame], encoded: &[CanFrame]) {
        for (frame, can) in frames.iter().zip(encoded) {
            self.add_frame(RecordedFrame::new(cycle, frame, can));
        }
    }

    /// 获取帧数量
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// 覆盖的周期数（最后一帧周期 + 1）
    pub fn cycle_span(&self) -> u64 {
        self.frames.last().map_or(0, |f| f.cycle + 1)
    }

    /// 按报文过滤
    pub fn filter_by_message(&self, message: &str) -> FrameLog {
        self.filtered(|f| f.message == message)
    }

    /// 按总线过滤
    pub fn filter_by_bus(&self, bus: u8) -> FrameLog {
        self.filtered(|f| f.bus == bus)
    }

    fn filtered(&self, keep: impl Fn(&RecordedFrame) -> bool) -> FrameLog {
        FrameLog {
            metadata: self.metadata.clone(),
            frames: self.frames.iter().filter(|f| keep(f)).cloned().collect(),
        }
    }

    /// 保存到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).context("创建帧日志文件失败")?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer(&mut writer, &self.metadata).context("写入元数据失败")?;
        writer.write_all(b"\n").context("写入元数据失败")?;

        for frame in &self.frames {
            serde_json::to_writer(&mut writer, frame).context("写入帧失败")?;
            writer.write_all(b"\n").context("写入帧失败")?;
        }

        writer.flush().context("刷新缓冲区失败")?;

        Ok(())
    }

    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).context("打开帧日志文件失败")?;
        let mut lines = BufReader::new(file).lines();

        let header = lines
            .next()
            .context("帧日志为空")?
            .context("读取元数据失败")?;
        let metadata: LogMetadata = serde_json::from_str(&header).context("解析元数据失败")?;

        if metadata.magic != MAGIC {
            anyhow::bail!("无效的帧日志格式（魔数不匹配）");
        }
        if metadata.version != VERSION {
            anyhow::bail!("不支持的帧日志版本: {}", metadata.version);
        }

        let mut log = FrameLog::new(metadata);
        for (index, line) in lines.enumerate() {
            let line = line.context("读取帧失败")?;
            if line.trim().is_empty() {
                continue;
            }
            let frame: RecordedFrame = serde_json::from_str(&line)
                .with_context(|| format!("解析第 {} 帧失败", index + 1))?;
            log.add_frame(frame);
        }

        Ok(log)
    }
}

/// 日志元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMetadata {
    /// 格式标识
    pub magic: String,

    /// 格式版本
    pub version: u8,

    /// 录制开始时间（Unix 时间戳，秒）
    pub start_time: u64,

    /// 场景名称
    pub scenario: String,

    /// 备注
    pub notes: String,
}

impl LogMetadata {
    /// 创建新的元数据
    pub fn new(scenario: impl Into<String>) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        Self {
            magic: MAGIC.to_string(),
            version: VERSION,
            start_time: SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs(),
            scenario: scenario.into(),
            notes: String::new(),
        }
    }
}

/// 一帧输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// 控制器周期
    pub cycle: u64,

    /// 报文名称
    pub message: String,

    /// 总线编号
    pub bus: u8,

    /// CAN 地址
    pub address: u32,

    /// 打包后的负载（十六进制）
    pub data_hex: String,

    /// 字段值（含计数器与校验和）
    pub fields: SignalValues,
}

impl RecordedFrame {
    /// 由组装结果与打包结果创建
    pub fn new(cycle: u64, frame: &OutgoingFrame, can: &CanFrame) -> Self {
        Self {
            cycle,
            message: frame.message.clone(),
            bus: can.bus(),
            address: can.address(),
            data_hex: hex::encode_upper(can.data_slice()),
            fields: frame.fields.clone(),
        }
    }

    /// 解码负载
    pub fn data(&self) -> Result<Vec<u8>> {
        hex::decode(&self.data_hex).with_context(|| format!("无效的十六进制负载: {}", self.data_hex))
    }

    /// 还原为 `CanFrame`
    pub fn to_can_frame(&self) -> Result<CanFrame> {
        let data = self.data()?;
        if data.len() > 8 {
            anyhow::bail!("负载超过 8 字节: {}", data.len());
        }
        Ok(CanFrame::new(self.address, self.bus, &data))
    }
}
