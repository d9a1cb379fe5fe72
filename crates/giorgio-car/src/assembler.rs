//! 帧组装
//!
//! 决策阶段产出 [`FrameDescriptor`]（报文名 + 总线 + 字段），
//! 组装器补上滚动计数器与校验和，得到 [`OutgoingFrame`]；
//! 最后由 [`encode_frames`] 把字段打包成 `CanFrame`，交给传输层。

use std::collections::BTreeMap;

use giorgio_protocol::{
    CanBus, CanFrame, RollingCounter, SIG_CHECKSUM, SIG_COUNTER, SignalDatabase, SignalValues,
    checksum,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::CarError;

/// 待组装的帧（决策阶段输出）
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDescriptor {
    pub message: &'static str,
    pub bus: CanBus,
    pub fields: SignalValues,
}

impl FrameDescriptor {
    pub fn new(message: &'static str, bus: CanBus, fields: SignalValues) -> Self {
        Self {
            message,
            bus,
            fields,
        }
    }

    /// 同样内容发往另一条总线
    pub fn on_bus(&self, bus: CanBus) -> Self {
        Self {
            bus,
            ..self.clone()
        }
    }
}

/// 已组装的帧（含计数器与校验和字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingFrame {
    pub message: String,
    pub bus: CanBus,
    pub address: u32,
    pub fields: SignalValues,
}

/// 单周期输出帧缓冲区
///
/// 常见周期：按键 2 帧 + 扭矩 1 帧 + HUD 2 帧，栈上预留 6 个位置。
pub type FrameBuffer = SmallVec<[OutgoingFrame; 6]>;

/// 各报文的滚动计数器
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageCounters {
    counters: BTreeMap<&'static str, RollingCounter>,
}

impl MessageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取当前值并递增（首帧为 0）
    pub fn next(&mut self, message: &'static str) -> u8 {
        let counter = self.counters.entry(message).or_default();
        let value = counter.value();
        counter.advance();
        value
    }

    /// 下一帧将使用的计数值
    pub fn peek(&self, message: &str) -> u8 {
        self.counters.get(message).map_or(0, |c| c.value())
    }
}

/// 帧组装器
pub struct FrameAssembler;

impl FrameAssembler {
    /// 组装单帧
    ///
    /// 字段中已给出 `COUNTER` 时（如跟随原车计数的按键帧）不再使用内部计数器。
    pub fn finalize<D: SignalDatabase + ?Sized>(
        db: &D,
        counters: &mut MessageCounters,
        descriptor: FrameDescriptor,
    ) -> Result<OutgoingFrame, CarError> {
        let def = db.require(descriptor.message)?;
        let mut fields = descriptor.fields;

        if def.has_counter() && !fields.contains_key(SIG_COUNTER) {
            fields.insert(SIG_COUNTER.to_string(), counters.next(def.name) as f64);
        }
        if def.has_checksum() {
            fields.remove(SIG_CHECKSUM);
            let data = def.encode(&fields)?;
            fields.insert(SIG_CHECKSUM.to_string(), checksum(def.address, &data) as f64);
        }

        Ok(OutgoingFrame {
            message: def.name.to_string(),
            bus: descriptor.bus,
            address: def.address,
            fields,
        })
    }

    /// 按固定顺序组装一个周期的全部帧：按键 → 扭矩 → HUD
    pub fn assemble<D: SignalDatabase + ?Sized>(
        db: &D,
        counters: &mut MessageCounters,
        buttons: impl IntoIterator<Item = FrameDescriptor>,
        torque: Option<FrameDescriptor>,
        hud: impl IntoIterator<Item = FrameDescriptor>,
    ) -> Result<FrameBuffer, CarError> {
        buttons
            .into_iter()
            .chain(torque)
            .chain(hud)
            .map(|descriptor| Self::finalize(db, counters, descriptor))
            .collect()
    }
}

/// 把一帧字段打包成 `CanFrame`
pub fn encode_frame<D: SignalDatabase + ?Sized>(
    db: &D,
    frame: &OutgoingFrame,
) -> Result<CanFrame, CarError> {
    let def = db.require(&frame.message)?;
    let data = def.encode(&frame.fields)?;
    Ok(CanFrame::new(def.address, frame.bus.number(), &data))
}

/// 按顺序打包一个周期的全部帧
pub fn encode_frames<D: SignalDatabase + ?Sized>(
    db: &D,
    frames: &[OutgoingFrame],
) -> Result<Vec<CanFrame>, CarError> {
    frames.iter().map(|frame| encode_frame(db, frame)).collect()
}
