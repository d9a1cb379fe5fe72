//! 按键脉冲时序
//!
//! 把"发送某个按键"的请求转换为有限次的按键帧，
//! 并与原车按键报文的计数器对齐相位。
//!
//! # 状态
//!
//! ```text
//!            请求 ≠ None 且计数归零                槽位 & send > 0
//!   Idle ───────────────────────────────▶ Sending ──────────────┐
//!    ▲                                      │  ◀────────────────┘
//!    │ 请求 = None（任意状态）               │ send == 0
//!    │                                      ▼
//!    └──────────────────────────────────── Pausing ─── 槽位：pause -= 1
//!                  pause == 0
//! ```
//!
//! 脉冲进行中请求改变不会重新锁存，必须等本轮发送+静默结束。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::control::SendButton;
use crate::params::{ButtonTiming, PulseShape};
use crate::CarError;

/// 脉冲阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulsePhase {
    /// 两个计数都为 0，且没有锁存的按键
    Idle,
    /// 还有帧要发送
    Sending,
    /// 发送完毕，等待静默槽位
    Pausing,
}

/// 按键脉冲的持久状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PulseSequencerState {
    /// 当前锁存的按键
    pub current_button: SendButton,
    /// 剩余发送槽位
    pub send_remaining: u8,
    /// 剩余静默槽位
    pub pause_remaining: u8,
}

impl PulseSequencerState {
    pub fn phase(&self) -> PulsePhase {
        if self.send_remaining > 0 {
            PulsePhase::Sending
        } else if self.pause_remaining > 0 {
            PulsePhase::Pausing
        } else {
            PulsePhase::Idle
        }
    }

    /// 检查状态一致性
    pub fn check_invariants(&self, pulse: &PulseShape) -> Result<(), CarError> {
        if self.send_remaining > pulse.send_count || self.pause_remaining > pulse.pause_count {
            return Err(CarError::InvariantViolation(format!(
                "pulse counters out of range: send={} pause={} (shape {}/{})",
                self.send_remaining, self.pause_remaining, pulse.send_count, pulse.pause_count
            )));
        }
        if self.current_button.is_none() && self.phase() != PulsePhase::Idle {
            return Err(CarError::InvariantViolation(format!(
                "pulse in flight without a latched button: send={} pause={}",
                self.send_remaining, self.pause_remaining
            )));
        }
        Ok(())
    }
}

/// 按键脉冲时序器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPulseSequencer {
    timing: ButtonTiming,
    pulse: PulseShape,
}

impl ButtonPulseSequencer {
    pub fn new(timing: ButtonTiming, pulse: PulseShape) -> Self {
        Self { timing, pulse }
    }

    pub fn timing(&self) -> &ButtonTiming {
        &self.timing
    }

    pub fn pulse(&self) -> &PulseShape {
        &self.pulse
    }

    /// 推进一个周期
    ///
    /// 返回本周期需要发送的按键（`None` 表示不发送）。
    ///
    /// - `last_button_frame`: 原车按键计数器最近一次变化时的周期
    pub fn step(
        &self,
        state: &mut PulseSequencerState,
        request: SendButton,
        cycle: u64,
        last_button_frame: u64,
    ) -> Option<SendButton> {
        if request.is_none() {
            *state = PulseSequencerState::default();
            return None;
        }

        if state.phase() == PulsePhase::Idle {
            state.current_button = request;
            state.send_remaining = self.pulse.send_count;
            state.pause_remaining = self.pulse.pause_count;
            debug!(button = ?request, cycle, "button latched");
        }

        if !self.timing.is_slot(cycle, last_button_frame) {
            return None;
        }

        let sent = match state.phase() {
            PulsePhase::Sending => {
                state.send_remaining -= 1;
                debug!(button = ?state.current_button, cycle, remaining = state.send_remaining, "button pulse");
                Some(state.current_button)
            }
            PulsePhase::Pausing => {
                state.pause_remaining -= 1;
                None
            }
            PulsePhase::Idle => None,
        };

        // 发送与静默都结束后释放锁存
        if state.phase() == PulsePhase::Idle {
            state.current_button = SendButton::None;
        }
        sent
    }
}
