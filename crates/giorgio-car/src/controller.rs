//! 控制器
//!
//! 每个周期调用一次 [`CarController::update`]：
//!
//! ```text
//! CarControl + VehicleStateSnapshot
//!     │
//!     ├─ 扭矩阶段 ─────────── 限幅 → last_applied_torque（每周期）
//!     ├─ 按键脉冲 ─────────── 相位对齐原车按键计数器
//!     ├─ 周期调度 ─────────── HUD 到期判断
//!     │
//!     └─ 帧组装（按键 → 扭矩 → HUD，补计数器和校验和）
//!             │
//!             ▼
//!     (ActuatorsOutput, FrameBuffer)
//! ```
//!
//! 所有跨周期状态都在 [`ControllerState`] 中，由控制器独占。
//! 一个控制器实例对应一辆车；不同车辆使用各自的实例。

use giorgio_protocol::{
    CanBus, Dbc, MSG_LKA_HUD_1, MSG_LKA_HUD_2, RollingCounter, SignalDatabase,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{error, trace};

use crate::assembler::{FrameAssembler, FrameBuffer, FrameDescriptor, MessageCounters};
use crate::buttons::{ButtonPulseSequencer, PulseSequencerState};
use crate::cadence::CadenceScheduler;
use crate::control::{ActuatorsOutput, CarControl, SendButton};
use crate::lateral::{DriverTorqueLimiter, TorqueLimiter};
use crate::messages::{acc_button_control, lka_hud_1, lka_hud_2, steering_control};
use crate::params::CarControllerParams;
use crate::state::VehicleStateSnapshot;
use crate::torque::TorqueState;
use crate::CarError;

/// 跨周期状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    /// 周期计数（每次 `update` 加 1，不复位）
    pub cycle: u64,
    pub torque: TorqueState,
    pub pulse: PulseSequencerState,
    /// 控制器自有报文的滚动计数器
    pub counters: MessageCounters,
    /// 原车按键计数器最近一次变化时的周期
    pub last_button_frame: u64,
    /// 上一次观察到的原车按键计数器
    pub last_button_counter: Option<u8>,
}

impl ControllerState {
    /// 记录原车按键计数器，变化时更新相位基准
    fn observe_button_counter(&mut self, cycle: u64, counter: u8) {
        if self.last_button_counter != Some(counter) {
            self.last_button_counter = Some(counter);
            self.last_button_frame = cycle;
        }
    }
}

/// 控制器运行快照（用于记录与显示）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub cycle: u64,
    pub last_applied_torque: i32,
    pub current_button: SendButton,
    pub send_remaining: u8,
    pub pause_remaining: u8,
    pub last_button_frame: u64,
}

/// 车辆控制器
pub struct CarController<D = Dbc, L = DriverTorqueLimiter> {
    params: CarControllerParams,
    db: D,
    limiter: L,
    sequencer: ButtonPulseSequencer,
    cadence: CadenceScheduler,
    state: ControllerState,
    fault: Option<CarError>,
}

impl CarController {
    /// 使用平台报文表和标准限幅器创建
    pub fn new(params: CarControllerParams) -> Result<Self, CarError> {
        let limiter = DriverTorqueLimiter::new(params.steer);
        Self::with_parts(params, Dbc::fca_giorgio(), limiter)
    }
}

impl<D: SignalDatabase, L: TorqueLimiter> CarController<D, L> {
    /// 使用自定义报文表和限幅器创建
    ///
    /// 启动时校验参数，并用报文表试编码每一种发送报文，
    /// 报文或字段缺失在此处返回错误，而不是在周期中。
    pub fn with_parts(params: CarControllerParams, db: D, limiter: L) -> Result<Self, CarError> {
        params.validate()?;

        let pt = CanBus::Powertrain;
        let mut probes = vec![
            steering_control(pt, 0, true),
            lka_hud_1(pt, true),
            lka_hud_2(pt, true),
        ];
        probes.extend(
            [SendButton::None, SendButton::Increase, SendButton::Decrease, SendButton::Cancel]
                .into_iter()
                .map(|button| acc_button_control(pt, &params.buttons, button, 0)),
        );
        for probe in &probes {
            db.encode(probe.message, &probe.fields)?;
        }

        let sequencer = ButtonPulseSequencer::new(params.button_timing, params.pulse);
        let cadence = CadenceScheduler::new()
            .with(MSG_LKA_HUD_1, params.hud_1_step)
            .with(MSG_LKA_HUD_2, params.hud_2_step);

        Ok(Self {
            params,
            db,
            limiter,
            sequencer,
            cadence,
            state: ControllerState::default(),
            fault: None,
        })
    }

    pub fn params(&self) -> &CarControllerParams {
        &self.params
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            cycle: self.state.cycle,
            last_applied_torque: self.state.torque.last_applied_torque,
            current_button: self.state.pulse.current_button,
            send_remaining: self.state.pulse.send_remaining,
            pause_remaining: self.state.pulse.pause_remaining,
            last_button_frame: self.state.last_button_frame,
        }
    }

    /// 是否已因不变量错误终止
    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// 执行一个周期
    ///
    /// 出错的周期不产出任何帧。不变量错误之后所有调用都返回同一个错误。
    pub fn update(
        &mut self,
        control: &CarControl,
        cs: &VehicleStateSnapshot,
    ) -> Result<(ActuatorsOutput, FrameBuffer), CarError> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }

        let result = self.step(control, cs);
        if let Err(err @ CarError::InvariantViolation(_)) = &result {
            error!(cycle = self.state.cycle, "{err}");
            self.fault = Some(err.clone());
        }
        result
    }

    fn step(
        &mut self,
        control: &CarControl,
        cs: &VehicleStateSnapshot,
    ) -> Result<(ActuatorsOutput, FrameBuffer), CarError> {
        let cycle = self.state.cycle;
        self.state.cycle += 1;
        self.state.observe_button_counter(cycle, cs.button_counter);

        // 扭矩
        let torque = self.state.torque.step(
            &self.limiter,
            &self.params,
            cycle,
            control,
            cs.steering_torque,
        );

        // 按键
        let button = self.sequencer.step(
            &mut self.state.pulse,
            control.send_button,
            cycle,
            self.state.last_button_frame,
        );
        self.state.pulse.check_invariants(self.sequencer.pulse())?;

        let mut buttons: SmallVec<[FrameDescriptor; 2]> = SmallVec::new();
        if let Some(button) = button {
            let counter = RollingCounter::next_after(cs.button_counter);
            let frame = acc_button_control(CanBus::Powertrain, &self.params.buttons, button, counter);
            let burst = usize::from(self.params.button_timing.burst);
            for bus in [CanBus::Powertrain, CanBus::Camera] {
                buttons.extend(std::iter::repeat_n(frame.on_bus(bus), burst));
            }
        }

        let torque_frame = torque
            .emit
            .then(|| steering_control(CanBus::Powertrain, torque.apply_torque, torque.lat_active));

        let lat_active = control.lat_active;
        let hud = self
            .cadence
            .due(cycle)
            .filter_map(|message| hud_frame(message, lat_active));

        let frames = FrameAssembler::assemble(
            &self.db,
            &mut self.state.counters,
            buttons,
            torque_frame,
            hud,
        )?;

        trace!(
            cycle,
            apply_torque = torque.apply_torque,
            button = ?button,
            frames = frames.len(),
            "cycle complete"
        );

        Ok((self.state.torque.actuators(&self.params), frames))
    }
}

fn hud_frame(message: &str, lat_active: bool) -> Option<FrameDescriptor> {
    match message {
        MSG_LKA_HUD_1 => Some(lka_hud_1(CanBus::Powertrain, lat_active)),
        MSG_LKA_HUD_2 => Some(lka_hud_2(CanBus::Powertrain, lat_active)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use giorgio_protocol::{MSG_ACC_BUTTON, MSG_LKA_COMMAND, ProtocolError};

    fn names(frames: &FrameBuffer) -> Vec<&str> {
        frames.iter().map(|f| f.message.as_str()).collect()
    }

    #[test]
    fn test_first_cycle_frames() {
        let mut controller = CarController::new(CarControllerParams::fca_giorgio()).unwrap();
        let (_, frames) = controller
            .update(&CarControl::default(), &VehicleStateSnapshot::default())
            .unwrap();
        // 周期 0：扭矩 + 两个 HUD 都到期
        assert_eq!(names(&frames), vec![MSG_LKA_COMMAND, MSG_LKA_HUD_1, MSG_LKA_HUD_2]);
        assert_eq!(controller.state().cycle, 1);
    }

    #[test]
    fn test_hud_cadence() {
        let mut controller = CarController::new(CarControllerParams::fca_giorgio()).unwrap();
        let mut hud_1 = 0;
        let mut hud_2 = 0;
        for _ in 0..100 {
            let (_, frames) = controller
                .update(&CarControl::default(), &VehicleStateSnapshot::default())
                .unwrap();
            hud_1 += frames.iter().filter(|f| f.message == MSG_LKA_HUD_1).count();
            hud_2 += frames.iter().filter(|f| f.message == MSG_LKA_HUD_2).count();
        }
        assert_eq!(hud_1, 25);
        assert_eq!(hud_2, 10);
    }

    #[test]
    fn test_button_frames_follow_stock_counter() {
        let mut controller = CarController::new(CarControllerParams::fca_giorgio()).unwrap();
        let cs = VehicleStateSnapshot {
            button_counter: 15,
            ..Default::default()
        };
        let control = CarControl {
            send_button: SendButton::Cancel,
            ..Default::default()
        };

        let mut button_frames = Vec::new();
        for _ in 0..3 {
            let (_, frames) = controller.update(&control, &cs).unwrap();
            button_frames.extend(frames.into_iter().filter(|f| f.message == MSG_ACC_BUTTON));
        }
        // 周期 2 为槽位，两条总线各一帧，计数器为原车计数 + 1
        assert_eq!(button_frames.len(), 2);
        assert_eq!(button_frames[0].bus, CanBus::Powertrain);
        assert_eq!(button_frames[1].bus, CanBus::Camera);
        assert_eq!(button_frames[0].fields, button_frames[1].fields);
        assert_eq!(button_frames[0].fields["COUNTER"], 0.0);
        assert_eq!(button_frames[0].fields["CANCEL_OR_RADAR"], 1.0);
    }

    #[test]
    fn test_burst_repeats_button_frames() {
        let mut params = CarControllerParams::fca_giorgio();
        params.button_timing = crate::params::ButtonTiming::HALF_RATE_EARLY_BURST;
        let mut controller = CarController::new(params).unwrap();
        let control = CarControl {
            send_button: SendButton::Increase,
            ..Default::default()
        };
        let (_, frames) = controller.update(&control, &VehicleStateSnapshot::default()).unwrap();
        let buttons: Vec<_> = frames.iter().filter(|f| f.message == MSG_ACC_BUTTON).collect();
        assert_eq!(buttons.len(), 50);
        assert!(buttons[..25].iter().all(|f| f.bus == CanBus::Powertrain));
        assert!(buttons[25..].iter().all(|f| f.bus == CanBus::Camera));
    }

    #[test]
    fn test_phase_rebases_on_counter_change() {
        let mut controller = CarController::new(CarControllerParams::fca_giorgio()).unwrap();
        let control = CarControl {
            send_button: SendButton::Decrease,
            ..Default::default()
        };
        // 周期 0 计数 3；周期 1 计数 4 → 基准移到周期 1，槽位为周期 3
        let mut emitted = Vec::new();
        for (cycle, counter) in [(0u64, 3u8), (1, 4), (2, 4), (3, 4)] {
            let cs = VehicleStateSnapshot {
                button_counter: counter,
                ..Default::default()
            };
            let (_, frames) = controller.update(&control, &cs).unwrap();
            if frames.iter().any(|f| f.message == MSG_ACC_BUTTON) {
                emitted.push(cycle);
            }
        }
        assert_eq!(emitted, vec![3]);
        assert_eq!(controller.state().last_button_frame, 1);
    }

    #[test]
    fn test_missing_message_rejected_at_startup() {
        use giorgio_protocol::MessageDef;
        use giorgio_protocol::catalog::FCA_GIORGIO_MESSAGES;

        static WITHOUT_HUD: std::sync::LazyLock<Vec<MessageDef>> = std::sync::LazyLock::new(|| {
            FCA_GIORGIO_MESSAGES
                .iter()
                .filter(|m| m.name != MSG_LKA_HUD_2)
                .copied()
                .collect()
        });
        let db = Dbc::new(WITHOUT_HUD.as_slice());
        let params = CarControllerParams::fca_giorgio();
        let limiter = DriverTorqueLimiter::new(params.steer);
        let err = CarController::with_parts(params, db, limiter).err().unwrap();
        assert_eq!(
            err,
            CarError::Protocol(ProtocolError::UnknownMessage {
                name: MSG_LKA_HUD_2.to_string()
            })
        );
    }

    #[test]
    fn test_unknown_button_field_rejected_at_startup() {
        let mut params = CarControllerParams::fca_giorgio();
        params.buttons.cancel.insert("CANCEL_BUTTON".to_string(), 1.0);
        let err = CarController::new(params).err().unwrap();
        assert!(matches!(err, CarError::Protocol(ProtocolError::UnknownSignal { .. })));
    }

    #[test]
    fn test_status_reflects_state() {
        let mut controller = CarController::new(CarControllerParams::fca_giorgio()).unwrap();
        let control = CarControl {
            lat_active: true,
            torque: 1.0,
            send_button: SendButton::Cancel,
        };
        controller.update(&control, &VehicleStateSnapshot::default()).unwrap();
        let status = controller.status();
        assert_eq!(status.cycle, 1);
        assert_eq!(status.last_applied_torque, 4);
        assert_eq!(status.current_button, SendButton::Cancel);
        assert!(!controller.is_faulted());
    }
}
