//! 车辆控制层
//!
//! 本模块在固定周期（100Hz）内完成：
//! - 状态解码：原始信号 → [`VehicleStateSnapshot`]
//! - 扭矩指令：限幅后的横向扭矩
//! - 按键脉冲：与原车按键计数器相位对齐的模拟按键
//! - 周期调度：HUD 报文
//! - 帧组装：计数器、校验和与发送顺序
//!
//! 本层不做任何 IO：输入是信号值，输出是字段映射（或打包后的 `CanFrame`）。
//!
//! # 示例
//!
//! ```rust
//! use giorgio_car::{CarControl, CarController, CarControllerParams, CarStateDecoder, MessageUpdates};
//!
//! let params = CarControllerParams::fca_giorgio();
//! let mut decoder = CarStateDecoder::new(params.clone());
//! let mut controller = CarController::new(params).unwrap();
//!
//! let cs = decoder.update(&MessageUpdates::new()).unwrap();
//! let (actuators, frames) = controller.update(&CarControl::default(), &cs).unwrap();
//! assert_eq!(actuators.torque_output_can, 0);
//! assert_eq!(frames[0].message, "LKA_COMMAND");
//! ```

pub mod assembler;
pub mod buttons;
pub mod cadence;
pub mod control;
pub mod controller;
mod error;
pub mod filter;
pub mod lateral;
pub mod messages;
pub mod params;
pub mod state;
pub mod torque;

pub use assembler::{
    FrameAssembler, FrameBuffer, FrameDescriptor, MessageCounters, OutgoingFrame, encode_frame,
    encode_frames,
};
pub use buttons::{ButtonPulseSequencer, PulsePhase, PulseSequencerState};
pub use cadence::CadenceScheduler;
pub use control::{ActuatorsOutput, CarControl, SendButton};
pub use controller::{CarController, ControllerState, ControllerStatus};
pub use error::CarError;
pub use filter::{KalmanSpeedFilter, SpeedFilter};
pub use lateral::{DriverTorqueLimiter, TorqueLimiter};
pub use params::{ButtonLayout, ButtonTiming, CarControllerParams, PulseShape, SteerLimits};
pub use state::{
    ButtonEvent, ButtonLevels, ButtonType, CarStateDecoder, CruiseState, GearShifter,
    MessageUpdates, VehicleStateSnapshot,
};
pub use torque::{TorqueDecision, TorqueState};
