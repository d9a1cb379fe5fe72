//! 扭矩指令阶段
//!
//! 每个周期都经过限幅器更新 `last_applied_torque`；
//! 扭矩帧只在 `cycle % steer_step == 0` 时发送。

use serde::{Deserialize, Serialize};

use crate::control::{ActuatorsOutput, CarControl};
use crate::lateral::TorqueLimiter;
use crate::params::CarControllerParams;

/// 扭矩阶段的持久状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TorqueState {
    /// 上一周期实际施加的扭矩（CAN 原始单位）
    pub last_applied_torque: i32,
}

/// 本周期的扭矩决策
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorqueDecision {
    /// 本周期实际施加的扭矩
    pub apply_torque: i32,
    /// 发给转向机的激活标志
    pub lat_active: bool,
    /// 本周期是否发送扭矩帧
    pub emit: bool,
}

impl TorqueState {
    /// 推进一个周期
    ///
    /// 横向未激活时目标为 0，仍经过限幅器，因此输出按回落速率收敛到 0。
    pub fn step<L: TorqueLimiter + ?Sized>(
        &mut self,
        limiter: &L,
        params: &CarControllerParams,
        cycle: u64,
        control: &CarControl,
        driver_torque: f64,
    ) -> TorqueDecision {
        let target = if control.lat_active {
            (control.torque * params.steer.steer_max as f64).round_ties_even() as i32
        } else {
            0
        };

        let apply_torque = limiter.limit(target, self.last_applied_torque, driver_torque);
        self.last_applied_torque = apply_torque;

        TorqueDecision {
            apply_torque,
            lat_active: control.lat_active,
            emit: cycle % params.steer_step == 0,
        }
    }

    /// 执行器反馈
    pub fn actuators(&self, params: &CarControllerParams) -> ActuatorsOutput {
        ActuatorsOutput {
            torque: self.last_applied_torque as f64 / params.steer.steer_max as f64,
            torque_output_can: self.last_applied_torque,
        }
    }
}
