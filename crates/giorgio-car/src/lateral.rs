//! 扭矩限幅器
//!
//! # 算法
//!
//! ```text
//! driver_max = STEER_MAX + ( ALLOWANCE + driver * FACTOR) * MULTIPLIER
//! driver_min = -STEER_MAX + (-ALLOWANCE + driver * FACTOR) * MULTIPLIER
//!
//! allowed   = [min(max(-STEER_MAX, driver_min), 0), max(min(STEER_MAX, driver_max), 0)]
//!
//! last > 0:  clip(x, max(last - DELTA_DOWN, -DELTA_UP), last + DELTA_UP)
//! last <= 0: clip(x, last - DELTA_UP, min(last + DELTA_DOWN, DELTA_UP))
//! ```
//!
//! 驾驶员反向用力时，允许范围向 0 收缩；变化率限制保证输出每周期只移动有限步长，
//! 且回落到 0 的过程不会越过 0。

use crate::params::SteerLimits;

/// 扭矩限幅器接口
///
/// 实现必须满足：
/// - 对 `desired` 单调
/// - `desired == last` 且在允许范围内时输出 `last`
pub trait TorqueLimiter {
    /// 计算本周期实际施加的扭矩
    ///
    /// - `desired`: 目标扭矩（CAN 原始单位）
    /// - `last`: 上一周期实际施加的扭矩
    /// - `driver_torque`: 驾驶员扭矩测量值
    fn limit(&self, desired: i32, last: i32, driver_torque: f64) -> i32;
}

/// 驾驶员扭矩相关的扭矩限幅器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverTorqueLimiter {
    limits: SteerLimits,
}

impl DriverTorqueLimiter {
    pub fn new(limits: SteerLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SteerLimits {
        &self.limits
    }
}

/// 与 `f64::clamp` 不同，`lo > hi` 时不会 panic（取 `hi`）
fn clip(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

impl TorqueLimiter for DriverTorqueLimiter {
    fn limit(&self, desired: i32, last: i32, driver_torque: f64) -> i32 {
        let l = &self.limits;
        let steer_max = l.steer_max as f64;
        let allowance = l.driver_allowance as f64;
        let multiplier = l.driver_multiplier as f64;
        let factor = l.driver_factor as f64;
        let up = l.delta_up as f64;
        let down = l.delta_down as f64;
        let last_f = last as f64;

        let driver_max = steer_max + (allowance + driver_torque * factor) * multiplier;
        let driver_min = -steer_max + (-allowance + driver_torque * factor) * multiplier;
        let max_allowed = steer_max.min(driver_max).max(0.0);
        let min_allowed = (-steer_max).max(driver_min).min(0.0);

        let mut apply = clip(desired as f64, min_allowed, max_allowed);

        apply = if last > 0 {
            clip(apply, (last_f - down).max(-up), last_f + up)
        } else {
            clip(apply, last_f - up, (last_f + down).min(up))
        };

        let apply = apply.round_ties_even() as i32;
        if apply != desired {
            tracing::trace!(desired, last, apply, driver_torque, "torque limited");
        }
        apply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> DriverTorqueLimiter {
        DriverTorqueLimiter::new(SteerLimits::default())
    }

    #[test]
    fn test_rate_limit_up() {
        let l = limiter();
        assert_eq!(l.limit(300, 0, 0.0), 4);
        assert_eq!(l.limit(300, 4, 0.0), 8);
        assert_eq!(l.limit(-300, 0, 0.0), -4);
    }

    #[test]
    fn test_rate_limit_down_without_overshoot() {
        let l = limiter();
        assert_eq!(l.limit(0, 300, 0.0), 296);
        assert_eq!(l.limit(0, 2, 0.0), 0);
        assert_eq!(l.limit(0, -2, 0.0), 0);
        assert_eq!(l.limit(0, -300, 0.0), -296);
    }

    #[test]
    fn test_steady_state_idempotent() {
        let l = limiter();
        for torque in [-300, -120, 0, 57, 300] {
            assert_eq!(l.limit(torque, torque, 0.0), torque);
        }
    }

    #[test]
    fn test_absolute_max() {
        let l = limiter();
        assert_eq!(l.limit(1000, 300, 0.0), 300);
        assert_eq!(l.limit(-1000, -300, 0.0), -300);
    }

    #[test]
    fn test_driver_opposing_shrinks_envelope() {
        let l = limiter();
        // 驾驶员向负方向用力 200：driver_max = 300 + (80 - 200) * 3 = -60 → 上限 0
        assert_eq!(l.limit(300, 0, -200.0), 0);
        // 驾驶员向负方向用力 150：driver_max = 300 + (80 - 150) * 3 = 90
        assert_eq!(l.limit(300, 90, -150.0), 90);
        assert_eq!(l.limit(300, 200, -150.0), 196);
    }

    #[test]
    fn test_half_step_rounds_to_even() {
        let limiter = DriverTorqueLimiter::new(SteerLimits::default());
        // 驾驶员包络为 160.5
        assert_eq!(limiter.limit(200, 158, -126.5), 160);
        assert_eq!(limiter.limit(-200, -158, 126.5), -160);
    }

    #[test]
    fn test_driver_assisting_keeps_envelope() {
        let l = limiter();
        assert_eq!(l.limit(300, 300, 150.0), 300);
    }
}
