//! 车型参数
//!
//! 所有阈值、步长与按键时序都集中在 [`CarControllerParams`] 中，
//! 可由 TOML 文件部分覆盖（未出现的字段使用平台默认值）。
//!
//! # 示例
//!
//! ```rust
//! use giorgio_car::CarControllerParams;
//!
//! let params = CarControllerParams::from_toml_str(
//!     r#"
//!     hud_1_step = 8
//!
//!     [steer]
//!     steer_max = 250
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(params.hud_1_step, 8);
//! assert_eq!(params.steer.steer_max, 250);
//! // 未覆盖的字段保持默认值
//! assert_eq!(params.steer.delta_up, 4);
//! ```

use std::fs;
use std::path::Path;

use giorgio_protocol::SignalValues;
use serde::{Deserialize, Serialize};

use crate::CarError;

/// 转向扭矩限制
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteerLimits {
    /// 最大扭矩（CAN 原始单位）
    pub steer_max: i32,
    /// 每周期扭矩上升上限
    pub delta_up: i32,
    /// 每周期扭矩回落上限
    pub delta_down: i32,
    /// 驾驶员扭矩容许量
    pub driver_allowance: i32,
    /// 驾驶员扭矩倍率
    pub driver_multiplier: i32,
    /// 驾驶员扭矩系数
    pub driver_factor: i32,
}

impl Default for SteerLimits {
    fn default() -> Self {
        Self {
            steer_max: 300,
            delta_up: 4,
            delta_down: 4,
            driver_allowance: 80,
            driver_multiplier: 3,
            driver_factor: 1,
        }
    }
}

/// 按键帧发送时序
///
/// 以原车按键计数器最近一次变化的周期为基准：
/// `(cycle - last_button_frame) % period == phase_offset` 的周期为发送槽位。
/// 每个槽位在每条总线上发送 `burst` 份相同的帧。
///
/// 原车按键报文为 50Hz（每 2 个周期一帧）。下面的预设对应实车上试过的策略；
/// 哪一种能稳定被车辆接受尚无定论，默认值沿用 25Hz、提前一帧的节奏。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonTiming {
    /// 槽位周期（周期数）
    pub period: u64,
    /// 槽位相位
    pub phase_offset: u64,
    /// 每个槽位每条总线的重复份数
    pub burst: u8,
}

impl ButtonTiming {
    /// 25Hz，比原车帧提前一个周期（默认）
    pub const QUARTER_RATE_EARLY: Self = Self {
        period: 4,
        phase_offset: 2,
        burst: 1,
    };

    /// 50Hz，与原车帧同一周期
    ///
    /// 实车测试：车辆不响应。
    pub const HALF_RATE_SAME_FRAME: Self = Self {
        period: 2,
        phase_offset: 1,
        burst: 1,
    };

    /// 50Hz，比原车帧提前一个周期
    ///
    /// 实车测试：车辆不响应。
    pub const HALF_RATE_EARLY: Self = Self {
        period: 2,
        phase_offset: 0,
        burst: 1,
    };

    /// 50Hz 同周期，每槽位连发 25 帧
    pub const HALF_RATE_SAME_FRAME_BURST: Self = Self {
        period: 2,
        phase_offset: 1,
        burst: 25,
    };

    /// 50Hz 提前一周期，每槽位连发 25 帧
    pub const HALF_RATE_EARLY_BURST: Self = Self {
        period: 2,
        phase_offset: 0,
        burst: 25,
    };

    /// 100Hz，每个周期都发送
    pub const FULL_RATE: Self = Self {
        period: 1,
        phase_offset: 0,
        burst: 25,
    };

    /// 判断当前周期是否为发送槽位
    ///
    /// `last_button_frame` 晚于 `cycle` 时（不应出现）视为非槽位。
    pub fn is_slot(&self, cycle: u64, last_button_frame: u64) -> bool {
        cycle
            .checked_sub(last_button_frame)
            .is_some_and(|elapsed| elapsed % self.period == self.phase_offset)
    }
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self::QUARTER_RATE_EARLY
    }
}

/// 按键脉冲形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseShape {
    /// 每次脉冲发送的帧数（按槽位计）
    pub send_count: u8,
    /// 发送后静默的槽位数（等待仪表更新）
    pub pause_count: u8,
}

impl Default for PulseShape {
    fn default() -> Self {
        Self {
            send_count: 2,
            pause_count: 6,
        }
    }
}

/// 按键报文字段布局
///
/// `idle` 为松开状态的字段值，各按键的字段映射叠加在 `idle` 之上。
/// 速度加/减为低电平有效。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonLayout {
    pub idle: SignalValues,
    pub increase: SignalValues,
    pub decrease: SignalValues,
    pub cancel: SignalValues,
}

fn fields(pairs: &[(&str, f64)]) -> SignalValues {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

impl Default for ButtonLayout {
    fn default() -> Self {
        Self {
            idle: fields(&[("SPEED_UP", 1.0), ("SPEED_DOWN", 1.0)]),
            increase: fields(&[("SPEED_UP", 0.0)]),
            decrease: fields(&[("SPEED_DOWN", 0.0)]),
            cancel: fields(&[("CANCEL_OR_RADAR", 1.0)]),
        }
    }
}

impl ButtonLayout {
    /// 字段在松开状态下的电平（未列出的字段为 0）
    pub fn idle_level(&self, signal: &str) -> f64 {
        self.idle.get(signal).copied().unwrap_or(0.0)
    }
}

/// 控制器参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarControllerParams {
    /// 扭矩限制
    pub steer: SteerLimits,
    /// 扭矩帧发送间隔（周期数）
    pub steer_step: u64,
    /// `LKA_HUD_1` 发送间隔
    pub hud_1_step: u64,
    /// `LKA_HUD_2` 发送间隔
    pub hud_2_step: u64,
    /// 驾驶员扭矩超过该值视为手握方向盘
    pub steering_pressed_threshold: f64,
    /// 轮速原始值到 m/s 的换算系数
    pub wheel_speed_unit: f64,
    /// 按键时序
    pub button_timing: ButtonTiming,
    /// 按键脉冲形状
    pub pulse: PulseShape,
    /// 按键字段布局
    pub buttons: ButtonLayout,
}

impl CarControllerParams {
    /// FCA Giorgio 平台默认参数
    pub fn fca_giorgio() -> Self {
        Self {
            steer: SteerLimits::default(),
            steer_step: 1,
            hud_1_step: 4,
            hud_2_step: 10,
            steering_pressed_threshold: 100.0,
            wheel_speed_unit: 1.0,
            button_timing: ButtonTiming::default(),
            pulse: PulseShape::default(),
            buttons: ButtonLayout::default(),
        }
    }

    /// 从 TOML 字符串解析（部分覆盖默认值），并校验
    pub fn from_toml_str(content: &str) -> Result<Self, CarError> {
        let params: Self =
            toml::from_str(content).map_err(|e| CarError::Config(format!("TOML parse error: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    /// 从 TOML 文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CarError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| CarError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, CarError> {
        toml::to_string_pretty(self).map_err(|e| CarError::Config(format!("TOML encode error: {e}")))
    }

    /// 校验参数
    pub fn validate(&self) -> Result<(), CarError> {
        let steer = &self.steer;
        if steer.steer_max <= 0 {
            return Err(CarError::Config("steer.steer_max must be > 0".to_string()));
        }
        if steer.delta_up < 0 || steer.delta_down < 0 {
            return Err(CarError::Config("steer deltas must be >= 0".to_string()));
        }
        for (name, step) in [
            ("steer_step", self.steer_step),
            ("hud_1_step", self.hud_1_step),
            ("hud_2_step", self.hud_2_step),
            ("button_timing.period", self.button_timing.period),
        ] {
            if step == 0 {
                return Err(CarError::Config(format!("{name} must be > 0")));
            }
        }
        if self.button_timing.phase_offset >= self.button_timing.period {
            return Err(CarError::Config(format!(
                "button_timing.phase_offset ({}) must be < period ({})",
                self.button_timing.phase_offset, self.button_timing.period
            )));
        }
        if self.button_timing.burst == 0 {
            return Err(CarError::Config("button_timing.burst must be > 0".to_string()));
        }
        if self.pulse.send_count == 0 {
            return Err(CarError::Config("pulse.send_count must be > 0".to_string()));
        }
        if !self.steering_pressed_threshold.is_finite() || self.steering_pressed_threshold < 0.0 {
            return Err(CarError::Config(
                "steering_pressed_threshold must be a non-negative number".to_string(),
            ));
        }
        if !self.wheel_speed_unit.is_finite() || self.wheel_speed_unit <= 0.0 {
            return Err(CarError::Config("wheel_speed_unit must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for CarControllerParams {
    fn default() -> Self {
        Self::fca_giorgio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_params_are_valid() {
        let params = CarControllerParams::fca_giorgio();
        params.validate().unwrap();
        assert_eq!(params.steer.steer_max, 300);
        assert_eq!(params.button_timing, ButtonTiming::QUARTER_RATE_EARLY);
        assert_eq!(params.pulse.send_count, 2);
        assert_eq!(params.pulse.pause_count, 6);
    }

    #[test]
    fn test_button_slot() {
        let timing = ButtonTiming::QUARTER_RATE_EARLY;
        assert!(!timing.is_slot(100, 100));
        assert!(timing.is_slot(102, 100));
        assert!(timing.is_slot(106, 100));
        assert!(!timing.is_slot(103, 100));
        // 基准晚于当前周期
        assert!(!timing.is_slot(98, 100));
    }

    #[test]
    fn test_full_rate_every_cycle() {
        let timing = ButtonTiming::FULL_RATE;
        assert!((0..10).all(|c| timing.is_slot(c, 0)));
    }

    #[test]
    fn test_empty_toml_is_default() {
        let params = CarControllerParams::from_toml_str("").unwrap();
        assert_eq!(params, CarControllerParams::fca_giorgio());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut params = CarControllerParams::fca_giorgio();
        params.button_timing = ButtonTiming::HALF_RATE_EARLY_BURST;
        let text = params.to_toml_string().unwrap();
        let parsed = CarControllerParams::from_toml_str(&text).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_invalid_phase_offset() {
        let err = CarControllerParams::from_toml_str(
            r#"
            [button_timing]
            period = 4
            phase_offset = 4
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CarError::Config(msg) if msg.contains("phase_offset")));
    }

    #[test]
    fn test_zero_step_rejected() {
        let mut params = CarControllerParams::fca_giorgio();
        params.hud_2_step = 0;
        assert!(matches!(params.validate(), Err(CarError::Config(msg)) if msg.contains("hud_2_step")));

        let mut params = CarControllerParams::fca_giorgio();
        params.steer.steer_max = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = CarControllerParams::from_toml_str("steer_step = \"fast\"").unwrap_err();
        assert!(matches!(err, CarError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "steering_pressed_threshold = 80.0").unwrap();
        let params = CarControllerParams::load_from_file(file.path()).unwrap();
        assert_eq!(params.steering_pressed_threshold, 80.0);

        let err = CarControllerParams::load_from_file("/nonexistent/params.toml").unwrap_err();
        assert!(matches!(err, CarError::Config(_)));
    }
}
