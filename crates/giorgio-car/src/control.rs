//! 上层控制指令与执行器反馈

use serde::{Deserialize, Serialize};

/// 请求模拟的巡航按键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendButton {
    #[default]
    None,
    /// 巡航设定速度 +
    Increase,
    /// 巡航设定速度 -
    Decrease,
    /// 取消巡航
    Cancel,
}

impl SendButton {
    pub fn is_none(self) -> bool {
        self == SendButton::None
    }
}

/// 每周期的上层控制指令
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CarControl {
    /// 横向控制是否激活
    pub lat_active: bool,
    /// 期望扭矩（相对 `STEER_MAX` 的比例，-1.0 ~ 1.0）
    pub torque: f64,
    /// 按键请求
    pub send_button: SendButton,
}

/// 执行器反馈（经过限幅后的实际值）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuatorsOutput {
    /// 实际扭矩比例：`last_applied_torque / STEER_MAX`
    pub torque: f64,
    /// 实际扭矩（CAN 原始单位）
    pub torque_output_can: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_button_serde_names() {
        let json = serde_json::to_string(&SendButton::Increase).unwrap();
        assert_eq!(json, "\"increase\"");
        let parsed: SendButton = serde_json::from_str("\"cancel\"").unwrap();
        assert_eq!(parsed, SendButton::Cancel);
    }

    #[test]
    fn test_car_control_default() {
        let control = CarControl::default();
        assert!(!control.lat_active);
        assert_eq!(control.torque, 0.0);
        assert!(control.send_button.is_none());
    }
}
