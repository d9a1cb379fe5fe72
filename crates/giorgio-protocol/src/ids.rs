//! CAN 地址、报文名称与总线编号常量
//!
//! 地址标注为"已确认"的来自平台安全钩子实际检查的报文；
//! 其余仅用于状态解码，地址为暂定值（见 DESIGN.md）。

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::ProtocolError;

// ============================================================================
// 报文地址
// ============================================================================

/// 轮速（已确认）
pub const ADDR_ABS_1: u32 = 0xEE;
/// 制动踏板开关（已确认）
pub const ADDR_ABS_3: u32 = 0xFA;
/// EPS 扭矩（已确认）
pub const ADDR_EPS_3: u32 = 0x122;
/// 车道保持扭矩指令（已确认）
pub const ADDR_LKA_COMMAND: u32 = 0x1F6;
/// 巡航按键（已确认）
pub const ADDR_ACC_BUTTON: u32 = 0x2FA;
/// 车道保持 HUD 1（已确认）
pub const ADDR_LKA_HUD_1: u32 = 0x4AE;
/// 车道保持 HUD 2（已确认）
pub const ADDR_LKA_HUD_2: u32 = 0x547;
/// ACC 状态（已确认）
pub const ADDR_ACC_1: u32 = 0x5A2;

/// 转向角与角速度（暂定）
pub const ADDR_EPS_1: u32 = 0xDE;
/// 驾驶员扭矩与 LKA 故障（暂定）
pub const ADDR_EPS_2: u32 = 0x106;
/// 横摆角速度（暂定）
pub const ADDR_ABS_2: u32 = 0xFE;
/// 制动压力（暂定）
pub const ADDR_ABS_4: u32 = 0x101;
/// 档位（暂定）
pub const ADDR_GEAR: u32 = 0xF2;
/// 车身控制（转向灯拨杆，暂定）
pub const ADDR_BCM_1: u32 = 0x2EE;

// ============================================================================
// 报文名称
// ============================================================================

pub const MSG_ABS_1: &str = "ABS_1";
pub const MSG_ABS_2: &str = "ABS_2";
pub const MSG_ABS_3: &str = "ABS_3";
pub const MSG_ABS_4: &str = "ABS_4";
pub const MSG_EPS_1: &str = "EPS_1";
pub const MSG_EPS_2: &str = "EPS_2";
pub const MSG_EPS_3: &str = "EPS_3";
pub const MSG_GEAR: &str = "GEAR";
pub const MSG_BCM_1: &str = "BCM_1";
pub const MSG_ACC_1: &str = "ACC_1";
pub const MSG_ACC_BUTTON: &str = "ACC_BUTTON";
pub const MSG_LKA_COMMAND: &str = "LKA_COMMAND";
pub const MSG_LKA_HUD_1: &str = "LKA_HUD_1";
pub const MSG_LKA_HUD_2: &str = "LKA_HUD_2";

/// 滚动计数器信号名（所有带计数器的报文统一使用）
pub const SIG_COUNTER: &str = "COUNTER";
/// 校验和信号名（所有带校验和的报文统一使用）
pub const SIG_CHECKSUM: &str = "CHECKSUM";

// ============================================================================
// 总线
// ============================================================================

/// CAN 总线编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CanBus {
    /// 动力总线（原车控制器所在总线）
    Powertrain = 0,
    /// 摄像头/网关总线
    Camera = 2,
}

impl CanBus {
    /// 解析总线编号
    pub fn from_number(bus: u8) -> Result<Self, ProtocolError> {
        Self::try_from(bus).map_err(|_| ProtocolError::InvalidBus { bus })
    }

    /// 总线编号
    pub fn number(self) -> u8 {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_bus_numbers() {
        assert_eq!(CanBus::Powertrain.number(), 0);
        assert_eq!(CanBus::Camera.number(), 2);
        assert_eq!(CanBus::from_number(2).unwrap(), CanBus::Camera);
    }

    #[test]
    fn test_can_bus_invalid() {
        assert_eq!(
            CanBus::from_number(1),
            Err(ProtocolError::InvalidBus { bus: 1 })
        );
    }
}
