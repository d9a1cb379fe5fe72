//! FCA Giorgio 平台报文目录
//!
//! 所有带计数器的报文：计数器位于倒数第二个字节的低 4 位，
//! 校验和位于最后一个字节（与 [`crate::checksum`] 一致）。
//!
//! 位置来自安全钩子中的位提取的信号：
//! - `ABS_1.WHEEL_SPEED_*`（4 × 13 bit）
//! - `ABS_3.BRAKE_PEDAL_SWITCH`（Byte 0 Bit 3）
//! - `EPS_3.EPS_TORQUE`（12 bit，偏移 -2048）
//! - `LKA_COMMAND.LKA_TORQUE`（11 bit，偏移 -1024）/ `LKA_ACTIVE`（Byte 1 Bit 3）
//! - `ACC_1.CRUISE_STATUS`（Byte 2 Bit 7-5）
//!
//! 其余信号位置为暂定布局。

use crate::dbc::{MessageDef, SignalDef};
use crate::ids::*;

/// 8 字节报文的计数器
const COUNTER_8: SignalDef = SignalDef::raw(SIG_COUNTER, 52, 4);
/// 8 字节报文的校验和
const CHECKSUM_8: SignalDef = SignalDef::raw(SIG_CHECKSUM, 56, 8);

/// 档位数值表
pub const GEAR_VALUES: &[(i64, &str)] = &[(0, "P"), (1, "R"), (2, "N"), (3, "D")];

/// 平台全部报文
pub const FCA_GIORGIO_MESSAGES: &[MessageDef] = &[
    MessageDef {
        name: MSG_ABS_1,
        address: ADDR_ABS_1,
        len: 8,
        signals: &[
            SignalDef::scaled("WHEEL_SPEED_FL", 0, 13, 0.01, 0.0),
            SignalDef::scaled("WHEEL_SPEED_FR", 13, 13, 0.01, 0.0),
            SignalDef::scaled("WHEEL_SPEED_RL", 26, 13, 0.01, 0.0),
            SignalDef::scaled("WHEEL_SPEED_RR", 39, 13, 0.01, 0.0),
            COUNTER_8,
            CHECKSUM_8,
        ],
    },
    MessageDef {
        name: MSG_ABS_2,
        address: ADDR_ABS_2,
        len: 8,
        signals: &[SignalDef::signed("YAW_RATE", 0, 16, 0.01), COUNTER_8, CHECKSUM_8],
    },
    MessageDef {
        name: MSG_ABS_3,
        address: ADDR_ABS_3,
        len: 8,
        signals: &[SignalDef::raw("BRAKE_PEDAL_SWITCH", 4, 1), COUNTER_8, CHECKSUM_8],
    },
    MessageDef {
        name: MSG_ABS_4,
        address: ADDR_ABS_4,
        len: 8,
        signals: &[SignalDef::scaled("BRAKE_PRESSURE", 0, 12, 0.1, 0.0), COUNTER_8, CHECKSUM_8],
    },
    MessageDef {
        name: MSG_EPS_1,
        address: ADDR_EPS_1,
        len: 8,
        signals: &[
            SignalDef::signed("STEERING_ANGLE", 0, 16, 0.1),
            SignalDef::signed("STEERING_RATE", 16, 16, 0.1),
            COUNTER_8,
            CHECKSUM_8,
        ],
    },
    MessageDef {
        name: MSG_EPS_2,
        address: ADDR_EPS_2,
        len: 8,
        signals: &[
            SignalDef::scaled("DRIVER_TORQUE", 0, 12, 1.0, -2048.0),
            SignalDef::raw("LKA_FAULT", 12, 1),
            COUNTER_8,
            CHECKSUM_8,
        ],
    },
    MessageDef {
        name: MSG_EPS_3,
        address: ADDR_EPS_3,
        len: 4,
        signals: &[
            SignalDef::scaled("EPS_TORQUE", 0, 12, 1.0, -2048.0),
            SignalDef::raw(SIG_COUNTER, 20, 4),
            SignalDef::raw(SIG_CHECKSUM, 24, 8),
        ],
    },
    MessageDef {
        name: MSG_GEAR,
        address: ADDR_GEAR,
        len: 8,
        signals: &[SignalDef::raw("GEAR", 0, 4).with_values(GEAR_VALUES)],
    },
    MessageDef {
        name: MSG_BCM_1,
        address: ADDR_BCM_1,
        len: 8,
        signals: &[
            SignalDef::raw("LEFT_TURN_STALK", 0, 1),
            SignalDef::raw("RIGHT_TURN_STALK", 1, 1),
        ],
    },
    MessageDef {
        name: MSG_ACC_1,
        address: ADDR_ACC_1,
        len: 8,
        signals: &[
            SignalDef::raw("CRUISE_STATUS", 16, 3),
            SignalDef::raw("HUD_SPEED", 24, 8),
            COUNTER_8,
            CHECKSUM_8,
        ],
    },
    MessageDef {
        name: MSG_ACC_BUTTON,
        address: ADDR_ACC_BUTTON,
        len: 3,
        signals: &[
            SignalDef::raw("CANCEL_OR_RADAR", 0, 1),
            SignalDef::raw("SPEED_UP", 1, 1),
            SignalDef::raw("SPEED_DOWN", 2, 1),
            SignalDef::raw("ACC_DISTANCE", 3, 1),
            SignalDef::raw("HIGHWAY_ASSIST", 4, 1),
            SignalDef::raw(SIG_COUNTER, 12, 4),
            SignalDef::raw(SIG_CHECKSUM, 16, 8),
        ],
    },
    MessageDef {
        name: MSG_LKA_COMMAND,
        address: ADDR_LKA_COMMAND,
        len: 8,
        signals: &[
            SignalDef::scaled("LKA_TORQUE", 0, 11, 1.0, -1024.0),
            SignalDef::raw("LKA_ACTIVE", 12, 1),
            COUNTER_8,
            CHECKSUM_8,
        ],
    },
    MessageDef {
        name: MSG_LKA_HUD_1,
        address: ADDR_LKA_HUD_1,
        len: 8,
        signals: &[
            SignalDef::raw("NEW_SIGNAL_4", 0, 4),
            SignalDef::raw("NEW_SIGNAL_5", 4, 2),
            COUNTER_8,
            CHECKSUM_8,
        ],
    },
    MessageDef {
        name: MSG_LKA_HUD_2,
        address: ADDR_LKA_HUD_2,
        len: 8,
        signals: &[SignalDef::raw("NEW_SIGNAL_1", 0, 2), COUNTER_8, CHECKSUM_8],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{read_counter, write_counter};
    use crate::dbc::{Dbc, SignalDatabase, SignalValues, extract_bits};

    #[test]
    fn test_counter_signal_matches_codec_position() {
        let dbc = Dbc::fca_giorgio();
        for message in dbc.messages().iter().filter(|m| m.has_counter()) {
            let mut values = SignalValues::new();
            values.insert(SIG_COUNTER.to_string(), 11.0);
            let data = message.encode(&values).unwrap();
            assert_eq!(read_counter(&data), Some(11), "{}", message.name);

            let mut data = vec![0u8; message.len as usize];
            write_counter(&mut data, 5);
            let counter = message.signal(SIG_COUNTER).unwrap();
            assert_eq!(extract_bits(&data, counter.start, counter.size), 5);
        }
    }

    #[test]
    fn test_checksum_signal_is_last_byte() {
        let dbc = Dbc::fca_giorgio();
        for message in dbc.messages().iter().filter(|m| m.has_checksum()) {
            let checksum = message.signal(SIG_CHECKSUM).unwrap();
            assert_eq!(checksum.size, 8, "{}", message.name);
            assert_eq!(checksum.end(), message.len as usize * 8, "{}", message.name);
        }
    }

    #[test]
    fn test_wheel_speed_matches_safety_extraction() {
        let dbc = Dbc::fca_giorgio();
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0x00];
        let values = dbc.decode(MSG_ABS_1, &data).unwrap();

        let fl = ((data[1] >> 3) as u32) | ((data[0] as u32) << 5);
        let rl = ((data[4] >> 1) as u32) | (((data[3] & 0x3F) as u32) << 7);
        let rr = ((data[6] >> 4) as u32) | ((data[5] as u32) << 4) | (((data[4] & 0x1) as u32) << 12);
        assert!((values["WHEEL_SPEED_FL"] - fl as f64 * 0.01).abs() < 1e-9);
        assert!((values["WHEEL_SPEED_RL"] - rl as f64 * 0.01).abs() < 1e-9);
        assert!((values["WHEEL_SPEED_RR"] - rr as f64 * 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_eps_torque_offset() {
        let dbc = Dbc::fca_giorgio();
        let data = [0x80, 0x00, 0x00, 0x00];
        let values = dbc.decode(MSG_EPS_3, &data).unwrap();
        assert_eq!(values["EPS_TORQUE"], 0.0);
    }

    #[test]
    fn test_brake_pedal_switch_bit() {
        let dbc = Dbc::fca_giorgio();
        let data = [0x08, 0, 0, 0, 0, 0, 0, 0];
        let values = dbc.decode(MSG_ABS_3, &data).unwrap();
        assert_eq!(values["BRAKE_PEDAL_SWITCH"], 1.0);
    }
}
