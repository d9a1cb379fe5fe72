//! 发送报文的字段构造

use giorgio_protocol::{
    CanBus, MSG_ACC_BUTTON, MSG_LKA_COMMAND, MSG_LKA_HUD_1, MSG_LKA_HUD_2, SIG_COUNTER,
    SignalValues,
};

use crate::assembler::FrameDescriptor;
use crate::control::SendButton;
use crate::params::ButtonLayout;

fn fields(pairs: &[(&str, f64)]) -> SignalValues {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// 车道保持扭矩指令
pub fn steering_control(bus: CanBus, apply_torque: i32, lka_active: bool) -> FrameDescriptor {
    FrameDescriptor::new(
        MSG_LKA_COMMAND,
        bus,
        fields(&[
            ("LKA_ACTIVE", f64::from(u8::from(lka_active))),
            ("LKA_TORQUE", apply_torque as f64),
        ]),
    )
}

/// 车道保持 HUD 1（固定内容）
pub fn lka_hud_1(bus: CanBus, _lat_active: bool) -> FrameDescriptor {
    FrameDescriptor::new(
        MSG_LKA_HUD_1,
        bus,
        fields(&[("NEW_SIGNAL_5", 1.0), ("NEW_SIGNAL_4", 6.0)]),
    )
}

/// 车道保持 HUD 2（固定内容）
pub fn lka_hud_2(bus: CanBus, _lat_active: bool) -> FrameDescriptor {
    FrameDescriptor::new(MSG_LKA_HUD_2, bus, fields(&[("NEW_SIGNAL_1", 1.0)]))
}

/// 巡航按键
///
/// 在 `idle` 字段之上叠加按键字段；`counter` 由调用方给出（跟随原车计数）。
pub fn acc_button_control(
    bus: CanBus,
    layout: &ButtonLayout,
    button: SendButton,
    counter: u8,
) -> FrameDescriptor {
    let mut values = layout.idle.clone();
    let pressed = match button {
        SendButton::None => None,
        SendButton::Increase => Some(&layout.increase),
        SendButton::Decrease => Some(&layout.decrease),
        SendButton::Cancel => Some(&layout.cancel),
    };
    if let Some(pressed) = pressed {
        values.extend(pressed.iter().map(|(k, v)| (k.clone(), *v)));
    }
    values.insert(SIG_COUNTER.to_string(), f64::from(counter & 0x0F));

    FrameDescriptor::new(MSG_ACC_BUTTON, bus, values)
}
