//! 端到端场景测试
//!
//! 解码器 → 控制器 → 帧组装 → CanFrame 打包，整条链路逐周期驱动。

use giorgio_car::{
    CarControl, CarController, CarControllerParams, CarStateDecoder, MessageUpdates, PulsePhase,
    SendButton, VehicleStateSnapshot, encode_frames,
};
use giorgio_protocol::{
    ADDR_LKA_COMMAND, CanBus, MSG_ACC_BUTTON, MSG_LKA_COMMAND, SignalValues, read_counter,
    verify_checksum,
};

fn controller() -> CarController {
    CarController::new(CarControllerParams::fca_giorgio()).unwrap()
}

fn count(frames: &[giorgio_car::OutgoingFrame], message: &str) -> usize {
    frames.iter().filter(|f| f.message == message).count()
}

#[test]
fn inactive_cycles_send_zero_torque() {
    let mut controller = controller();
    let cs = VehicleStateSnapshot::default();

    let mut torque_frames = Vec::new();
    for _ in 0..10 {
        let (actuators, frames) = controller.update(&CarControl::default(), &cs).unwrap();
        assert_eq!(actuators.torque_output_can, 0);
        assert_eq!(actuators.torque, 0.0);
        torque_frames.extend(frames.into_iter().filter(|f| f.message == MSG_LKA_COMMAND));
    }

    assert_eq!(torque_frames.len(), 10);
    for frame in &torque_frames {
        assert_eq!(frame.fields["LKA_TORQUE"], 0.0);
        assert_eq!(frame.fields["LKA_ACTIVE"], 0.0);
        assert_eq!(frame.bus, CanBus::Powertrain);
    }
}

#[test]
fn cancel_pulse_two_sends_then_six_pauses() {
    let mut controller = controller();
    let cs = VehicleStateSnapshot {
        button_counter: 7,
        ..Default::default()
    };
    let control = CarControl {
        send_button: SendButton::Cancel,
        ..Default::default()
    };

    let mut slots = Vec::new();
    for cycle in 0..=30u64 {
        let (_, frames) = controller.update(&control, &cs).unwrap();
        let sent = count(&frames, MSG_ACC_BUTTON);
        if cycle % 4 == 2 {
            slots.push(sent);
        } else {
            assert_eq!(sent, 0, "cycle {cycle} is not a slot");
        }
    }

    // 8 个槽位：前 2 个各发两帧（两条总线），后 6 个静默
    assert_eq!(slots, vec![2, 2, 0, 0, 0, 0, 0, 0]);
    assert_eq!(controller.state().pulse.phase(), PulsePhase::Idle);
    assert_eq!(controller.state().pulse.current_button, SendButton::None);
}

#[test]
fn request_cleared_before_slot_sends_nothing() {
    let mut controller = controller();
    let cs = VehicleStateSnapshot::default();
    let requests = [SendButton::None, SendButton::Increase, SendButton::None];

    let mut sent = 0;
    for request in requests {
        let control = CarControl {
            send_button: request,
            ..Default::default()
        };
        let (_, frames) = controller.update(&control, &cs).unwrap();
        sent += count(&frames, MSG_ACC_BUTTON);
    }

    assert_eq!(sent, 0);
    let state = controller.state();
    assert_eq!(state.pulse.phase(), PulsePhase::Idle);
    assert_eq!(state.pulse.current_button, SendButton::None);
}

#[test]
fn decoded_driver_torque_limits_output() {
    let params = CarControllerParams::fca_giorgio();
    let mut decoder = CarStateDecoder::new(params.clone());
    let mut controller = CarController::new(params).unwrap();
    let control = CarControl {
        lat_active: true,
        torque: 1.0,
        ..Default::default()
    };

    // 驾驶员反向用力 200：允许上限为 0
    let mut eps_2 = SignalValues::new();
    eps_2.insert("DRIVER_TORQUE".to_string(), -200.0);
    let updates = MessageUpdates::from([("EPS_2".to_string(), eps_2)]);

    for _ in 0..20 {
        let cs = decoder.update(&updates).unwrap();
        assert!(cs.steering_pressed);
        let (actuators, _) = controller.update(&control, &cs).unwrap();
        assert_eq!(actuators.torque_output_can, 0);
    }
}

#[test]
fn encoded_frames_carry_valid_checksums() {
    let mut controller = controller();
    let control = CarControl {
        lat_active: true,
        torque: -0.25,
        send_button: SendButton::Increase,
    };
    let cs = VehicleStateSnapshot::default();

    let mut lka_counters = Vec::new();
    for _ in 0..40 {
        let (_, frames) = controller.update(&control, &cs).unwrap();
        let encoded = encode_frames(controller.db(), &frames).unwrap();
        assert_eq!(encoded.len(), frames.len());
        for frame in &encoded {
            assert!(
                verify_checksum(frame.address(), frame.data_slice()),
                "bad checksum on 0x{:X}",
                frame.address()
            );
            if frame.address() == ADDR_LKA_COMMAND {
                lka_counters.push(read_counter(frame.data_slice()).unwrap());
                // desired_torque = ((data[0] << 3) | (data[1] >> 5)) - 1024
                let data = frame.data_slice();
                let raw = ((data[0] as i32) << 3) | ((data[1] as i32) >> 5);
                assert!((-75..=0).contains(&(raw - 1024)));
            }
        }
    }

    // 扭矩帧计数器逐帧递增并回绕
    assert_eq!(lka_counters.len(), 40);
    for pair in lka_counters.windows(2) {
        assert_eq!(pair[1], (pair[0] + 1) % 16);
    }
}

#[test]
fn torque_ramps_back_to_zero_after_disengage() {
    let mut controller = controller();
    let cs = VehicleStateSnapshot::default();
    let active = CarControl {
        lat_active: true,
        torque: 0.1,
        ..Default::default()
    };
    for _ in 0..20 {
        controller.update(&active, &cs).unwrap();
    }
    assert_eq!(controller.state().torque.last_applied_torque, 30);

    let mut previous = 30;
    for _ in 0..10 {
        let (actuators, _) = controller.update(&CarControl::default(), &cs).unwrap();
        let torque = actuators.torque_output_can;
        assert!(torque >= 0 && torque <= previous);
        assert!(previous - torque <= 4);
        previous = torque;
    }
    assert_eq!(previous, 0);
}
