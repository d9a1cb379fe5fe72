//! 车辆状态解码
//!
//! 每周期把新到达的信号值合并进缓存，再由缓存生成一次不可变的
//! [`VehicleStateSnapshot`]。某个报文本周期没有到达时沿用上一次的值
//! （从未收到过的信号视为 0）。

use std::collections::BTreeMap;

use giorgio_protocol::{
    CanBus, CanFrame, Dbc, MSG_ABS_1, MSG_ABS_2, MSG_ABS_3, MSG_ABS_4, MSG_ACC_1, MSG_ACC_BUTTON,
    MSG_BCM_1, MSG_EPS_1, MSG_EPS_2, MSG_EPS_3, MSG_GEAR, ProtocolError, SIG_COUNTER,
    SignalDatabase, SignalValues, verify_checksum,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::filter::{KalmanSpeedFilter, SpeedFilter};
use crate::params::CarControllerParams;
use crate::CarError;

/// km/h → m/s
pub const KPH_TO_MS: f64 = 1.0 / 3.6;

/// 报文名 → 本周期新到达的字段
pub type MessageUpdates = BTreeMap<String, SignalValues>;

// ============================================================================
// 快照类型
// ============================================================================

/// 档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GearShifter {
    Park,
    Reverse,
    Neutral,
    Drive,
    #[default]
    Unknown,
}

impl GearShifter {
    /// 由数值表标签解析
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::to_ascii_uppercase).as_deref() {
            Some("P" | "PARK") => GearShifter::Park,
            Some("R" | "REVERSE") => GearShifter::Reverse,
            Some("N" | "NEUTRAL") => GearShifter::Neutral,
            Some("D" | "DRIVE") => GearShifter::Drive,
            _ => GearShifter::Unknown,
        }
    }
}

/// 按键类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonType {
    Cancel,
    AccelCruise,
    DecelCruise,
    GapAdjustCruise,
    HighwayAssist,
}

impl ButtonType {
    pub const ALL: [ButtonType; 5] = [
        ButtonType::Cancel,
        ButtonType::AccelCruise,
        ButtonType::DecelCruise,
        ButtonType::GapAdjustCruise,
        ButtonType::HighwayAssist,
    ];

    /// `ACC_BUTTON` 中对应的字段
    pub fn signal(self) -> &'static str {
        match self {
            ButtonType::Cancel => "CANCEL_OR_RADAR",
            ButtonType::AccelCruise => "SPEED_UP",
            ButtonType::DecelCruise => "SPEED_DOWN",
            ButtonType::GapAdjustCruise => "ACC_DISTANCE",
            ButtonType::HighwayAssist => "HIGHWAY_ASSIST",
        }
    }
}

/// 按键按下/松开事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub kind: ButtonType,
    pub pressed: bool,
}

/// 按键状态（已按松开电平归一化：`true` 表示按下）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ButtonLevels {
    pub cancel: bool,
    pub speed_up: bool,
    pub speed_down: bool,
    pub acc_distance: bool,
    pub highway_assist: bool,
}

impl ButtonLevels {
    pub fn get(&self, kind: ButtonType) -> bool {
        match kind {
            ButtonType::Cancel => self.cancel,
            ButtonType::AccelCruise => self.speed_up,
            ButtonType::DecelCruise => self.speed_down,
            ButtonType::GapAdjustCruise => self.acc_distance,
            ButtonType::HighwayAssist => self.highway_assist,
        }
    }

    fn set(&mut self, kind: ButtonType, pressed: bool) {
        match kind {
            ButtonType::Cancel => self.cancel = pressed,
            ButtonType::AccelCruise => self.speed_up = pressed,
            ButtonType::DecelCruise => self.speed_down = pressed,
            ButtonType::GapAdjustCruise => self.acc_distance = pressed,
            ButtonType::HighwayAssist => self.highway_assist = pressed,
        }
    }

    /// 相对上一周期的按下/松开事件
    pub fn events_since(&self, previous: &ButtonLevels) -> Vec<ButtonEvent> {
        ButtonType::ALL
            .iter()
            .filter(|kind| self.get(**kind) != previous.get(**kind))
            .map(|kind| ButtonEvent {
                kind: *kind,
                pressed: self.get(*kind),
            })
            .collect()
    }
}

/// 巡航状态
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CruiseState {
    pub available: bool,
    pub enabled: bool,
    /// 设定速度（m/s）
    pub speed: f64,
}

/// 单周期车辆状态快照
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleStateSnapshot {
    /// 轮速 FL/FR/RL/RR（m/s）
    pub wheel_speeds: [f64; 4],
    /// 轮速均值（m/s）
    pub v_ego_raw: f64,
    /// 滤波后车速（m/s）
    pub v_ego: f64,
    /// 滤波后加速度（m/s²）
    pub a_ego: f64,
    /// 原始车速恰为 0
    pub standstill: bool,

    pub steering_angle_deg: f64,
    pub steering_rate_deg: f64,
    /// 驾驶员扭矩
    pub steering_torque: f64,
    /// EPS 输出扭矩
    pub steering_torque_eps: f64,
    pub steering_pressed: bool,
    pub steer_fault_permanent: bool,
    pub yaw_rate: f64,

    pub gear_shifter: GearShifter,
    /// 制动压力
    pub brake: f64,
    pub brake_pressed: bool,
    /// 平台上没有可用的油门踏板信号，恒为 `false`
    pub gas_pressed: bool,
    pub left_blinker: bool,
    pub right_blinker: bool,

    pub cruise_state: CruiseState,

    pub buttons: ButtonLevels,
    /// 原车按键报文的滚动计数器（0-15）
    pub button_counter: u8,
    pub button_events: Vec<ButtonEvent>,
}

// ============================================================================
// 解码器
// ============================================================================

/// 车辆状态解码器
pub struct CarStateDecoder<D = Dbc, F = KalmanSpeedFilter> {
    db: D,
    filter: F,
    params: CarControllerParams,
    cache: BTreeMap<&'static str, SignalValues>,
    previous_buttons: ButtonLevels,
}

impl CarStateDecoder {
    /// 使用平台报文表和默认滤波器创建
    pub fn new(params: CarControllerParams) -> Self {
        Self::with_parts(params, Dbc::fca_giorgio(), KalmanSpeedFilter::new())
    }
}

impl<D: SignalDatabase, F: SpeedFilter> CarStateDecoder<D, F> {
    pub fn with_parts(params: CarControllerParams, db: D, filter: F) -> Self {
        Self {
            db,
            filter,
            params,
            cache: BTreeMap::new(),
            previous_buttons: ButtonLevels::default(),
        }
    }

    /// 合并一个报文的新字段
    ///
    /// 报文或字段不在报文表中时返回配置错误，缓存不变。
    pub fn ingest(&mut self, message: &str, values: &SignalValues) -> Result<(), CarError> {
        let def = self.db.require(message)?;
        if let Some(unknown) = values.keys().find(|name| def.signal(name).is_none()) {
            return Err(ProtocolError::UnknownSignal {
                message: def.name.to_string(),
                signal: unknown.clone(),
            }
            .into());
        }

        let entry = self.cache.entry(def.name).or_default();
        entry.extend(values.iter().map(|(k, v)| (k.clone(), *v)));
        Ok(())
    }

    /// 合并一帧原始报文
    ///
    /// 只接收动力总线上、报文表中已知的帧；校验和错误的帧被丢弃。
    /// 返回该帧是否被采用。
    pub fn ingest_frame(&mut self, frame: &CanFrame) -> Result<bool, CarError> {
        if frame.bus() != CanBus::Powertrain.number() {
            return Ok(false);
        }
        let Some(def) = self.db.message_by_address(frame.address()) else {
            return Ok(false);
        };
        let data = frame.data_slice();
        if def.has_checksum() && !verify_checksum(def.address, data) {
            warn!(message = def.name, "checksum mismatch, frame dropped");
            return Ok(false);
        }

        let name = def.name;
        let values = def.decode(data)?;
        self.cache.entry(name).or_default().extend(values);
        Ok(true)
    }

    /// 合并本周期所有更新并生成快照
    pub fn update(&mut self, updates: &MessageUpdates) -> Result<VehicleStateSnapshot, CarError> {
        for (message, values) in updates {
            self.ingest(message, values)?;
        }
        Ok(self.snapshot())
    }

    fn value(&self, message: &str, signal: &str) -> f64 {
        self.value_or(message, signal, 0.0)
    }

    /// 读取缓存值，从未收到时返回 `default`
    fn value_or(&self, message: &str, signal: &str, default: f64) -> f64 {
        self.cache
            .get(message)
            .and_then(|values| values.get(signal))
            .copied()
            .unwrap_or(default)
    }

    /// 由缓存生成本周期快照
    ///
    /// 每周期调用一次：滤波器与按键事件都以调用次数为节拍。
    pub fn snapshot(&mut self) -> VehicleStateSnapshot {
        let unit = self.params.wheel_speed_unit;
        let wheel_speeds = [
            self.value(MSG_ABS_1, "WHEEL_SPEED_FL") * unit,
            self.value(MSG_ABS_1, "WHEEL_SPEED_FR") * unit,
            self.value(MSG_ABS_1, "WHEEL_SPEED_RL") * unit,
            self.value(MSG_ABS_1, "WHEEL_SPEED_RR") * unit,
        ];
        let v_ego_raw = wheel_speeds.iter().sum::<f64>() / wheel_speeds.len() as f64;
        let (v_ego, a_ego) = self.filter.update(v_ego_raw);

        let steering_torque = self.value(MSG_EPS_2, "DRIVER_TORQUE");

        let gear_raw = self.value(MSG_GEAR, "GEAR") as i64;
        let gear_shifter =
            GearShifter::from_label(self.db.value_label(MSG_GEAR, "GEAR", gear_raw));

        let cruise_status = self.value(MSG_ACC_1, "CRUISE_STATUS") as i64;
        let cruise_state = CruiseState {
            available: matches!(cruise_status, 1..=3),
            enabled: matches!(cruise_status, 2..=3),
            speed: self.value(MSG_ACC_1, "HUD_SPEED") * KPH_TO_MS,
        };

        let mut buttons = ButtonLevels::default();
        for kind in ButtonType::ALL {
            // 未收到的按键字段视为松开
            let idle = self.params.buttons.idle_level(kind.signal());
            let level = self.value_or(MSG_ACC_BUTTON, kind.signal(), idle);
            buttons.set(kind, level != idle);
        }
        let button_events = buttons.events_since(&self.previous_buttons);
        for event in &button_events {
            debug!(kind = ?event.kind, pressed = event.pressed, "button event");
        }
        self.previous_buttons = buttons;

        VehicleStateSnapshot {
            wheel_speeds,
            v_ego_raw,
            v_ego,
            a_ego,
            standstill: v_ego_raw == 0.0,
            steering_angle_deg: self.value(MSG_EPS_1, "STEERING_ANGLE"),
            steering_rate_deg: self.value(MSG_EPS_1, "STEERING_RATE"),
            steering_torque,
            steering_torque_eps: self.value(MSG_EPS_3, "EPS_TORQUE"),
            steering_pressed: steering_torque.abs() > self.params.steering_pressed_threshold,
            steer_fault_permanent: self.value(MSG_EPS_2, "LKA_FAULT") != 0.0,
            yaw_rate: self.value(MSG_ABS_2, "YAW_RATE"),
            gear_shifter,
            brake: self.value(MSG_ABS_4, "BRAKE_PRESSURE"),
            brake_pressed: self.value(MSG_ABS_3, "BRAKE_PEDAL_SWITCH") != 0.0,
            gas_pressed: false,
            left_blinker: self.value(MSG_BCM_1, "LEFT_TURN_STALK") != 0.0,
            right_blinker: self.value(MSG_BCM_1, "RIGHT_TURN_STALK") != 0.0,
            cruise_state,
            buttons,
            button_counter: (self.value(MSG_ACC_BUTTON, SIG_COUNTER) as u8) & 0x0F,
            button_events,
        }
    }
}
