//! 车速滤波
//!
//! 由轮速均值估计车速与加速度。

/// 控制周期（秒），100Hz
pub const DT_CTRL: f64 = 0.01;

/// 测量值与估计值相差超过该值（m/s）时直接重置状态
pub const RESET_THRESHOLD: f64 = 2.0;

/// 车速滤波器接口
pub trait SpeedFilter {
    /// 输入原始车速，返回 `(v_ego, a_ego)`
    fn update(&mut self, v_ego_raw: f64) -> (f64, f64);

    /// 丢弃历史状态
    fn reset(&mut self, v_ego_raw: f64);
}

/// 固定增益二维卡尔曼滤波（状态：速度、加速度）
///
/// ```text
/// x_pred = A x,            A = [[1, dt], [0, 1]]
/// x      = x_pred + K (z - x_pred[0])
/// ```
///
/// 增益为 `dt = 0.01`、过程噪声 `Q = diag(0, 100)`、测量噪声 `R = 0.3`
/// 时的稳态卡尔曼增益。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanSpeedFilter {
    speed: f64,
    accel: f64,
    dt: f64,
    gain: [f64; 2],
}

impl KalmanSpeedFilter {
    /// 100Hz 下的稳态增益
    pub const GAIN_100HZ: [f64; 2] = [0.174_060_39, 1.659_256_47];

    pub fn new() -> Self {
        Self::with_gain(DT_CTRL, Self::GAIN_100HZ)
    }

    pub fn with_gain(dt: f64, gain: [f64; 2]) -> Self {
        Self {
            speed: 0.0,
            accel: 0.0,
            dt,
            gain,
        }
    }

    /// 当前估计 `(速度, 加速度)`
    pub fn state(&self) -> (f64, f64) {
        (self.speed, self.accel)
    }
}

impl Default for KalmanSpeedFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedFilter for KalmanSpeedFilter {
    fn update(&mut self, v_ego_raw: f64) -> (f64, f64) {
        if (v_ego_raw - self.speed).abs() > RESET_THRESHOLD {
            self.reset(v_ego_raw);
        }

        let pred_speed = self.speed + self.dt * self.accel;
        let pred_accel = self.accel;
        let innovation = v_ego_raw - pred_speed;

        self.speed = pred_speed + self.gain[0] * innovation;
        self.accel = pred_accel + self.gain[1] * innovation;
        (self.speed, self.accel)
    }

    fn reset(&mut self, v_ego_raw: f64) {
        self.speed = v_ego_raw;
        self.accel = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_speed_converges() {
        let mut kf = KalmanSpeedFilter::new();
        let mut out = (0.0, 0.0);
        for _ in 0..2000 {
            out = kf.update(1.5);
        }
        assert!((out.0 - 1.5).abs() < 1e-6);
        assert!(out.1.abs() < 1e-6);
    }

    #[test]
    fn test_large_jump_resets() {
        let mut kf = KalmanSpeedFilter::new();
        let (v, a) = kf.update(20.0);
        assert_eq!(v, 20.0);
        assert_eq!(a, 0.0);
    }

    #[test]
    fn test_ramp_tracks_acceleration() {
        let mut kf = KalmanSpeedFilter::new();
        kf.reset(10.0);
        let mut out = (0.0, 0.0);
        // 1 m/s² 匀加速
        for i in 1..=1000 {
            out = kf.update(10.0 + i as f64 * DT_CTRL);
        }
        assert!((out.1 - 1.0).abs() < 0.05, "accel estimate {}", out.1);
        assert!((out.0 - 20.0).abs() < 0.05, "speed estimate {}", out.0);
    }

    #[test]
    fn test_zero_input_stays_zero() {
        let mut kf = KalmanSpeedFilter::default();
        assert_eq!(kf.update(0.0), (0.0, 0.0));
        assert_eq!(kf.state(), (0.0, 0.0));
    }
}
