//! # 场景文件
//!
//! 以 TOML 描述逐周期的输入：控制指令与本周期新到达的信号。
//!
//! ```toml
//! name = "cancel_pulse"
//!
//! [[cycles]]
//! repeat = 4
//! send_button = "cancel"
//!
//! [cycles.signals.ACC_BUTTON]
//! COUNTER = 3
//! SPEED_UP = 1
//! SPEED_DOWN = 1
//!
//! [[cycles]]
//! repeat = 30
//! send_button = "cancel"
//! ```
//!
//! 每个 `[[cycles]]` 条目展开为 `repeat` 个周期，每个周期都重新送入同样的信号。

use anyhow::{Context, Result};
use giorgio_car::{CarControl, MessageUpdates, SendButton};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 场景
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// 场景名称
    pub name: String,

    /// 场景描述
    pub description: String,

    /// 周期条目
    pub cycles: Vec<ScenarioStep>,
}

/// 场景条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioStep {
    /// 重复周期数
    pub repeat: u32,

    /// 横向控制是否激活
    pub lat_active: bool,

    /// 期望扭矩比例
    pub torque: f64,

    /// 按键请求
    pub send_button: SendButton,

    /// 本周期新到达的信号（报文名 → 字段）
    pub signals: MessageUpdates,
}

impl Default for ScenarioStep {
    fn default() -> Self {
        Self {
            repeat: 1,
            lat_active: false,
            torque: 0.0,
            send_button: SendButton::None,
            signals: MessageUpdates::new(),
        }
    }
}

impl ScenarioStep {
    /// 本条目的控制指令
    pub fn control(&self) -> CarControl {
        CarControl {
            lat_active: self.lat_active,
            torque: self.torque,
            send_button: self.send_button,
        }
    }
}

impl Scenario {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content).context("解析场景文件失败")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取场景文件失败: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// 检查场景内容
    pub fn validate(&self) -> Result<()> {
        for (index, step) in self.cycles.iter().enumerate() {
            if !step.torque.is_finite() || step.torque.abs() > 1.0 {
                anyhow::bail!("第 {} 个条目的 torque 超出 [-1, 1]: {}", index + 1, step.torque);
            }
        }
        Ok(())
    }

    /// 总周期数
    pub fn total_cycles(&self) -> u64 {
        self.cycles.iter().map(|step| u64::from(step.repeat)).sum()
    }

    /// 逐周期展开
    pub fn iter_cycles(&self) -> impl Iterator<Item = (CarControl, &MessageUpdates)> + '_ {
        self.cycles.iter().flat_map(|step| {
            let control = step.control();
            (0..step.repeat).map(move |_| (control, &step.signals))
        })
    }
}
