//! simulate 命令
//!
//! 按场景文件逐周期运行解码器与控制器，打印输出帧并可录制为帧日志。
//!
//! 原车按键报文的计数器由 [`StockButtonClock`] 模拟：每隔固定周期数加 1，
//! 场景中显式给出 `ACC_BUTTON.COUNTER` 的周期以场景为准。

use anyhow::{Context, Result};
use clap::Args;
use giorgio_car::{
    ButtonTiming, CarControl, CarController, CarStateDecoder, MessageUpdates, OutgoingFrame,
    encode_frames,
};
use giorgio_protocol::{CanFrame, MSG_ACC_BUTTON, RollingCounter, SIG_COUNTER};
use giorgio_tools::{FrameLog, LogMetadata, Scenario};
use spin_sleep::SpinSleeper;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::params::{parse_timing, resolve_params};

/// 控制周期（100Hz）
const CYCLE_PERIOD: Duration = Duration::from_millis(10);

/// 模拟命令参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 场景文件（TOML）
    #[arg(short, long)]
    pub scenario: PathBuf,

    /// 控制器参数文件（TOML，缺省使用平台默认值）
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// 覆盖按键时序预设
    #[arg(long, value_parser = parse_timing)]
    pub timing: Option<ButtonTiming>,

    /// 录制输出帧到此文件（JSON Lines）
    #[arg(short, long)]
    pub record: Option<PathBuf>,

    /// 原车按键计数器每隔多少个周期加 1（0 = 不模拟）
    #[arg(long, default_value_t = 4)]
    pub stock_button_every: u64,

    /// 按 100Hz 实时节拍运行
    #[arg(long)]
    pub realtime: bool,

    /// 不逐帧打印
    #[arg(short, long)]
    pub quiet: bool,
}

/// 原车按键计数器模拟
#[derive(Debug, Clone)]
pub struct StockButtonClock {
    every: u64,
    counter: RollingCounter,
}

impl StockButtonClock {
    pub fn new(every: u64) -> Self {
        Self {
            every,
            counter: RollingCounter::default(),
        }
    }

    /// 本周期的原车计数器（`every` 为 0 时不产出）
    pub fn tick(&mut self, cycle: u64) -> Option<u8> {
        if self.every == 0 {
            return None;
        }
        if cycle > 0 && cycle % self.every == 0 {
            self.counter.advance();
        }
        Some(self.counter.value())
    }

    /// 把计数器并入本周期的更新（场景已给出时不覆盖）
    pub fn apply(&mut self, cycle: u64, updates: &mut MessageUpdates) {
        let Some(counter) = self.tick(cycle) else {
            return;
        };
        updates
            .entry(MSG_ACC_BUTTON.to_string())
            .or_default()
            .entry(SIG_COUNTER.to_string())
            .or_insert(f64::from(counter));
    }
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationSummary {
    pub cycles: u64,
    pub frames: usize,
    pub per_message: BTreeMap<String, usize>,
    pub interrupted: bool,
}

impl SimulationSummary {
    fn record(&mut self, frames: &[OutgoingFrame]) {
        self.cycles += 1;
        self.frames += frames.len();
        for frame in frames {
            *self.per_message.entry(frame.message.clone()).or_default() += 1;
        }
    }
}

/// 逐周期运行场景
///
/// `on_cycle` 在每个周期得到输出帧及其打包结果；`running` 被清除时提前结束。
pub fn run_scenario(
    scenario: &Scenario,
    decoder: &mut CarStateDecoder,
    controller: &mut CarController,
    clock: &mut StockButtonClock,
    running: &AtomicBool,
    mut on_cycle: impl FnMut(u64, &CarControl, &[OutgoingFrame], &[CanFrame]) -> Result<()>,
) -> Result<SimulationSummary> {
    let mut summary = SimulationSummary::default();

    for (cycle, (control, signals)) in (0u64..).zip(scenario.iter_cycles()) {
        if !running.load(Ordering::SeqCst) {
            summary.interrupted = true;
            break;
        }

        let mut updates = signals.clone();
        clock.apply(cycle, &mut updates);

        let cs = decoder
            .update(&updates)
            .with_context(|| format!("第 {cycle} 周期解码失败"))?;
        let (_, frames) = controller
            .update(&control, &cs)
            .with_context(|| format!("第 {cycle} 周期控制器出错"))?;
        let encoded = encode_frames(controller.db(), &frames)?;

        on_cycle(cycle, &control, &frames, &encoded)?;
        summary.record(&frames);
    }

    Ok(summary)
}

/// candump 风格的单帧输出
fn format_frame(cycle: u64, frame: &OutgoingFrame, can: &CanFrame) -> String {
    format!(
        "{:>6}  can{}  {:03X}  [{}]  {:<12} {}",
        cycle,
        can.bus(),
        can.address(),
        can.len,
        frame.message,
        hex::encode_upper(can.data_slice()),
    )
}

impl SimulateCommand {
    pub fn execute(&self) -> Result<()> {
        let scenario = Scenario::load(&self.scenario)?;
        let params = resolve_params(self.params.as_ref(), self.timing)?;

        println!("════════════════════════════════════════");
        println!("           场景模拟");
        println!("════════════════════════════════════════");
        println!();
        println!("📁 场景: {} ({} 周期)", scenario.name, scenario.total_cycles());
        println!(
            "⏱️  按键时序: period={} offset={} burst={}",
            params.button_timing.period, params.button_timing.phase_offset, params.button_timing.burst
        );
        if self.realtime {
            println!("💡 提示: 按 Ctrl-C 可随时停止");
        }
        println!();

        let mut decoder = CarStateDecoder::new(params.clone());
        let mut controller = CarController::new(params)?;
        let mut clock = StockButtonClock::new(self.stock_button_every);

        // 注册 Ctrl-C 处理器
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        ctrlc::set_handler(move || {
            println!();
            println!("🛑 收到停止信号，正在停止...");
            running_clone.store(false, Ordering::SeqCst);
        })
        .context("注册 Ctrl-C 处理器失败")?;

        let mut log = FrameLog::new(LogMetadata::new(scenario.name.clone()));
        let sleeper = SpinSleeper::default();
        let quiet = self.quiet;
        let realtime = self.realtime;

        let summary = run_scenario(
            &scenario,
            &mut decoder,
            &mut controller,
            &mut clock,
            &running,
            |cycle, control, frames, encoded| {
                if !quiet {
                    for (frame, can) in frames.iter().zip(encoded) {
                        println!("{}", format_frame(cycle, frame, can));
                    }
                }
                tracing::debug!(cycle, button = ?control.send_button, frames = frames.len());
                log.record_cycle(cycle, frames, encoded);
                if realtime {
                    sleeper.sleep(CYCLE_PERIOD);
                }
                Ok(())
            },
        )?;

        println!();
        if summary.interrupted {
            println!("⚠️ 模拟被用户中断");
        } else {
            println!("✅ 模拟完成");
        }
        println!("   周期: {}", summary.cycles);
        println!("   帧数: {}", summary.frames);
        for (message, count) in &summary.per_message {
            println!("   • {:<12} {}", message, count);
        }

        if let Some(path) = &self.record {
            log.save(path)?;
            println!("💾 已录制 {} 帧到 {}", log.frame_count(), path.display());
        }

        Ok(())
    }
}
