//! params 命令
//!
//! 打印控制器参数（TOML），可用作 `simulate --params` 的起点

use anyhow::{Context, Result};
use clap::Args;
use giorgio_car::{ButtonTiming, CarControllerParams};
use std::path::PathBuf;

/// 参数命令
#[derive(Args, Debug)]
pub struct ParamsCommand {
    /// 读取并校验此文件，而不是打印默认值
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// 覆盖按键时序预设
    #[arg(long, value_parser = parse_timing)]
    pub timing: Option<ButtonTiming>,
}

/// 按名称选择按键时序预设
pub(crate) fn parse_timing(name: &str) -> Result<ButtonTiming, String> {
    match name {
        "quarter-rate-early" => Ok(ButtonTiming::QUARTER_RATE_EARLY),
        "half-rate-same-frame" => Ok(ButtonTiming::HALF_RATE_SAME_FRAME),
        "half-rate-early" => Ok(ButtonTiming::HALF_RATE_EARLY),
        "half-rate-same-frame-burst" => Ok(ButtonTiming::HALF_RATE_SAME_FRAME_BURST),
        "half-rate-early-burst" => Ok(ButtonTiming::HALF_RATE_EARLY_BURST),
        "full-rate" => Ok(ButtonTiming::FULL_RATE),
        other => Err(format!("unknown timing preset: {other}")),
    }
}

/// 读取参数文件（未给出时使用平台默认值），并应用时序预设
pub(crate) fn resolve_params(
    file: Option<&PathBuf>,
    timing: Option<ButtonTiming>,
) -> Result<CarControllerParams> {
    let mut params = match file {
        Some(path) => CarControllerParams::load_from_file(path)
            .with_context(|| format!("加载参数文件失败: {}", path.display()))?,
        None => CarControllerParams::fca_giorgio(),
    };
    if let Some(timing) = timing {
        params.button_timing = timing;
        params.validate()?;
    }
    Ok(params)
}

impl ParamsCommand {
    pub fn execute(&self) -> Result<()> {
        let params = resolve_params(self.file.as_ref(), self.timing)?;
        if let Some(path) = &self.file {
            tracing::info!("参数文件校验通过: {}", path.display());
        }
        print!("{}", params.to_toml_string()?);
        Ok(())
    }
}
