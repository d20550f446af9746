//! # plot-spectrum 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/spectrum.rs`

use super::common::{parse_sensor, CalibrationArgs, PlotArgs};
use crate::models::DetectorSelection;

use clap::Args;
use std::path::PathBuf;

/// plot-spectrum 子命令参数
#[derive(Args, Debug)]
pub struct PlotSpectrumArgs {
    /// Scan CSV file
    pub input: PathBuf,

    /// Output image path (default: <scan>_spectrum.<format>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also export the sum and envelope spectra as XY text files
    #[arg(long, default_value_t = false)]
    pub xy: bool,

    /// Detector element selection ("all" or an element index)
    #[arg(long, default_value = "all", value_parser = parse_sensor)]
    pub sensor: DetectorSelection,

    #[command(flatten)]
    pub calibration: CalibrationArgs,

    #[command(flatten)]
    pub plot: PlotArgs,
}
