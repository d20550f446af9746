//! # dpc 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/dpc.rs`

use super::common::PlotArgs;
use crate::xrf::dpc::DEFAULT_DETECTOR_SIZE_MM;

use clap::Args;
use std::path::PathBuf;

/// dpc 子命令参数
#[derive(Args, Debug)]
pub struct DpcArgs {
    /// DPC CSV file (x,y,i0,thor_x,thor_y,thor_tot)
    pub input: PathBuf,

    /// Detector length in x (mm)
    #[arg(long = "lx", visible_alias = "Lx", default_value_t = DEFAULT_DETECTOR_SIZE_MM)]
    pub lx: f64,

    /// Detector length in y (mm)
    #[arg(long = "ly", visible_alias = "Ly", default_value_t = DEFAULT_DETECTOR_SIZE_MM)]
    pub ly: f64,

    /// Write the four-panel DPC plot to this path
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Write per-point deflections to this CSV file
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    /// Scatter plot point size
    #[arg(long, default_value_t = 6)]
    pub point_size: u32,

    #[command(flatten)]
    pub plot_opts: PlotArgs,
}
