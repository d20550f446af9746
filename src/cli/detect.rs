//! # detect-peaks 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/detect.rs`

use super::common::{parse_sensor, CalibrationArgs, DatabaseArgs, DetectionArgs, PlotArgs};
use crate::models::DetectorSelection;

use clap::Args;
use std::path::PathBuf;

/// detect-peaks 子命令参数
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Scan CSV file
    pub input: PathBuf,

    /// Detector element selection ("all" or an element index)
    #[arg(long, default_value = "all", value_parser = parse_sensor)]
    pub sensor: DetectorSelection,

    /// Write the detection diagnostic plot to this path
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Write the identified peak table to this CSV file
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    #[command(flatten)]
    pub calibration: CalibrationArgs,

    #[command(flatten)]
    pub detection: DetectionArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub plot_opts: PlotArgs,
}
