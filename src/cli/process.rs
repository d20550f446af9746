//! # process 子命令 CLI 定义
//!
//! 完整分析流程：校正 → 标定 → 峰检测 → 峰识别 → 导出与绘图。
//! 输入可以是单个扫描文件，也可以是包含多个扫描文件的目录。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/process.rs`

use super::common::{parse_sensor, CalibrationArgs, DatabaseArgs, DetectionArgs, PlotArgs};
use crate::models::DetectorSelection;

use clap::Args;
use std::path::PathBuf;

/// process 子命令参数
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Input: scan CSV file or directory containing scan files
    pub input: PathBuf,

    /// Output directory for peak tables and plots
    #[arg(short, long, default_value = "xrf_results")]
    pub output: PathBuf,

    /// Detector element selection ("all" or an element index)
    #[arg(long, default_value = "all", value_parser = parse_sensor)]
    pub sensor: DetectorSelection,

    /// Also write the spectrum overview plot and processed traces
    #[arg(long, default_value_t = false)]
    pub plot_all: bool,

    #[command(flatten)]
    pub calibration: CalibrationArgs,

    #[command(flatten)]
    pub detection: DetectionArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub plot: PlotArgs,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for input files (batch mode, e.g., "*.csv,*.txt")
    #[arg(long, default_value = "*.csv")]
    pub pattern: String,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories (batch mode)
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
