//! # map-element 子命令 CLI 定义
//!
//! 目标可以是元素符号（配合谱线族）、`elastic` 或 `compton`。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/map.rs`

use super::common::{parse_sensor, CalibrationArgs, DatabaseArgs, PlotArgs};
use crate::models::DetectorSelection;
use crate::xrf::mapping::DEFAULT_HALF_WIDTH_KEV;
use crate::xrf::physics::DEFAULT_DETECTOR_ANGLE_DEG;
use crate::xrf::ColorScale;

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 颜色标度
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ScaleArg {
    Linear,
    Log,
    Sqrt,
}

impl From<ScaleArg> for ColorScale {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::Linear => ColorScale::Linear,
            ScaleArg::Log => ColorScale::Log,
            ScaleArg::Sqrt => ColorScale::Sqrt,
        }
    }
}

/// map-element 子命令参数
#[derive(Args, Debug)]
pub struct MapArgs {
    /// Scan CSV file
    pub input: PathBuf,

    /// Element symbol (e.g., Fe, Cu) or "elastic" / "compton"
    pub target: String,

    /// Line family for element targets
    #[arg(default_value = "Ka")]
    pub line: String,

    /// Output image path (default: <scan>_<target>_map.<format>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the map as CSV (x, y, intensity)
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    /// Integration half-width in keV
    #[arg(long, default_value_t = DEFAULT_HALF_WIDTH_KEV)]
    pub width: f64,

    /// Colour scale
    #[arg(long, value_enum, default_value = "linear")]
    pub scale: ScaleArg,

    /// Detector element selection ("all" or an element index)
    #[arg(long, default_value = "all", value_parser = parse_sensor)]
    pub sensor: DetectorSelection,

    /// Scatter plot point size
    #[arg(long, default_value_t = 10)]
    pub point_size: u32,

    /// Apply the 45° geometry correction to x coordinates
    #[arg(long = "correct-45deg", default_value_t = false)]
    pub correct_45deg: bool,

    /// Compress x coordinates instead of expanding them (with --correct-45deg)
    #[arg(long, default_value_t = false, requires = "correct_45deg")]
    pub compress_x: bool,

    /// Detector scattering angle in degrees (compton target)
    #[arg(long, default_value_t = DEFAULT_DETECTOR_ANGLE_DEG)]
    pub detector_angle: f64,

    #[command(flatten)]
    pub calibration: CalibrationArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub plot: PlotArgs,
}
