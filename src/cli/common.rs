//! # 共享参数组
//!
//! 各子命令通过 `#[command(flatten)]` 复用的参数：能量标定、峰检测、
//! 谱线数据库与图像输出。
//!
//! ## 依赖关系
//! - 被 `cli/` 下各子命令参数使用
//! - 由 `commands/pipeline.rs` 转换为 `xrf/` 的配置结构

use crate::models::{DetectorSelection, Representative};
use crate::xrf::background::{DEFAULT_POLY_ORDER, DEFAULT_ROLLING_RADIUS};
use crate::xrf::calibration::DEFAULT_EV_PER_CHANNEL;
use crate::xrf::database::DEFAULT_RESOLUTION_EV;
use crate::xrf::identification::DEFAULT_TOLERANCE_EV;
use crate::xrf::physics::DEFAULT_DETECTOR_ANGLE_DEG;
use crate::xrf::scatter::DEFAULT_SCATTER_TOLERANCE_KEV;
use crate::xrf::{BackgroundMethod, SmoothingMethod};

use clap::{Args, ValueEnum};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// 能量标定
// ─────────────────────────────────────────────────────────────

/// 能量标定参数
#[derive(Args, Debug, Clone)]
pub struct CalibrationArgs {
    /// Energy per channel in eV
    #[arg(long = "ev-per-channel", visible_alias = "eV-per-channel", default_value_t = DEFAULT_EV_PER_CHANNEL)]
    pub ev_per_channel: f64,

    /// Energy offset of channel 0 in eV
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub energy_offset: f64,
}

// ─────────────────────────────────────────────────────────────
// 峰检测
// ─────────────────────────────────────────────────────────────

/// 背景扣除方法
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BkgMethodArg {
    /// No background subtraction
    None,
    /// Iterative polynomial fit to non-peak regions
    Polynomial,
    /// Rolling minimum followed by a moving average
    #[value(alias = "rolling-ball")]
    RollingMinimum,
}

impl std::fmt::Display for BkgMethodArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BkgMethodArg::None => write!(f, "none"),
            BkgMethodArg::Polynomial => write!(f, "polynomial"),
            BkgMethodArg::RollingMinimum => write!(f, "rolling-minimum"),
        }
    }
}

/// 平滑方法
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SmoothMethodArg {
    /// Centred moving average
    MovingAverage,
    /// Quadratic Savitzky-Golay filter
    SavitzkyGolay,
}

impl From<SmoothMethodArg> for SmoothingMethod {
    fn from(arg: SmoothMethodArg) -> Self {
        match arg {
            SmoothMethodArg::MovingAverage => SmoothingMethod::MovingAverage,
            SmoothMethodArg::SavitzkyGolay => SmoothingMethod::SavitzkyGolay,
        }
    }
}

/// 代表性能谱
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum RepresentativeArg {
    /// Sum over all pixels
    Sum,
    /// Per-channel maximum over all pixels
    Envelope,
}

impl From<RepresentativeArg> for Representative {
    fn from(arg: RepresentativeArg) -> Self {
        match arg {
            RepresentativeArg::Sum => Representative::Sum,
            RepresentativeArg::Envelope => Representative::Envelope,
        }
    }
}

/// 峰检测与识别参数
#[derive(Args, Debug, Clone)]
pub struct DetectionArgs {
    /// Minimum peak height (counts after background subtraction)
    #[arg(long, default_value_t = 10.0)]
    pub height: f64,

    /// Minimum peak-to-peak distance in eV
    #[arg(long, default_value_t = 50.0)]
    pub distance: f64,

    /// Minimum peak prominence
    #[arg(long, default_value_t = 10.0)]
    pub prominence: f64,

    /// Line matching tolerance in eV
    #[arg(long, default_value_t = DEFAULT_TOLERANCE_EV)]
    pub tolerance: f64,

    /// Smoothing window in channels (< 3 disables smoothing)
    #[arg(long, default_value_t = 5)]
    pub smooth_window: usize,

    /// Smoothing filter
    #[arg(long, value_enum, default_value = "moving-average")]
    pub smooth_method: SmoothMethodArg,

    /// Background subtraction method
    #[arg(long, value_enum, default_value = "rolling-minimum")]
    pub bkg_method: BkgMethodArg,

    /// Rolling-minimum radius in channels
    #[arg(long, default_value_t = DEFAULT_ROLLING_RADIUS)]
    pub bkg_radius: usize,

    /// Polynomial order for the polynomial background
    #[arg(long, default_value_t = DEFAULT_POLY_ORDER)]
    pub poly_order: usize,

    /// Disable scatter peak flagging
    #[arg(long, default_value_t = false)]
    pub no_scatter: bool,

    /// Detector scattering angle in degrees (Compton prediction)
    #[arg(long, default_value_t = DEFAULT_DETECTOR_ANGLE_DEG)]
    pub detector_angle: f64,

    /// Scatter matching tolerance in keV
    #[arg(long, default_value_t = DEFAULT_SCATTER_TOLERANCE_KEV)]
    pub scatter_tolerance: f64,

    /// Upper analysis energy in keV (default: 1.1 x incident energy)
    #[arg(long)]
    pub energy_limit: Option<f64>,

    /// Representative spectrum used for detection
    #[arg(long, value_enum, default_value = "envelope")]
    pub representative: RepresentativeArg,
}

impl DetectionArgs {
    /// 背景方法
    pub fn background(&self) -> BackgroundMethod {
        match self.bkg_method {
            BkgMethodArg::None => BackgroundMethod::None,
            BkgMethodArg::Polynomial => BackgroundMethod::Polynomial {
                order: self.poly_order,
            },
            BkgMethodArg::RollingMinimum => BackgroundMethod::RollingMinimum {
                radius: self.bkg_radius,
            },
        }
    }

    /// 识别容差 (keV)
    pub fn tolerance_kev(&self) -> f64 {
        self.tolerance / 1000.0
    }
}

// ─────────────────────────────────────────────────────────────
// 谱线数据库
// ─────────────────────────────────────────────────────────────

/// 谱线数据库参数
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Comma-separated element working set (e.g., "Fe,Cu,Zn")
    #[arg(long)]
    pub elements: Option<String>,

    /// Detector energy resolution in eV used to merge close sub-lines
    #[arg(long, default_value_t = DEFAULT_RESOLUTION_EV)]
    pub resolution: f64,

    /// CSV line table (element,line,energy_kev,rate,edge_kev) replacing the built-in table
    #[arg(long)]
    pub line_table: Option<PathBuf>,

    /// Incident beam energy in keV (default: read from the scan file)
    #[arg(long)]
    pub incident_energy: Option<f64>,
}

// ─────────────────────────────────────────────────────────────
// 探测单元与图像输出
// ─────────────────────────────────────────────────────────────

/// 解析探测单元选择（"all" 或单元编号）
pub fn parse_sensor(input: &str) -> Result<DetectorSelection, String> {
    let s = input.trim();
    if s.eq_ignore_ascii_case("all") {
        return Ok(DetectorSelection::All);
    }
    s.parse::<usize>().map(DetectorSelection::Element).map_err(|_| {
        format!(
            "Invalid sensor '{}'. Use 'all' or a detector element index (e.g., 0)",
            input
        )
    })
}

/// 图像格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG image
    #[default]
    Png,
    /// SVG vector image
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

/// 图像输出参数
#[derive(Args, Debug, Clone)]
pub struct PlotArgs {
    /// Image format
    #[arg(long, value_enum, default_value = "png")]
    pub format: ImageFormat,

    /// Figure width in pixels (PNG) or points (SVG)
    #[arg(long, default_value_t = 1200)]
    pub fig_width: u32,

    /// Figure height in pixels (PNG) or points (SVG)
    #[arg(long, default_value_t = 700)]
    pub fig_height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sensor() {
        assert_eq!(parse_sensor("all"), Ok(DetectorSelection::All));
        assert_eq!(parse_sensor("ALL"), Ok(DetectorSelection::All));
        assert_eq!(parse_sensor("2"), Ok(DetectorSelection::Element(2)));
        assert!(parse_sensor("left").is_err());
        assert!(parse_sensor("-1").is_err());
    }
}
