//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `process`: 完整分析流程（支持目录批量处理）
//! - `detect-peaks`: 峰检测与识别
//! - `map-element`: 元素 / 散射分布图
//! - `dpc`: 差分相衬分析
//! - `plot-spectrum`: 能谱总览图
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: common, process, detect, map, dpc, spectrum

pub mod common;
pub mod detect;
pub mod dpc;
pub mod map;
pub mod process;
pub mod spectrum;

use clap::{Parser, Subcommand};

/// xrf-analyze - XRF 能谱分析工具箱
#[derive(Parser)]
#[command(name = "xrf-analyze")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "X-ray fluorescence spectral analysis for synchrotron microprobe scans", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Complete workflow (correct -> calibrate -> detect -> identify -> export)
    Process(process::ProcessArgs),

    /// Detect and identify XRF peaks
    DetectPeaks(detect::DetectArgs),

    /// Create a spatial distribution map for an element or scatter peak
    MapElement(map::MapArgs),

    /// Differential phase contrast analysis
    Dpc(dpc::DpcArgs),

    /// Plot the sum and max-envelope spectra
    PlotSpectrum(spectrum::PlotSpectrumArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::common::BkgMethodArg;
    use crate::models::DetectorSelection;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_process_defaults() {
        let cli = Cli::try_parse_from(["xrf-analyze", "process", "scan.csv"]).unwrap();
        let Commands::Process(args) = cli.command else {
            panic!("expected process");
        };
        assert_eq!(args.calibration.ev_per_channel, 10.0);
        assert_eq!(args.detection.tolerance, 60.0);
        assert_eq!(args.detection.bkg_method, BkgMethodArg::RollingMinimum);
        assert_eq!(args.detection.bkg_radius, 50);
        assert_eq!(args.sensor, DetectorSelection::All);
        assert_eq!(args.pattern, "*.csv");
    }

    #[test]
    fn test_map_arguments() {
        let cli = Cli::try_parse_from([
            "xrf-analyze",
            "map-element",
            "scan.csv",
            "Cu",
            "Kb",
            "--sensor",
            "1",
            "--correct-45deg",
            "--compress-x",
            "--bkg-method",
        ]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from([
            "xrf-analyze",
            "map-element",
            "scan.csv",
            "Cu",
            "Kb",
            "--sensor",
            "1",
            "--correct-45deg",
            "--compress-x",
        ])
        .unwrap();
        let Commands::MapElement(args) = cli.command else {
            panic!("expected map-element");
        };
        assert_eq!(args.line, "Kb");
        assert_eq!(args.sensor, DetectorSelection::Element(1));
        assert!(args.compress_x);
    }

    #[test]
    fn test_rolling_ball_alias() {
        let cli = Cli::try_parse_from([
            "xrf-analyze",
            "detect-peaks",
            "scan.csv",
            "--bkg-method",
            "rolling-ball",
        ])
        .unwrap();
        let Commands::DetectPeaks(args) = cli.command else {
            panic!("expected detect-peaks");
        };
        assert_eq!(args.detection.bkg_method, BkgMethodArg::RollingMinimum);
    }
}
