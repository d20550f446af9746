//! # detect-peaks 子命令实现
//!
//! 对单个扫描执行峰检测与识别，打印峰表，可选导出 CSV 与诊断图。
//!
//! ## 依赖关系
//! - 使用 `cli/detect.rs` 定义的 DetectArgs
//! - 使用 `commands/pipeline.rs` 的公共流程

use super::pipeline;
use crate::cli::detect::DetectArgs;
use crate::error::{Result, XrfError};
use crate::utils::{output, progress};
use crate::xrf::export;

/// 执行峰检测
pub fn execute(args: DetectArgs) -> Result<()> {
    output::print_header("XRF Peak Detection");

    if !args.input.is_file() {
        return Err(XrfError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    let spinner = progress::create_spinner("Reading scan and applying corrections...");
    let loaded = pipeline::load_scan(
        &args.input,
        &args.calibration,
        args.sensor,
        args.database.incident_energy,
    );
    spinner.finish_and_clear();
    let loaded = loaded?;
    pipeline::print_scan_summary(&loaded, args.sensor);

    let mut db = pipeline::build_database(&args.database)?;
    let summary = db.initialize(loaded.excitation_kev)?;
    pipeline::print_init_summary(&db, &summary);

    let analysis = pipeline::analyze(&loaded, &db, &args.detection)?;
    output::print_info(&format!(
        "Detection on the {} spectrum, {} background, tolerance {:.0} eV",
        crate::models::Representative::from(args.detection.representative),
        args.detection.bkg_method,
        args.detection.tolerance
    ));
    pipeline::print_peak_table(&analysis.peaks);

    if let Some(path) = &args.output_csv {
        export::peaks_to_csv(&analysis.peaks, path)?;
        output::print_written("peaks", path);
    }

    if let Some(path) = &args.plot {
        pipeline::write_detection_plot(
            &loaded,
            &analysis,
            path,
            pipeline::plot_options(&args.plot_opts),
        )?;
        output::print_written("detection plot", path);
    }

    output::print_success(&format!(
        "{} peaks detected, {} identified, {} scatter",
        analysis.peaks.len(),
        analysis.identified_count(),
        analysis.detection.scatter_count()
    ));
    Ok(())
}
