//! # process 子命令实现
//!
//! 完整分析流程：校正 → 标定 → 峰检测 → 峰识别 → 导出。
//!
//! ## 功能
//! - 支持单文件和批量目录处理
//! - 批量模式先按入射能量顺序初始化谱线数据库，再并行处理（rayon）
//! - 导出峰表 (CSV) 与检测诊断图 (PNG/SVG)
//! - `--plot-all` 额外导出能谱总览图和处理后的谱线数据
//!
//! ## 依赖关系
//! - 使用 `cli/process.rs` 定义的 ProcessArgs
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `commands/pipeline.rs` 的公共流程

use super::pipeline::{self, Analysis, LoadedScan};
use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::common::{CalibrationArgs, DetectionArgs};
use crate::cli::process::ProcessArgs;
use crate::error::{Result, XrfError};
use crate::models::DetectorSelection;
use crate::parsers::scan::peek_incident_energy_kev;
use crate::utils::{output, progress};
use crate::xrf::plot::{self, PlotOptions};
use crate::xrf::{export, LineDatabase};

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 执行完整分析流程
pub fn execute(args: ProcessArgs) -> Result<()> {
    output::print_header("XRF Analysis Workflow");

    if args.input.is_file() {
        execute_single_file(&args)
    } else if args.input.is_dir() {
        execute_batch(&args)
    } else {
        Err(XrfError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

/// 处理设置（批量模式下在线程间共享）
struct ProcessSettings {
    output_dir: PathBuf,
    sensor: DetectorSelection,
    calibration: CalibrationArgs,
    detection: DetectionArgs,
    plot_opts: PlotOptions,
    extension: &'static str,
    plot_all: bool,
    overwrite: bool,
}

impl ProcessSettings {
    fn from_args(args: &ProcessArgs) -> Self {
        Self {
            output_dir: args.output.clone(),
            sensor: args.sensor,
            calibration: args.calibration.clone(),
            detection: args.detection.clone(),
            plot_opts: pipeline::plot_options(&args.plot),
            extension: args.plot.format.extension(),
            plot_all: args.plot_all,
            overwrite: args.overwrite,
        }
    }

    fn peaks_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{}_peaks.csv", stem))
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| XrfError::FileWriteError {
        path: dir.display().to_string(),
        source: e,
    })
}

// ─────────────────────────────────────────────────────────────
// 单文件模式
// ─────────────────────────────────────────────────────────────

fn execute_single_file(args: &ProcessArgs) -> Result<()> {
    output::print_info(&format!("Single file mode: '{}'", args.input.display()));
    let settings = ProcessSettings::from_args(args);

    let spinner = progress::create_spinner("Reading scan and applying corrections...");
    let loaded = pipeline::load_scan(
        &args.input,
        &settings.calibration,
        settings.sensor,
        args.database.incident_energy,
    );
    spinner.finish_and_clear();
    let loaded = loaded?;
    pipeline::print_scan_summary(&loaded, settings.sensor);

    let mut db = pipeline::build_database(&args.database)?;
    let summary = db.initialize(loaded.excitation_kev)?;
    pipeline::print_init_summary(&db, &summary);

    let analysis = pipeline::analyze(&loaded, &db, &settings.detection)?;
    pipeline::print_peak_table(&analysis.peaks);

    ensure_dir(&settings.output_dir)?;
    let written = write_outputs(&loaded, &analysis, &settings, &pipeline::scan_stem(&args.input))?;

    output::print_separator();
    for (kind, path) in &written {
        output::print_written(kind, path);
    }

    let elements: BTreeSet<&str> = analysis
        .peaks
        .iter()
        .filter_map(|p| p.line().map(|l| l.element.as_str()))
        .collect();
    output::print_success(&format!(
        "{} peaks detected, {} identified, {} scatter",
        analysis.peaks.len(),
        analysis.identified_count(),
        analysis.detection.scatter_count()
    ));
    if !elements.is_empty() {
        output::print_info(&format!(
            "Elements found: {}",
            elements.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }
    Ok(())
}

/// 写出峰表与图像，返回 (类型, 路径) 列表
fn write_outputs(
    loaded: &LoadedScan,
    analysis: &Analysis,
    settings: &ProcessSettings,
    stem: &str,
) -> Result<Vec<(&'static str, PathBuf)>> {
    let mut written = Vec::new();

    let peaks_path = settings.peaks_path(stem);
    export::peaks_to_csv(&analysis.peaks, &peaks_path)?;
    written.push(("peaks", peaks_path));

    let detection_path = settings
        .output_dir
        .join(format!("{}_detection.{}", stem, settings.extension));
    pipeline::write_detection_plot(loaded, analysis, &detection_path, settings.plot_opts)?;
    written.push(("detection plot", detection_path));

    if settings.plot_all {
        let spectrum_path = settings
            .output_dir
            .join(format!("{}_spectrum.{}", stem, settings.extension));
        plot::spectrum_overview(
            loaded.axis.energies(),
            &loaded.corrected.sum_spectrum(),
            &loaded.corrected.max_envelope(),
            &spectrum_path,
            &loaded.scan.name,
            settings.plot_opts,
        )?;
        written.push(("spectrum plot", spectrum_path));

        let traces_path = settings.output_dir.join(format!("{}_traces.csv", stem));
        export::traces_to_csv(&analysis.representative, &analysis.detection, &traces_path)?;
        written.push(("traces", traces_path));
    }

    Ok(written)
}

// ─────────────────────────────────────────────────────────────
// 批量模式
// ─────────────────────────────────────────────────────────────

fn execute_batch(args: &ProcessArgs) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));

    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect()?;

    if files.is_empty() {
        output::print_warning(&format!(
            "No matching files found with pattern '{}'",
            args.pattern
        ));
        return Ok(());
    }
    output::print_info(&format!("Found {} scan files", files.len()));

    ensure_dir(&args.output)?;

    // 数据库在共享前按所有入射能量初始化
    let mut db = pipeline::build_database(&args.database)?;
    let energies = incident_energies(&files, args.database.incident_energy);
    for energy in energies.values() {
        if !db.is_initialized(*energy) {
            let summary = db.initialize(*energy)?;
            pipeline::print_init_summary(&db, &summary);
        }
    }

    let settings = Arc::new(ProcessSettings::from_args(args));
    let db = Arc::new(db);

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!("Running with {} parallel jobs", runner.jobs()));
    let result = runner.run(&files, |file| {
        process_batch_file(file, energies.get(file).copied(), &settings, &db)
    })?;

    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} success, {} skipped, {} failed",
        result.success, result.skipped, result.failed
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 预读每个文件的入射能量；读取失败的文件在处理阶段报告
fn incident_energies(files: &[PathBuf], override_kev: Option<f64>) -> HashMap<PathBuf, f64> {
    files
        .iter()
        .filter_map(|file| {
            let energy = match override_kev {
                Some(e) => Ok(e),
                None => peek_incident_energy_kev(file),
            };
            match energy {
                Ok(e) => Some((file.clone(), e)),
                Err(e) => {
                    output::print_skip(&format!("{}: {}", file.display(), e));
                    None
                }
            }
        })
        .collect()
}

fn process_batch_file(
    input: &PathBuf,
    energy_kev: Option<f64>,
    settings: &ProcessSettings,
    db: &LineDatabase,
) -> ProcessResult {
    let stem = pipeline::scan_stem(input);

    if settings.peaks_path(&stem).exists() && !settings.overwrite {
        return ProcessResult::Skipped(format!("Output exists, skipping: {}", stem));
    }

    let Some(energy_kev) = energy_kev else {
        return ProcessResult::Failed(
            input.display().to_string(),
            "could not determine incident energy".to_string(),
        );
    };

    let run = || -> Result<String> {
        let loaded = pipeline::load_scan(input, &settings.calibration, settings.sensor, Some(energy_kev))?;
        let analysis = pipeline::analyze(&loaded, db, &settings.detection)?;
        write_outputs(&loaded, &analysis, settings, &stem)?;
        Ok(format!(
            "{}: {} peaks, {} identified",
            stem,
            analysis.peaks.len(),
            analysis.identified_count()
        ))
    };

    match run() {
        Ok(msg) => ProcessResult::Success(msg),
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}
