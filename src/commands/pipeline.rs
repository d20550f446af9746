//! # 分析流程公共步骤
//!
//! 各子命令共享的流程：读取扫描 → 校正 → 标定 → 峰检测 → 峰识别，
//! 以及命令行参数到核心配置的转换和结果表格输出。
//!
//! ## 依赖关系
//! - 被 `commands/` 下各子命令使用
//! - 使用 `cli/common.rs` 的共享参数组
//! - 使用 `parsers/` 读取数据，`xrf/` 执行计算

use crate::cli::common::{CalibrationArgs, DatabaseArgs, DetectionArgs, PlotArgs};
use crate::error::{Result, XrfError};
use crate::models::{DetectorSelection, Identification, IdentifiedPeak, ScanData, SpectrumStack};
use crate::parsers::{self, line_table::CsvLineTable};
use crate::utils::output;
use crate::xrf::calibration::calibrate;
use crate::xrf::database::InitSummary;
use crate::xrf::plot::{self, PlotOptions};
use crate::xrf::{
    correction, detection, identification, DetectionConfig, DetectionResult, EnergyAxis,
    LineDatabase, ScatterConfig,
};

use std::path::Path;
use tabled::{Table, Tabled};

// ─────────────────────────────────────────────────────────────
// 参数转换
// ─────────────────────────────────────────────────────────────

/// 解析逗号分隔的元素列表
pub fn parse_elements(list: &str) -> Result<Vec<String>> {
    let mut elements = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match parsers::parse_line_spec(item)? {
            (symbol, None) => {
                if !elements.contains(&symbol) {
                    elements.push(symbol);
                }
            }
            (_, Some(_)) => {
                return Err(XrfError::InvalidArgument(format!(
                    "'{}' names a line; --elements expects element symbols only",
                    item
                )))
            }
        }
    }
    if elements.is_empty() {
        return Err(XrfError::InvalidArgument(
            "--elements must list at least one element".to_string(),
        ));
    }
    Ok(elements)
}

/// 按参数构建谱线数据库（尚未初始化）
pub fn build_database(args: &DatabaseArgs) -> Result<LineDatabase> {
    if !args.resolution.is_finite() || args.resolution < 0.0 {
        return Err(XrfError::InvalidArgument(format!(
            "--resolution must be a non-negative energy in eV, got {}",
            args.resolution
        )));
    }

    let db = match &args.line_table {
        Some(path) => {
            let table = CsvLineTable::from_file(path)?;
            let table_elements = crate::xrf::LineSource::elements(&table);
            LineDatabase::new(Box::new(table)).with_elements(table_elements)
        }
        None => LineDatabase::builtin(),
    };

    let db = match &args.elements {
        Some(list) => db.with_elements(parse_elements(list)?),
        None => db,
    };

    Ok(db.with_resolution_ev(args.resolution))
}

/// 按参数与入射能量构建峰检测配置
pub fn detection_config(args: &DetectionArgs, incident_energy_kev: f64) -> Result<DetectionConfig> {
    let scatter = ScatterConfig {
        enabled: !args.no_scatter,
        incident_energy_kev: Some(incident_energy_kev),
        detector_angle_deg: args.detector_angle,
        tolerance_kev: args.scatter_tolerance,
    };

    DetectionConfig::builder()
        .min_height(args.height)
        .min_distance_ev(args.distance)
        .min_prominence(args.prominence)
        .smoothing(args.smooth_window, args.smooth_method.into())
        .background(args.background())
        .scatter(scatter)
        .energy_limit_kev(args.energy_limit)
        .build()
}

pub fn plot_options(args: &PlotArgs) -> PlotOptions {
    PlotOptions {
        width: args.fig_width,
        height: args.fig_height,
        svg: args.format == crate::cli::common::ImageFormat::Svg,
    }
}

/// 输入文件名（不含扩展名）
pub fn scan_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scan")
        .to_string()
}

// ─────────────────────────────────────────────────────────────
// 读取与预处理
// ─────────────────────────────────────────────────────────────

/// 已校正、已标定的扫描
pub struct LoadedScan {
    pub scan: ScanData,
    pub corrected: SpectrumStack,
    pub axis: EnergyAxis,
    /// 激发能量 (keV)
    pub excitation_kev: f64,
}

/// 读取扫描文件并完成校正与能量标定
pub fn load_scan(
    path: &Path,
    calibration: &CalibrationArgs,
    sensor: DetectorSelection,
    incident_energy_kev: Option<f64>,
) -> Result<LoadedScan> {
    let scan = parsers::parse_scan_file(path)?;
    let corrected = correction::correct_scan(&scan, sensor)?;
    let axis = calibrate(
        corrected.n_channels(),
        calibration.ev_per_channel,
        calibration.energy_offset,
    )?;

    let excitation_kev = match incident_energy_kev {
        Some(e) if e.is_finite() && e > 0.0 => e,
        Some(e) => {
            return Err(XrfError::InvalidArgument(format!(
                "--incident-energy must be positive, got {} keV",
                e
            )))
        }
        None => scan.mean_incident_energy_kev()?,
    };

    Ok(LoadedScan {
        scan,
        corrected,
        axis,
        excitation_kev,
    })
}

// ─────────────────────────────────────────────────────────────
// 检测与识别
// ─────────────────────────────────────────────────────────────

/// 一次完整分析的结果
pub struct Analysis {
    /// 用于检测的代表性能谱
    pub representative: Vec<f64>,
    pub detection: DetectionResult,
    pub peaks: Vec<IdentifiedPeak>,
}

impl Analysis {
    pub fn identified_count(&self) -> usize {
        self.peaks.iter().filter(|p| p.is_identified()).count()
    }
}

/// 在已初始化的数据库上运行峰检测与识别
pub fn analyze(loaded: &LoadedScan, db: &LineDatabase, args: &DetectionArgs) -> Result<Analysis> {
    let config = detection_config(args, loaded.excitation_kev)?;
    let representative = crate::models::Representative::from(args.representative)
        .extract(&loaded.corrected);

    let detection = detection::detect(&representative, &loaded.axis, &config)?;
    let peaks = identification::identify(
        &detection.candidates,
        db,
        loaded.excitation_kev,
        args.tolerance_kev(),
    )?;

    Ok(Analysis {
        representative,
        detection,
        peaks,
    })
}

/// 生成检测诊断图
pub fn write_detection_plot(
    loaded: &LoadedScan,
    analysis: &Analysis,
    path: &Path,
    opts: PlotOptions,
) -> Result<()> {
    let title = format!(
        "{} ({} peaks, {} identified)",
        loaded.scan.name,
        analysis.peaks.len(),
        analysis.identified_count()
    );
    plot::detection_plot(
        &analysis.representative,
        &analysis.detection,
        &analysis.peaks,
        path,
        &title,
        opts,
    )
}

// ─────────────────────────────────────────────────────────────
// 终端输出
// ─────────────────────────────────────────────────────────────

pub fn print_scan_summary(loaded: &LoadedScan, sensor: DetectorSelection) {
    let axis = loaded.axis.energies();
    output::print_field("Scan", &loaded.scan.name);
    output::print_field("Pixels", &loaded.scan.n_pixels().to_string());
    output::print_field(
        "Detector elements",
        &format!("{} (using {})", loaded.scan.n_detectors(), sensor),
    );
    output::print_field("Channels", &loaded.axis.len().to_string());
    if let (Some(first), Some(last)) = (axis.first(), axis.last()) {
        output::print_field("Energy range", &format!("{:.3} - {:.3} keV", first, last));
    }
    output::print_field(
        "Incident energy",
        &format!("{:.3} keV", loaded.excitation_kev),
    );
}

pub fn print_init_summary(db: &LineDatabase, summary: &InitSummary) {
    let status = if summary.cached { "cached" } else { "built" };
    output::print_info(&format!(
        "Line database ({}) {} at {:.3} keV: {} excitable lines over {} elements",
        db.source_name(),
        status,
        summary.excitation_kev,
        summary.total_lines(),
        summary.per_element.iter().filter(|(_, n)| *n > 0).count()
    ));
}

#[derive(Tabled)]
struct PeakRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Energy (keV)")]
    energy: String,
    #[tabled(rename = "Height")]
    height: String,
    #[tabled(rename = "Prominence")]
    prominence: String,
    #[tabled(rename = "Assignment")]
    assignment: String,
    #[tabled(rename = "Line (keV)")]
    line_energy: String,
    #[tabled(rename = "Δ (eV)")]
    residual: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "In tol.")]
    candidates: usize,
}

/// 打印峰识别表格
pub fn print_peak_table(peaks: &[IdentifiedPeak]) {
    let rows: Vec<PeakRow> = peaks
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let (assignment, line_energy, residual, confidence) = match &p.identification {
                Identification::Line {
                    line,
                    residual_kev,
                    confidence,
                } => (
                    format!("{} ({})", line.name(), line.sub_line),
                    format!("{:.4}", line.energy_kev),
                    format!("{:.1}", residual_kev * 1000.0),
                    format!("{:.3}", confidence),
                ),
                _ => (p.label(), "-".to_string(), "-".to_string(), "-".to_string()),
            };
            PeakRow {
                index: i + 1,
                energy: format!("{:.4}", p.peak.energy_kev),
                height: format!("{:.1}", p.peak.height),
                prominence: format!("{:.1}", p.peak.prominence),
                assignment,
                line_energy,
                residual,
                confidence,
                candidates: p.candidates_in_tolerance,
            }
        })
        .collect();

    if rows.is_empty() {
        output::print_warning("No peaks found");
        return;
    }

    output::print_header(&format!("Detected Peaks ({})", rows.len()));
    println!("{}", Table::new(&rows));
}
