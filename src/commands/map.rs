//! # map-element 子命令实现
//!
//! 对每个像素在目标能量 ± 半宽内积分，生成元素或散射峰的空间分布图。
//!
//! ## 依赖关系
//! - 使用 `cli/map.rs` 定义的 MapArgs
//! - 使用 `xrf/mapping.rs` 计算，`xrf/plot.rs` 绘图

use super::pipeline;
use crate::cli::map::MapArgs;
use crate::error::{Result, XrfError};
use crate::models::LineFamily;
use crate::utils::{output, progress};
use crate::xrf::mapping;
use crate::xrf::{export, plot, ColorScale, GeometryCorrection, MapTarget};

use std::path::PathBuf;

/// 由命令行开关确定几何校正
fn geometry(args: &MapArgs) -> GeometryCorrection {
    match (args.correct_45deg, args.compress_x) {
        (false, _) => GeometryCorrection::None,
        (true, false) => GeometryCorrection::Expand,
        (true, true) => GeometryCorrection::Compress,
    }
}

/// 执行元素分布图
pub fn execute(args: MapArgs) -> Result<()> {
    output::print_header("XRF Element Map");

    if !args.input.is_file() {
        return Err(XrfError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    let family = LineFamily::from_label(&args.line).ok_or_else(|| {
        XrfError::InvalidArgument(format!(
            "Invalid line family '{}'. Use one of: Ka, Kb, La, Lb, Ma, Mb",
            args.line
        ))
    })?;
    let target = MapTarget::parse(&args.target, family)?;

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
    if let MapTarget::Line { element, .. } = &target {
        if !db.elements().iter().any(|e| e == element) {
            let mut elements = db.elements().to_vec();
            elements.push(element.clone());
            db = db.with_elements(elements);
        }
    }
    db.initialize(loaded.excitation_kev)?;

    let (label, energy_kev) = target.resolve(&db, loaded.excitation_kev, args.detector_angle)?;
    output::print_info(&format!(
        "Target: {} at {:.4} keV (± {:.3} keV)",
        label, energy_kev, args.width
    ));

    let geometry = geometry(&args);
    let map = mapping::element_map(
        &loaded.corrected,
        &loaded.axis,
        &loaded.scan.x,
        &loaded.scan.y,
        label,
        energy_kev,
        args.width,
        geometry,
    )?;

    if map.n_channels_integrated == 0 {
        output::print_warning("Integration window lies outside the calibrated energy range");
    }

    let (min, max, mean) = map.stats();
    output::print_field("Channels integrated", &map.n_channels_integrated.to_string());
    output::print_field(
        "Intensity",
        &format!("min {:.4e}, max {:.4e}, mean {:.4e}", min, max, mean),
    );
    match map.grid() {
        Some(grid) => output::print_field(
            "Scan grid",
            &format!("{} rows x {} columns", grid.n_rows, grid.n_cols),
        ),
        None => output::print_field("Scan grid", "irregular"),
    }
    if geometry != GeometryCorrection::None {
        output::print_field("Geometry", geometry.axis_label());
    }

    let scale: ColorScale = args.scale.into();
    let output_path = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "{}_{}_map.{}",
            pipeline::scan_stem(&args.input),
            target.to_string().replace(' ', "_"),
            args.plot.format.extension()
        ))
    });
    plot::element_map_plot(
        &map,
        scale,
        args.point_size,
        &output_path,
        pipeline::plot_options(&args.plot),
    )?;
    output::print_written("map", &output_path);

    if let Some(path) = &args.output_csv {
        export::map_to_csv(&map, path)?;
        output::print_written("map data", path);
    }

    output::print_success("Element map complete");
    Ok(())
}
