//! # XRF 图表生成
//!
//! 使用 `plotters` 库生成能谱与空间分布图。
//!
//! ## 功能
//! - 能谱总览：求和谱与最大值包络（对数纵轴）
//! - 峰检测诊断：能谱、背景、扣背景曲线，候选峰与散射峰标注
//! - 元素分布图：按色标着色的散点图，保持真实长宽比
//! - DPC 四联图：偏转幅值、X/Y 偏转、总强度
//! - 支持 PNG 和 SVG 输出
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `xrf/detection.rs`, `xrf/mapping.rs`, `xrf/dpc.rs` 的结果结构
//! - 使用 `plotters` 渲染图表

use crate::error::{Result, XrfError};
use crate::models::{Identification, IdentifiedPeak};
use crate::xrf::detection::DetectionResult;
use crate::xrf::dpc::DpcResult;
use crate::xrf::mapping::{ColorScale, ElementMap};

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// 图像尺寸与格式
#[derive(Debug, Clone, Copy)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    pub svg: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 700,
            svg: false,
        }
    }
}

fn plot_err<E: std::fmt::Debug>(e: E) -> XrfError {
    XrfError::PlotError(format!("{:?}", e))
}

// ─────────────────────────────────────────────────────────────
// 能谱总览
// ─────────────────────────────────────────────────────────────

/// 生成能谱总览图
pub fn spectrum_overview(
    energies: &[f64],
    sum: &[f64],
    envelope: &[f64],
    output_path: &Path,
    title: &str,
    opts: PlotOptions,
) -> Result<()> {
    if opts.svg {
        let root = SVGBackend::new(output_path, (opts.width, opts.height)).into_drawing_area();
        draw_overview(&root, energies, sum, envelope, title)?;
        root.present().map_err(plot_err)?;
    } else {
        let root = BitMapBackend::new(output_path, (opts.width, opts.height)).into_drawing_area();
        draw_overview(&root, energies, sum, envelope, title)?;
        root.present().map_err(plot_err)?;
    }
    Ok(())
}

fn draw_overview<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    energies: &[f64],
    sum: &[f64],
    envelope: &[f64],
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let (x_min, x_max) = energy_range(energies);
    let y_max = sum
        .iter()
        .chain(envelope)
        .copied()
        .fold(1.0_f64, f64::max)
        * 2.0;
    let y_min = positive_floor(sum.iter().chain(envelope).copied());

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, (y_min..y_max).log_scale())
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Energy (keV)")
        .y_desc("Intensity (counts)")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    let sum_color = RGBColor(0, 102, 204);
    chart
        .draw_series(LineSeries::new(
            energies.iter().zip(sum).map(|(e, v)| (*e, v.max(y_min))),
            sum_color.stroke_width(2),
        ))
        .map_err(plot_err)?
        .label("Sum")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], sum_color));

    let env_color = RGBColor(204, 51, 0);
    chart
        .draw_series(LineSeries::new(
            energies.iter().zip(envelope).map(|(e, v)| (*e, v.max(y_min))),
            env_color.stroke_width(1),
        ))
        .map_err(plot_err)?
        .label("Max envelope")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], env_color));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 峰检测诊断
// ─────────────────────────────────────────────────────────────

/// 生成峰检测诊断图
pub fn detection_plot(
    raw: &[f64],
    result: &DetectionResult,
    peaks: &[IdentifiedPeak],
    output_path: &Path,
    title: &str,
    opts: PlotOptions,
) -> Result<()> {
    if opts.svg {
        let root = SVGBackend::new(output_path, (opts.width, opts.height)).into_drawing_area();
        draw_detection(&root, raw, result, peaks, title)?;
        root.present().map_err(plot_err)?;
    } else {
        let root = BitMapBackend::new(output_path, (opts.width, opts.height)).into_drawing_area();
        draw_detection(&root, raw, result, peaks, title)?;
        root.present().map_err(plot_err)?;
    }
    Ok(())
}

fn draw_detection<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    raw: &[f64],
    result: &DetectionResult,
    peaks: &[IdentifiedPeak],
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let energies = &result.energies;
    let (x_min, x_max) = energy_range(energies);
    let y_max = raw.iter().copied().fold(1.0_f64, f64::max) * 1.15;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Energy (keV)")
        .y_desc("Intensity")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    let series: [(&[f64], RGBColor, &str); 3] = [
        (raw, RGBColor(120, 120, 120), "Spectrum"),
        (result.background.as_slice(), RGBColor(0, 153, 76), "Background"),
        (result.subtracted.as_slice(), RGBColor(0, 102, 204), "Processed"),
    ];
    for (data, color, label) in series {
        chart
            .draw_series(LineSeries::new(
                energies.iter().zip(data).map(|(e, v)| (*e, *v)),
                color.stroke_width(2),
            ))
            .map_err(plot_err)?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    let line_color = RGBColor(204, 0, 0);
    let scatter_color = RGBColor(230, 140, 0);
    let unknown_color = RGBColor(90, 90, 90);

    for p in peaks {
        let e = p.peak.energy_kev;
        let top = raw.get(p.peak.channel).copied().unwrap_or(p.peak.height);
        let (color, label) = match &p.identification {
            Identification::Line { line, .. } => (line_color, line.name()),
            Identification::Scatter(kind) => (scatter_color, kind.to_string()),
            Identification::Unidentified(_) => (unknown_color, "?".to_string()),
        };

        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(e, 0.0), (e, top)],
                color.stroke_width(1),
            )))
            .map_err(plot_err)?;

        chart
            .draw_series(std::iter::once(Text::new(
                label,
                (e, (top + y_max * 0.02).min(y_max * 0.97)),
                ("sans-serif", 12).into_font().color(&color),
            )))
            .map_err(plot_err)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 空间分布
// ─────────────────────────────────────────────────────────────

/// 生成元素分布图
pub fn element_map_plot(
    map: &ElementMap,
    scale: ColorScale,
    point_size: u32,
    output_path: &Path,
    opts: PlotOptions,
) -> Result<()> {
    let title = format!(
        "{} ({:.3} keV ± {:.2}, {} scale)",
        map.label, map.target_energy_kev, map.half_width_kev, scale
    );
    let x_desc = map.geometry.axis_label();
    if opts.svg {
        let root = SVGBackend::new(output_path, (opts.width, opts.height)).into_drawing_area();
        draw_scatter_map(&root, &map.x, &map.y, &map.intensity, scale, point_size, &title, x_desc)?;
        root.present().map_err(plot_err)?;
    } else {
        let root = BitMapBackend::new(output_path, (opts.width, opts.height)).into_drawing_area();
        draw_scatter_map(&root, &map.x, &map.y, &map.intensity, scale, point_size, &title, x_desc)?;
        root.present().map_err(plot_err)?;
    }
    Ok(())
}

/// 生成 DPC 四联图
pub fn dpc_plot(result: &DpcResult, point_size: u32, output_path: &Path, opts: PlotOptions) -> Result<()> {
    if opts.svg {
        let root = SVGBackend::new(output_path, (opts.width, opts.height)).into_drawing_area();
        draw_dpc(&root, result, point_size)?;
        root.present().map_err(plot_err)?;
    } else {
        let root = BitMapBackend::new(output_path, (opts.width, opts.height)).into_drawing_area();
        draw_dpc(&root, result, point_size)?;
        root.present().map_err(plot_err)?;
    }
    Ok(())
}

fn draw_dpc<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    result: &DpcResult,
    point_size: u32,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let x: Vec<f64> = result.points.iter().map(|p| p.x).collect();
    let y: Vec<f64> = result.points.iter().map(|p| p.y).collect();
    let panels: [(&str, Vec<f64>); 4] = [
        ("Deflection magnitude", result.points.iter().map(|p| p.magnitude).collect()),
        ("X deflection", result.points.iter().map(|p| p.beam_x).collect()),
        ("Y deflection", result.points.iter().map(|p| p.beam_y).collect()),
        ("Total intensity", result.points.iter().map(|p| p.total).collect()),
    ];

    let areas = root.split_evenly((2, 2));
    for (area, (title, values)) in areas.iter().zip(panels.iter()) {
        draw_scatter_map(area, &x, &y, values, ColorScale::Linear, point_size, title, "x (mm)")?;
    }

    Ok(())
}

/// 绘制着色散点图，右侧附色标
#[allow(clippy::too_many_arguments)]
fn draw_scatter_map<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    x: &[f64],
    y: &[f64],
    values: &[f64],
    scale: ColorScale,
    point_size: u32,
    title: &str,
    x_desc: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    area.fill(&WHITE).map_err(plot_err)?;

    let (w, h) = area.dim_in_pixel();
    let bar_width = (w / 12).max(40);
    let (main, bar) = area.split_horizontally(w.saturating_sub(bar_width));

    let (x_range, y_range) = equal_aspect_ranges(x, y, w.saturating_sub(bar_width), h);
    let mut chart = ChartBuilder::on(&main)
        .caption(title, ("sans-serif", 18).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(x_desc)
        .y_desc("y (mm)")
        .draw()
        .map_err(plot_err)?;

    let normalized = scale.normalize(values);
    chart
        .draw_series(
            x.iter()
                .zip(y)
                .zip(&normalized)
                .map(|((x, y), t)| Circle::new((*x, *y), point_size, colormap(*t).filled())),
        )
        .map_err(plot_err)?;

    // 色标
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi) = if lo.is_finite() && hi > lo { (lo, hi) } else { (0.0, 1.0) };

    let mut bar_chart = ChartBuilder::on(&bar)
        .margin_top(40)
        .margin_bottom(55)
        .margin_right(5)
        .y_label_area_size(35)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)
        .map_err(plot_err)?;

    bar_chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(3)
        .y_label_formatter(&|t| format_value(lo + t * (hi - lo)))
        .draw()
        .map_err(plot_err)?;

    let steps = 64;
    bar_chart
        .draw_series((0..steps).map(|i| {
            let t0 = i as f64 / steps as f64;
            let t1 = (i + 1) as f64 / steps as f64;
            Rectangle::new([(0.0, t0), (1.0, t1)], colormap(t0).filled())
        }))
        .map_err(plot_err)?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 工具函数
// ─────────────────────────────────────────────────────────────

fn energy_range(energies: &[f64]) -> (f64, f64) {
    let lo = energies.first().copied().unwrap_or(0.0);
    let hi = energies.last().copied().unwrap_or(1.0);
    if hi > lo {
        (lo, hi)
    } else {
        (lo, lo + 1.0)
    }
}

fn positive_floor(values: impl Iterator<Item = f64>) -> f64 {
    let min = values.filter(|v| *v > 0.0).fold(f64::INFINITY, f64::min);
    if min.is_finite() {
        (min * 0.5).max(1e-6)
    } else {
        0.1
    }
}

/// 扩展较短的坐标范围，使 1 mm 在两个方向上占相同像素
fn equal_aspect_ranges(x: &[f64], y: &[f64], width: u32, height: u32) -> ((f64, f64), (f64, f64)) {
    let bounds = |v: &[f64]| {
        let lo = v.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if lo.is_finite() && hi > lo {
            (lo, hi)
        } else if lo.is_finite() {
            (lo - 0.5, lo + 0.5)
        } else {
            (0.0, 1.0)
        }
    };
    let (x0, x1) = bounds(x);
    let (y0, y1) = bounds(y);
    let pad_x = (x1 - x0) * 0.03;
    let pad_y = (y1 - y0) * 0.03;
    let (x0, x1, y0, y1) = (x0 - pad_x, x1 + pad_x, y0 - pad_y, y1 + pad_y);

    let aspect = width.max(1) as f64 / height.max(1) as f64;
    let (sx, sy) = (x1 - x0, y1 - y0);
    if sx / sy > aspect {
        let target = sx / aspect;
        let c = (y0 + y1) / 2.0;
        ((x0, x1), (c - target / 2.0, c + target / 2.0))
    } else {
        let target = sy * aspect;
        let c = (x0 + x1) / 2.0;
        ((c - target / 2.0, c + target / 2.0), (y0, y1))
    }
}

/// 深蓝 → 青 → 黄 的连续色图
fn colormap(t: f64) -> RGBColor {
    const STOPS: [(f64, (f64, f64, f64)); 4] = [
        (0.0, (68.0, 1.0, 84.0)),
        (0.33, (49.0, 104.0, 142.0)),
        (0.66, (53.0, 183.0, 121.0)),
        (1.0, (253.0, 231.0, 37.0)),
    ];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    for pair in STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            let mix = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
            return RGBColor(mix(c0.0, c1.0), mix(c0.1, c1.1), mix(c0.2, c1.2));
        }
    }
    RGBColor(253, 231, 37)
}

fn format_value(v: f64) -> String {
    if v != 0.0 && (v.abs() >= 1e4 || v.abs() < 1e-2) {
        format!("{:.1e}", v)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_aspect_ranges() {
        let ((x0, x1), (y0, y1)) = equal_aspect_ranges(&[0.0, 10.0], &[0.0, 1.0], 200, 100);
        assert!(((x1 - x0) / (y1 - y0) - 2.0).abs() < 1e-9);

        let ((x0, x1), (y0, y1)) = equal_aspect_ranges(&[0.0, 1.0], &[0.0, 10.0], 200, 100);
        assert!(((x1 - x0) / (y1 - y0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_colormap_endpoints() {
        assert_eq!(colormap(0.0), RGBColor(68, 1, 84));
        assert_eq!(colormap(1.0), RGBColor(253, 231, 37));
        assert_eq!(colormap(f64::NAN), RGBColor(68, 1, 84));
    }
}
