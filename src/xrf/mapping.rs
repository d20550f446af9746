//! # 元素分布图
//!
//! 在每个像素的校正能谱上，对目标能量 ± 半宽窗口内的通道求和，得到空间分布。
//!
//! ## 约定
//! - 目标可以是数据库谱线、弹性散射 (E0) 或 Compton 散射
//! - 45° 几何校正只缩放 x 坐标（×√2 展开或 ×1/√2 压缩），不改变强度
//! - 色标只在绘图时应用
//!
//! ## 依赖关系
//! - 被 `commands/map.rs` 调用
//! - 使用 `xrf/database.rs`, `xrf/physics.rs`, `xrf/calibration.rs`

use crate::error::{Result, XrfError};
use crate::models::{LineFamily, SpectrumStack};
use crate::xrf::calibration::EnergyAxis;
use crate::xrf::database::LineDatabase;
use crate::xrf::physics::{compton_energy, elastic_energy};

use std::f64::consts::SQRT_2;

/// 默认积分半宽 (keV)
pub const DEFAULT_HALF_WIDTH_KEV: f64 = 0.15;

/// 分布图目标
#[derive(Debug, Clone, PartialEq)]
pub enum MapTarget {
    Line { element: String, family: LineFamily },
    Elastic,
    Compton,
}

impl MapTarget {
    /// 解析目标：`elastic`、`compton` 或元素符号（配合谱线族）
    pub fn parse(target: &str, family: LineFamily) -> Result<Self> {
        let t = target.trim();
        if t.is_empty() {
            return Err(XrfError::InvalidArgument("empty map target".to_string()));
        }
        match t.to_lowercase().as_str() {
            "elastic" => Ok(MapTarget::Elastic),
            "compton" => Ok(MapTarget::Compton),
            _ => Ok(MapTarget::Line {
                element: normalize_symbol(t),
                family,
            }),
        }
    }

    /// 解析目标能量与显示名
    pub fn resolve(
        &self,
        db: &LineDatabase,
        excitation_kev: f64,
        detector_angle_deg: f64,
    ) -> Result<(String, f64)> {
        match self {
            MapTarget::Line { element, family } => {
                let line = db.find_line(excitation_kev, element, *family)?;
                Ok((line.name(), line.energy_kev))
            }
            MapTarget::Elastic => Ok((
                "Elastic scatter".to_string(),
                elastic_energy(excitation_kev),
            )),
            MapTarget::Compton => Ok((
                "Compton scatter".to_string(),
                compton_energy(excitation_kev, detector_angle_deg),
            )),
        }
    }
}

impl std::fmt::Display for MapTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapTarget::Line { element, family } => write!(f, "{} {}", element, family),
            MapTarget::Elastic => write!(f, "elastic"),
            MapTarget::Compton => write!(f, "compton"),
        }
    }
}

/// 元素符号规范化，如 "fe" -> "Fe"
fn normalize_symbol(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// 45° 几何校正
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryCorrection {
    #[default]
    None,
    /// 样品表面坐标：x × √2
    Expand,
    /// 光束投影坐标：x / √2
    Compress,
}

impl GeometryCorrection {
    pub fn factor(&self) -> f64 {
        match self {
            GeometryCorrection::None => 1.0,
            GeometryCorrection::Expand => SQRT_2,
            GeometryCorrection::Compress => 1.0 / SQRT_2,
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            GeometryCorrection::None => "x (mm)",
            GeometryCorrection::Expand => "x (mm, sample surface)",
            GeometryCorrection::Compress => "x (mm, beam projection)",
        }
    }
}

/// 色标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScale {
    #[default]
    Linear,
    Log,
    Sqrt,
}

impl ColorScale {
    /// 将强度映射到色标空间；非正值在对数色标下取下限
    pub fn apply(&self, value: f64, floor: f64) -> f64 {
        match self {
            ColorScale::Linear => value,
            ColorScale::Log => value.max(floor).log10(),
            ColorScale::Sqrt => value.max(0.0).sqrt(),
        }
    }

    /// 整个数组映射并归一化到 [0, 1]
    pub fn normalize(&self, values: &[f64]) -> Vec<f64> {
        let floor = values
            .iter()
            .copied()
            .filter(|v| *v > 0.0)
            .fold(f64::INFINITY, f64::min);
        let floor = if floor.is_finite() { floor } else { 1e-12 };

        let scaled: Vec<f64> = values.iter().map(|v| self.apply(*v, floor)).collect();
        let lo = scaled.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = hi - lo;

        scaled
            .iter()
            .map(|v| if span > 0.0 { (v - lo) / span } else { 0.0 })
            .collect()
    }
}

impl std::fmt::Display for ColorScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorScale::Linear => write!(f, "linear"),
            ColorScale::Log => write!(f, "log"),
            ColorScale::Sqrt => write!(f, "sqrt"),
        }
    }
}

/// 规则扫描网格
#[derive(Debug, Clone, PartialEq)]
pub struct ScanGrid {
    pub n_rows: usize,
    pub n_cols: usize,
    pub unique_x: Vec<f64>,
    pub unique_y: Vec<f64>,
}

/// 检测规则矩形网格：唯一 x 数 × 唯一 y 数 == 像素数
pub fn detect_grid(x: &[f64], y: &[f64]) -> Option<ScanGrid> {
    if x.is_empty() || x.len() != y.len() {
        return None;
    }
    let unique_x = unique_sorted(x);
    let unique_y = unique_sorted(y);
    (unique_x.len() * unique_y.len() == x.len()).then(|| ScanGrid {
        n_rows: unique_y.len(),
        n_cols: unique_x.len(),
        unique_x,
        unique_y,
    })
}

fn unique_sorted(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    v
}

/// 元素分布图
#[derive(Debug, Clone)]
pub struct ElementMap {
    /// 显示名，如 "Fe Ka"
    pub label: String,
    /// 目标能量 (keV)
    pub target_energy_kev: f64,
    /// 积分半宽 (keV)
    pub half_width_kev: f64,
    /// 校正后的 x 坐标
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// 逐像素积分强度
    pub intensity: Vec<f64>,
    pub geometry: GeometryCorrection,
    /// 积分的通道数
    pub n_channels_integrated: usize,
}

impl ElementMap {
    pub fn grid(&self) -> Option<ScanGrid> {
        detect_grid(&self.x, &self.y)
    }

    /// (最小, 最大, 平均) 强度
    pub fn stats(&self) -> (f64, f64, f64) {
        if self.intensity.is_empty() {
            return (0.0, 0.0, 0.0);
        }
        let min = self.intensity.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self
            .intensity
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let mean = self.intensity.iter().sum::<f64>() / self.intensity.len() as f64;
        (min, max, mean)
    }
}

/// 对校正后的能谱堆栈积分生成分布图
#[allow(clippy::too_many_arguments)]
pub fn element_map(
    corrected: &SpectrumStack,
    axis: &EnergyAxis,
    x: &[f64],
    y: &[f64],
    label: impl Into<String>,
    target_energy_kev: f64,
    half_width_kev: f64,
    geometry: GeometryCorrection,
) -> Result<ElementMap> {
    if axis.len() != corrected.n_channels() {
        return Err(XrfError::DimensionMismatch {
            what: "energy axis".to_string(),
            expected: corrected.n_channels(),
            found: axis.len(),
        });
    }
    for (what, len) in [("x coordinates", x.len()), ("y coordinates", y.len())] {
        if len != corrected.n_pixels() {
            return Err(XrfError::DimensionMismatch {
                what: what.to_string(),
                expected: corrected.n_pixels(),
                found: len,
            });
        }
    }
    if !half_width_kev.is_finite() || half_width_kev <= 0.0 {
        return Err(XrfError::InvalidArgument(format!(
            "integration half-width must be positive, got {} keV",
            half_width_kev
        )));
    }

    let range = axis.channel_range(
        target_energy_kev - half_width_kev,
        target_energy_kev + half_width_kev,
    );
    let intensity = corrected
        .rows()
        .map(|row| row[range.clone()].iter().sum())
        .collect();

    let factor = geometry.factor();

    Ok(ElementMap {
        label: label.into(),
        target_energy_kev,
        half_width_kev,
        x: x.iter().map(|v| v * factor).collect(),
        y: y.to_vec(),
        intensity,
        geometry,
        n_channels_integrated: range.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrf::calibration::calibrate;

    #[test]
    fn test_integration_window() {
        let axis = calibrate(10, 100.0, 0.0).unwrap();
        // 通道能量 0.0, 0.1, ..., 0.9 keV
        let stack = SpectrumStack::from_rows(vec![vec![1.0; 10], (0..10).map(|i| i as f64).collect()])
            .unwrap();
        let map = element_map(
            &stack,
            &axis,
            &[0.0, 1.0],
            &[0.0, 0.0],
            "test",
            0.5,
            0.15,
            GeometryCorrection::None,
        )
        .unwrap();
        // 0.4, 0.5, 0.6 keV 三个通道
        assert_eq!(map.n_channels_integrated, 3);
        assert_eq!(map.intensity, vec![3.0, 15.0]);
    }

    #[test]
    fn test_geometry_only_scales_x() {
        let axis = calibrate(4, 100.0, 0.0).unwrap();
        let stack = SpectrumStack::from_rows(vec![vec![1.0; 4], vec![2.0; 4]]).unwrap();
        let plain = element_map(
            &stack, &axis, &[1.0, 2.0], &[3.0, 3.0], "t", 0.1, 0.1, GeometryCorrection::None,
        )
        .unwrap();
        let expanded = element_map(
            &stack, &axis, &[1.0, 2.0], &[3.0, 3.0], "t", 0.1, 0.1, GeometryCorrection::Expand,
        )
        .unwrap();
        let compressed = element_map(
            &stack, &axis, &[1.0, 2.0], &[3.0, 3.0], "t", 0.1, 0.1, GeometryCorrection::Compress,
        )
        .unwrap();

        assert_eq!(plain.intensity, expanded.intensity);
        assert!((expanded.x[1] - 2.0 * SQRT_2).abs() < 1e-12);
        assert!((compressed.x[1] - SQRT_2).abs() < 1e-12);
        assert_eq!(expanded.y, plain.y);
    }

    #[test]
    fn test_detect_grid() {
        let x = [0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        let y = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let grid = detect_grid(&x, &y).unwrap();
        assert_eq!((grid.n_rows, grid.n_cols), (2, 3));
        assert!(detect_grid(&x[..5], &y[..5]).is_none());
    }

    #[test]
    fn test_target_and_scale() {
        assert_eq!(
            MapTarget::parse("fe", LineFamily::Ka).unwrap(),
            MapTarget::Line {
                element: "Fe".to_string(),
                family: LineFamily::Ka
            }
        );
        assert_eq!(MapTarget::parse("Compton", LineFamily::Ka).unwrap(), MapTarget::Compton);

        let norm = ColorScale::Log.normalize(&[1.0, 10.0, 100.0, 0.0]);
        assert!((norm[1] - 0.5).abs() < 1e-12);
        assert_eq!(norm[3], 0.0);
        assert_eq!(ColorScale::Sqrt.apply(16.0, 0.0), 4.0);
    }
}
