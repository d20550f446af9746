//! # 峰检测引擎
//!
//! 对代表性能谱依次执行：平滑 → 背景扣除 → 局部极大值搜索 → 散射标记。
//!
//! ## 约定
//! - 输入全为非正值或少于 3 个通道时返回 `EmptySpectrum`
//! - 未找到峰是成功的空结果
//! - 候选峰按能量升序输出，散射峰保留但带标记
//! - 默认分析能量上限为 1.1 × 入射能量；上限以上的通道在处理前截去，
//!   返回的处理曲线与能量轴只覆盖截取后的范围
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `xrf/smoothing.rs`, `xrf/background.rs`, `xrf/peaks.rs`, `xrf/scatter.rs`

use crate::error::{Result, XrfError};
use crate::models::CandidatePeak;
use crate::xrf::background::{self, BackgroundMethod};
use crate::xrf::calibration::EnergyAxis;
use crate::xrf::peaks::{self, PeakFilter};
use crate::xrf::scatter::{self, ScatterConfig};
use crate::xrf::smoothing::{self, SmoothingMethod};

/// 默认分析上限相对入射能量的倍数
pub const ENERGY_LIMIT_FACTOR: f64 = 1.1;

/// 峰检测配置
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// 最小峰高（扣背景后）
    pub min_height: f64,
    /// 最小峰间距 (eV)
    pub min_distance_ev: f64,
    /// 最小显著度
    pub min_prominence: f64,
    /// 平滑窗口（通道），0 或 1 表示不平滑
    pub smoothing_window: usize,
    pub smoothing_method: SmoothingMethod,
    pub background: BackgroundMethod,
    pub scatter: ScatterConfig,
    /// 分析能量上限 (keV)
    pub energy_limit_kev: Option<f64>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_height: 10.0,
            min_distance_ev: 50.0,
            min_prominence: 10.0,
            smoothing_window: 5,
            smoothing_method: SmoothingMethod::default(),
            background: BackgroundMethod::default(),
            scatter: ScatterConfig::default(),
            energy_limit_kev: None,
        }
    }
}

impl DetectionConfig {
    pub fn builder() -> DetectionConfigBuilder {
        DetectionConfigBuilder {
            config: DetectionConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min height", self.min_height),
            ("min distance", self.min_distance_ev),
            ("min prominence", self.min_prominence),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(XrfError::InvalidArgument(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if let Some(limit) = self.energy_limit_kev {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(XrfError::InvalidArgument(format!(
                    "energy limit must be positive, got {} keV",
                    limit
                )));
            }
        }
        self.background.validate()?;
        self.scatter.validate()
    }

    /// 实际使用的分析能量上限
    pub fn effective_energy_limit(&self) -> Option<f64> {
        self.energy_limit_kev.or_else(|| {
            self.scatter
                .incident_energy_kev
                .map(|e0| e0 * ENERGY_LIMIT_FACTOR)
        })
    }
}

/// `DetectionConfig` 构建器，`build` 时校验
#[derive(Debug, Clone)]
pub struct DetectionConfigBuilder {
    config: DetectionConfig,
}

impl DetectionConfigBuilder {
    pub fn min_height(mut self, v: f64) -> Self {
        self.config.min_height = v;
        self
    }

    pub fn min_distance_ev(mut self, v: f64) -> Self {
        self.config.min_distance_ev = v;
        self
    }

    pub fn min_prominence(mut self, v: f64) -> Self {
        self.config.min_prominence = v;
        self
    }

    pub fn smoothing(mut self, window: usize, method: SmoothingMethod) -> Self {
        self.config.smoothing_window = window;
        self.config.smoothing_method = method;
        self
    }

    pub fn background(mut self, method: BackgroundMethod) -> Self {
        self.config.background = method;
        self
    }

    pub fn scatter(mut self, scatter: ScatterConfig) -> Self {
        self.config.scatter = scatter;
        self
    }

    pub fn energy_limit_kev(mut self, limit: Option<f64>) -> Self {
        self.config.energy_limit_kev = limit;
        self
    }

    pub fn build(self) -> Result<DetectionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// 峰检测结果
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// 候选峰（能量升序）
    pub candidates: Vec<CandidatePeak>,
    /// 平滑后的能谱
    pub smoothed: Vec<f64>,
    /// 背景估计
    pub background: Vec<f64>,
    /// 扣背景后的能谱
    pub subtracted: Vec<f64>,
    /// 能量轴 (keV)
    pub energies: Vec<f64>,
}

impl DetectionResult {
    pub fn scatter_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_scatter()).count()
    }
}

/// 在代表性能谱上检测候选峰
pub fn detect(
    spectrum: &[f64],
    axis: &EnergyAxis,
    config: &DetectionConfig,
) -> Result<DetectionResult> {
    config.validate()?;

    if axis.len() != spectrum.len() {
        return Err(XrfError::DimensionMismatch {
            what: "energy axis".to_string(),
            expected: spectrum.len(),
            found: axis.len(),
        });
    }

    // 分析上限以上的通道在平滑与背景估计之前截去
    let limit = config.effective_energy_limit();
    let n = match limit {
        Some(l) => axis.channel_range(f64::NEG_INFINITY, l).end,
        None => spectrum.len(),
    };
    let spectrum = &spectrum[..n];
    let energies = &axis.energies()[..n];

    if spectrum.len() < 3 {
        return Err(XrfError::EmptySpectrum(format!(
            "{} channels in analysis range, at least 3 required",
            spectrum.len()
        )));
    }
    if !spectrum.iter().any(|v| *v > 0.0) {
        return Err(XrfError::EmptySpectrum(
            "no positive counts in spectrum".to_string(),
        ));
    }

    let smoothed = smoothing::smooth(spectrum, config.smoothing_window, config.smoothing_method);
    let bkg = background::estimate(&smoothed, config.background);
    let subtracted = background::subtract(&smoothed, &bkg);

    let filter = PeakFilter {
        min_height: config.min_height,
        min_prominence: config.min_prominence,
        distance: axis.channels_for_ev(config.min_distance_ev),
    };

    let mut candidates: Vec<CandidatePeak> = peaks::find_peaks(&subtracted, &filter)
        .into_iter()
        .map(|p| CandidatePeak {
            channel: p.index,
            energy_kev: energies[p.index],
            height: p.height,
            prominence: p.prominence,
            left_base: p.left_base,
            right_base: p.right_base,
            width: p.width,
            scatter: None,
        })
        .collect();

    if config.scatter.enabled {
        scatter::flag_scatter(&mut candidates, &config.scatter);
    }

    Ok(DetectionResult {
        candidates,
        smoothed,
        background: bkg,
        subtracted,
        energies: energies.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScatterKind;
    use crate::xrf::calibration::calibrate;
    use crate::xrf::physics::compton_energy;
    use crate::xrf::synthetic::spectrum_with_peaks;

    fn config(e0: Option<f64>) -> DetectionConfig {
        DetectionConfig::builder()
            .min_height(10.0)
            .min_prominence(10.0)
            .min_distance_ev(50.0)
            .smoothing(5, SmoothingMethod::MovingAverage)
            .background(BackgroundMethod::RollingMinimum { radius: 50 })
            .scatter(ScatterConfig {
                incident_energy_kev: e0,
                ..ScatterConfig::default()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_spectrum() {
        let axis = calibrate(100, 10.0, 0.0).unwrap();
        assert!(matches!(
            detect(&vec![0.0; 100], &axis, &config(None)),
            Err(XrfError::EmptySpectrum(_))
        ));
        let short = calibrate(2, 10.0, 0.0).unwrap();
        assert!(matches!(
            detect(&[1.0, 2.0], &short, &config(None)),
            Err(XrfError::EmptySpectrum(_))
        ));
    }

    #[test]
    fn test_flat_spectrum_has_no_peaks() {
        let axis = calibrate(500, 10.0, 0.0).unwrap();
        let result = detect(&vec![5.0; 500], &axis, &config(None)).unwrap();
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_single_gaussian() {
        let axis = calibrate(1000, 10.0, 0.0).unwrap();
        let data = spectrum_with_peaks(1000, 10.0, 20.0, 6.0, &[(5.0, 300.0)]);
        let result = detect(&data, &axis, &config(None)).unwrap();

        assert_eq!(result.candidates.len(), 1);
        let peak = &result.candidates[0];
        assert!(peak.channel.abs_diff(500) <= 1);
        assert!(peak.scatter.is_none());
        assert_eq!(result.subtracted.len(), 1000);
    }

    #[test]
    fn test_scatter_flags() {
        let compton = compton_energy(10.0, 135.0);
        let axis = calibrate(1200, 10.0, 0.0).unwrap();
        let data = spectrum_with_peaks(
            1200,
            10.0,
            20.0,
            6.0,
            &[(6.4, 400.0), (compton, 200.0), (10.0, 300.0)],
        );
        let mut cfg = config(Some(10.0));
        cfg.scatter.detector_angle_deg = 135.0;
        let result = detect(&data, &axis, &cfg).unwrap();

        let kinds: Vec<Option<ScatterKind>> =
            result.candidates.iter().map(|c| c.scatter).collect();
        assert_eq!(
            kinds,
            vec![None, Some(ScatterKind::Compton), Some(ScatterKind::Elastic)]
        );
        assert_eq!(result.scatter_count(), 2);

        cfg.scatter.enabled = false;
        let plain = detect(&data, &axis, &cfg).unwrap();
        assert_eq!(plain.scatter_count(), 0);
    }

    #[test]
    fn test_energy_limit() {
        let axis = calibrate(1500, 10.0, 0.0).unwrap();
        let data = spectrum_with_peaks(1500, 10.0, 20.0, 6.0, &[(6.4, 400.0), (13.0, 400.0)]);
        let result = detect(&data, &axis, &config(Some(10.0))).unwrap();
        assert_eq!(result.candidates.len(), 1);
        assert!((result.candidates[0].energy_kev - 6.4).abs() < 0.02);
        assert_eq!(result.energies.len(), 1101);
        assert_eq!(result.subtracted.len(), 1101);
        assert!(result.energies.iter().all(|e| *e <= 11.0 + 1e-9));
    }

    #[test]
    fn test_peak_above_limit_does_not_mask_peak_below() {
        // 上限 11.0 keV；10.97 keV 的峰在上限内，11.01 keV 的更高峰在上限外
        let axis = calibrate(2000, 10.0, 0.0).unwrap();
        let data = spectrum_with_peaks(2000, 10.0, 0.0, 1.0, &[(10.97, 100.0), (11.01, 500.0)]);
        let cfg = DetectionConfig::builder()
            .min_height(10.0)
            .min_prominence(10.0)
            .min_distance_ev(50.0)
            .smoothing(0, SmoothingMethod::MovingAverage)
            .background(BackgroundMethod::None)
            .scatter(ScatterConfig {
                enabled: false,
                incident_energy_kev: Some(10.0),
                ..ScatterConfig::default()
            })
            .build()
            .unwrap();

        let result = detect(&data, &axis, &cfg).unwrap();
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].channel, 1097);
        assert!((result.candidates[0].energy_kev - 10.97).abs() < 1e-9);

        let mut wide = cfg.clone();
        wide.energy_limit_kev = Some(25.0);
        let unlimited = detect(&data, &axis, &wide).unwrap();
        assert_eq!(unlimited.candidates.len(), 1);
        assert_eq!(unlimited.candidates[0].channel, 1101);
    }

    #[test]
    fn test_limit_below_spectrum_is_empty() {
        let axis = calibrate(500, 10.0, 1000.0).unwrap();
        let data = spectrum_with_peaks(500, 10.0, 20.0, 6.0, &[(3.0, 300.0)]);
        let mut cfg = config(None);
        cfg.energy_limit_kev = Some(0.5);
        assert!(matches!(
            detect(&data, &axis, &cfg),
            Err(XrfError::EmptySpectrum(_))
        ));
    }
}
