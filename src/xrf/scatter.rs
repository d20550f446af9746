//! # 散射峰标记
//!
//! 将位于弹性或 Compton 预测能量附近的候选峰标记为散射峰。
//! 散射峰保留在输出中，但不参与谱线识别。
//!
//! ## 依赖关系
//! - 被 `xrf/detection.rs` 使用
//! - 使用 `xrf/physics.rs`

use crate::error::{Result, XrfError};
use crate::models::{CandidatePeak, ScatterKind};
use crate::xrf::physics::{compton_energy, elastic_energy, DEFAULT_DETECTOR_ANGLE_DEG};

/// 默认散射容差 (keV)
pub const DEFAULT_SCATTER_TOLERANCE_KEV: f64 = 0.5;

/// 散射检测配置
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterConfig {
    pub enabled: bool,
    /// 入射能量 (keV)；未知时不做散射检测
    pub incident_energy_kev: Option<f64>,
    /// 探测器散射角（度）
    pub detector_angle_deg: f64,
    /// 容差 (keV)
    pub tolerance_kev: f64,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            incident_energy_kev: None,
            detector_angle_deg: DEFAULT_DETECTOR_ANGLE_DEG,
            tolerance_kev: DEFAULT_SCATTER_TOLERANCE_KEV,
        }
    }
}

impl ScatterConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_kev.is_finite() || self.tolerance_kev < 0.0 {
            return Err(XrfError::InvalidArgument(format!(
                "scatter tolerance must be non-negative, got {} keV",
                self.tolerance_kev
            )));
        }
        if !self.detector_angle_deg.is_finite() {
            return Err(XrfError::InvalidArgument(
                "detector angle must be finite".to_string(),
            ));
        }
        if let Some(e0) = self.incident_energy_kev {
            if !e0.is_finite() || e0 <= 0.0 {
                return Err(XrfError::InvalidArgument(format!(
                    "incident energy must be positive, got {} keV",
                    e0
                )));
            }
        }
        Ok(())
    }

    /// 预测的散射峰能量 (弹性, Compton)
    pub fn predicted(&self) -> Option<(f64, f64)> {
        let e0 = self.incident_energy_kev?;
        Some((
            elastic_energy(e0),
            compton_energy(e0, self.detector_angle_deg),
        ))
    }

    /// 判断能量是否为散射峰；两者都在容差内时取较近者
    pub fn classify(&self, energy_kev: f64) -> Option<ScatterKind> {
        if !self.enabled {
            return None;
        }
        let (elastic, compton) = self.predicted()?;
        let d_elastic = (energy_kev - elastic).abs();
        let d_compton = (energy_kev - compton).abs();

        match (
            d_elastic <= self.tolerance_kev,
            d_compton <= self.tolerance_kev,
        ) {
            (true, true) if d_compton < d_elastic => Some(ScatterKind::Compton),
            (true, _) => Some(ScatterKind::Elastic),
            (false, true) => Some(ScatterKind::Compton),
            (false, false) => None,
        }
    }
}

/// 标记候选峰中的散射峰
pub fn flag_scatter(candidates: &mut [CandidatePeak], config: &ScatterConfig) {
    for peak in candidates.iter_mut() {
        peak.scatter = config.classify(peak.energy_kev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScatterConfig {
        ScatterConfig {
            incident_energy_kev: Some(10.0),
            ..ScatterConfig::default()
        }
    }

    #[test]
    fn test_classify() {
        let cfg = config();
        assert_eq!(cfg.classify(10.02), Some(ScatterKind::Elastic));
        let compton = compton_energy(10.0, 90.0);
        // 9.808 keV 同时在两者容差内，较近者胜出
        assert_eq!(cfg.classify(compton), Some(ScatterKind::Compton));
        assert_eq!(cfg.classify(6.4), None);

        assert_eq!(ScatterConfig::disabled().classify(10.0), None);
        assert_eq!(ScatterConfig::default().classify(10.0), None);
    }

    #[test]
    fn test_validate() {
        let mut cfg = config();
        assert!(cfg.validate().is_ok());
        cfg.tolerance_kev = -0.1;
        assert!(cfg.validate().is_err());
    }
}
