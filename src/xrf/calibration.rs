//! # 能量标定
//!
//! 通道与能量之间的线性映射：`E(ch) = (offset + slope * ch) / 1000` keV。
//!
//! ## 约定
//! - 标定参数以 eV 给出，能量轴以 keV 表示
//! - 显式给定的能量轴必须严格递增
//!
//! ## 依赖关系
//! - 被 `xrf/detection.rs`, `xrf/mapping.rs`, `commands/` 使用

use crate::error::{Result, XrfError};

/// 默认通道宽度 (eV)
pub const DEFAULT_EV_PER_CHANNEL: f64 = 10.0;

/// 线性能量标定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyCalibration {
    /// 每通道能量 (eV)
    ev_per_channel: f64,
    /// 零通道能量 (eV)
    offset_ev: f64,
}

impl EnergyCalibration {
    pub fn new(ev_per_channel: f64, offset_ev: f64) -> Result<Self> {
        if !ev_per_channel.is_finite() || ev_per_channel <= 0.0 {
            return Err(XrfError::InvalidCalibration(format!(
                "eV per channel must be positive and finite, got {}",
                ev_per_channel
            )));
        }
        if !offset_ev.is_finite() {
            return Err(XrfError::InvalidCalibration(format!(
                "energy offset must be finite, got {}",
                offset_ev
            )));
        }
        Ok(Self {
            ev_per_channel,
            offset_ev,
        })
    }

    /// 通道 → 能量 (keV)
    pub fn energy_kev(&self, channel: f64) -> f64 {
        (self.offset_ev + self.ev_per_channel * channel) / 1000.0
    }

    /// 能量 (keV) → 分数通道
    pub fn channel(&self, energy_kev: f64) -> f64 {
        (energy_kev * 1000.0 - self.offset_ev) / self.ev_per_channel
    }

    /// 生成 n 个通道的能量轴
    pub fn axis(&self, n_channels: usize) -> EnergyAxis {
        EnergyAxis {
            energies: (0..n_channels)
                .map(|ch| self.energy_kev(ch as f64))
                .collect(),
        }
    }
}

/// 生成能量轴
pub fn calibrate(n_channels: usize, ev_per_channel: f64, offset_ev: f64) -> Result<EnergyAxis> {
    Ok(EnergyCalibration::new(ev_per_channel, offset_ev)?.axis(n_channels))
}

/// 能量轴 (keV)
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyAxis {
    energies: Vec<f64>,
}

impl EnergyAxis {
    /// 从任意能量序列构建（必须严格递增）
    pub fn from_energies(energies: Vec<f64>) -> Result<Self> {
        if let Some(bad) = energies.iter().find(|e| !e.is_finite()) {
            return Err(XrfError::InvalidCalibration(format!(
                "energy axis contains non-finite value {}",
                bad
            )));
        }
        if let Some(idx) = energies.windows(2).position(|w| w[1] <= w[0]) {
            return Err(XrfError::InvalidCalibration(format!(
                "energy axis is not strictly increasing at channel {}",
                idx + 1
            )));
        }
        Ok(Self { energies })
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// 平均通道宽度 (eV)
    pub fn mean_step_ev(&self) -> Option<f64> {
        let n = self.energies.len();
        if n < 2 {
            return None;
        }
        Some((self.energies[n - 1] - self.energies[0]) * 1000.0 / (n - 1) as f64)
    }

    /// 能量间距 (eV) → 通道数（按平均通道宽度），至少为 1
    pub fn channels_for_ev(&self, delta_ev: f64) -> usize {
        let step_ev = self.mean_step_ev().unwrap_or(1.0);
        ((delta_ev / step_ev).round() as usize).max(1)
    }

    /// 能量落在 [lo, hi] 内的通道范围
    pub fn channel_range(&self, lo_kev: f64, hi_kev: f64) -> std::ops::Range<usize> {
        let start = self.energies.partition_point(|e| *e < lo_kev);
        let end = self.energies.partition_point(|e| *e <= hi_kev);
        start..end.max(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cal = EnergyCalibration::new(10.0, -25.0).unwrap();
        for ch in [0usize, 1, 137, 1023, 4095] {
            let back = cal.channel(cal.energy_kev(ch as f64));
            assert!((back - ch as f64).abs() < 1e-9);
        }
        assert!((cal.energy_kev(640.0) - 6.375).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_calibration() {
        for slope in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                EnergyCalibration::new(slope, 0.0),
                Err(XrfError::InvalidCalibration(_))
            ));
        }
        assert!(EnergyCalibration::new(10.0, f64::NAN).is_err());
        assert!(EnergyAxis::from_energies(vec![1.0, 2.0, 2.0]).is_err());
        assert!(EnergyAxis::from_energies(vec![1.0, 2.0, 3.0]).is_ok());
    }

    #[test]
    fn test_channel_range_and_distance() {
        let axis = calibrate(100, 10.0, 0.0).unwrap();
        assert_eq!(axis.channel_range(0.1, 0.2), 10..21);
        assert_eq!(axis.channel_range(f64::NEG_INFINITY, 0.5).end, 51);

        assert_eq!(axis.channels_for_ev(50.0), 5);
        assert_eq!(axis.channels_for_ev(1.0), 1);
        let fine = calibrate(100, 2.5, 0.0).unwrap();
        assert_eq!(fine.channels_for_ev(50.0), 20);
    }
}
