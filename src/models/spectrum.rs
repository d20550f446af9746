//! # 能谱数据模型
//!
//! 定义逐像素能谱堆栈与完整扫描数据集的统一表示。
//!
//! ## 约定
//! - `SpectrumStack` 按 (像素 × 通道) 行优先平铺存储
//! - 同一次分析中所有能谱的通道数恒定
//! - 多元探测器按探测单元分别存储，各自带死时间因子
//!
//! ## 依赖关系
//! - 被 `parsers/scan.rs` 构造
//! - 被 `xrf/correction.rs`, `xrf/mapping.rs`, `commands/` 使用

use crate::error::{Result, XrfError};

use serde::{Deserialize, Serialize};

/// 逐像素能谱堆栈 (像素 × 通道)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumStack {
    /// 每条能谱的通道数
    n_channels: usize,
    /// 平铺的计数数据
    data: Vec<f64>,
}

impl SpectrumStack {
    /// 创建空堆栈
    pub fn with_channels(n_channels: usize) -> Result<Self> {
        if n_channels == 0 {
            return Err(XrfError::InvalidArgument(
                "spectrum must have at least one channel".to_string(),
            ));
        }
        Ok(Self {
            n_channels,
            data: Vec::new(),
        })
    }

    /// 从平铺数据创建
    pub fn from_flat(n_channels: usize, data: Vec<f64>) -> Result<Self> {
        if n_channels == 0 {
            return Err(XrfError::InvalidArgument(
                "spectrum must have at least one channel".to_string(),
            ));
        }
        if data.len() % n_channels != 0 {
            return Err(XrfError::DimensionMismatch {
                what: "flat spectrum buffer".to_string(),
                expected: (data.len() / n_channels + 1) * n_channels,
                found: data.len(),
            });
        }
        Ok(Self { n_channels, data })
    }

    /// 从逐行能谱创建（检查通道数一致）
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_channels = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut stack = Self::with_channels(n_channels)?;
        for row in &rows {
            stack.push(row)?;
        }
        Ok(stack)
    }

    /// 单条能谱
    pub fn single(spectrum: Vec<f64>) -> Result<Self> {
        let n = spectrum.len();
        Self::from_flat(n, spectrum)
    }

    /// 追加一条能谱
    pub fn push(&mut self, spectrum: &[f64]) -> Result<()> {
        if spectrum.len() != self.n_channels {
            return Err(XrfError::DimensionMismatch {
                what: "spectrum channels".to_string(),
                expected: self.n_channels,
                found: spectrum.len(),
            });
        }
        self.data.extend_from_slice(spectrum);
        Ok(())
    }

    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    pub fn n_pixels(&self) -> usize {
        self.data.len() / self.n_channels
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 获取第 i 个像素的能谱
    pub fn pixel(&self, index: usize) -> &[f64] {
        let start = index * self.n_channels;
        &self.data[start..start + self.n_channels]
    }

    /// 遍历所有像素能谱
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_channels)
    }

    /// 可变遍历所有像素能谱
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f64]> {
        self.data.chunks_exact_mut(self.n_channels)
    }

    /// 积分能谱（所有像素求和）
    pub fn sum_spectrum(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.n_channels];
        for row in self.rows() {
            for (t, v) in total.iter_mut().zip(row) {
                *t += v;
            }
        }
        total
    }

    /// 最大包络能谱（逐通道取所有像素最大值）
    ///
    /// 保留求和时会被稀释的稀有亮点特征。
    pub fn max_envelope(&self) -> Vec<f64> {
        let mut envelope = vec![f64::NEG_INFINITY; self.n_channels];
        for row in self.rows() {
            for (e, v) in envelope.iter_mut().zip(row) {
                *e = e.max(*v);
            }
        }
        for e in envelope.iter_mut() {
            if !e.is_finite() {
                *e = 0.0;
            }
        }
        envelope
    }

    /// 逐元素累加另一个同形状堆栈
    pub fn accumulate(&mut self, other: &SpectrumStack) -> Result<()> {
        if other.n_channels != self.n_channels {
            return Err(XrfError::DimensionMismatch {
                what: "spectrum channels".to_string(),
                expected: self.n_channels,
                found: other.n_channels,
            });
        }
        if other.data.len() != self.data.len() {
            return Err(XrfError::DimensionMismatch {
                what: "pixel count".to_string(),
                expected: self.n_pixels(),
                found: other.n_pixels(),
            });
        }
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
        Ok(())
    }
}

/// 代表性能谱类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Representative {
    /// 所有像素求和
    Sum,
    /// 逐通道最大值包络
    #[default]
    Envelope,
}

impl Representative {
    /// 从堆栈提取代表性能谱
    pub fn extract(&self, stack: &SpectrumStack) -> Vec<f64> {
        match self {
            Representative::Sum => stack.sum_spectrum(),
            Representative::Envelope => stack.max_envelope(),
        }
    }
}

impl std::fmt::Display for Representative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Representative::Sum => write!(f, "sum"),
            Representative::Envelope => write!(f, "max-envelope"),
        }
    }
}

/// 探测单元选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorSelection {
    /// 所有探测单元求和
    #[default]
    All,
    /// 单个探测单元
    Element(usize),
}

impl std::fmt::Display for DetectorSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorSelection::All => write!(f, "all elements"),
            DetectorSelection::Element(i) => write!(f, "element {}", i),
        }
    }
}

/// 单个探测单元的数据
#[derive(Debug, Clone)]
pub struct DetectorElement {
    /// 原始计数 (像素 × 通道)
    pub spectra: SpectrumStack,
    /// 逐像素死时间校正因子（≥ 1）
    pub deadtime: Vec<f64>,
}

/// 一次扫描的完整数据集
#[derive(Debug, Clone)]
pub struct ScanData {
    /// 数据集名称（通常取文件名）
    pub name: String,
    /// 各探测单元数据
    pub detectors: Vec<DetectorElement>,
    /// 逐像素入射光强 i0
    pub i0: Vec<f64>,
    /// 逐像素 x 坐标
    pub x: Vec<f64>,
    /// 逐像素 y 坐标
    pub y: Vec<f64>,
    /// 逐像素入射能量 (eV)
    pub incident_energy_ev: Vec<f64>,
}

impl ScanData {
    pub fn n_pixels(&self) -> usize {
        self.i0.len()
    }

    pub fn n_detectors(&self) -> usize {
        self.detectors.len()
    }

    pub fn n_channels(&self) -> usize {
        self.detectors
            .first()
            .map(|d| d.spectra.n_channels())
            .unwrap_or(0)
    }

    /// 检查各数组形状一致
    pub fn validate(&self) -> Result<()> {
        if self.detectors.is_empty() {
            return Err(XrfError::InvalidArgument(format!(
                "scan '{}' contains no detector elements",
                self.name
            )));
        }

        let n = self.n_pixels();
        for (what, len) in [
            ("x coordinates", self.x.len()),
            ("y coordinates", self.y.len()),
            ("incident energies", self.incident_energy_ev.len()),
        ] {
            if len != n {
                return Err(XrfError::DimensionMismatch {
                    what: what.to_string(),
                    expected: n,
                    found: len,
                });
            }
        }

        let n_channels = self.n_channels();
        for (i, det) in self.detectors.iter().enumerate() {
            if det.spectra.n_channels() != n_channels {
                return Err(XrfError::DimensionMismatch {
                    what: format!("channels of detector element {}", i),
                    expected: n_channels,
                    found: det.spectra.n_channels(),
                });
            }
            if det.spectra.n_pixels() != n {
                return Err(XrfError::DimensionMismatch {
                    what: format!("pixels of detector element {}", i),
                    expected: n,
                    found: det.spectra.n_pixels(),
                });
            }
        }

        Ok(())
    }

    /// 平均入射能量 (keV)
    pub fn mean_incident_energy_kev(&self) -> Result<f64> {
        let valid: Vec<f64> = self
            .incident_energy_ev
            .iter()
            .copied()
            .filter(|e| e.is_finite() && *e > 0.0)
            .collect();
        if valid.is_empty() {
            return Err(XrfError::InvalidArgument(format!(
                "scan '{}' has no valid incident energy values",
                self.name
            )));
        }
        Ok(valid.iter().sum::<f64>() / valid.len() as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_rejects_ragged_rows() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]];
        assert!(matches!(
            SpectrumStack::from_rows(rows),
            Err(XrfError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_sum_and_envelope() {
        let stack =
            SpectrumStack::from_rows(vec![vec![1.0, 5.0, 0.0], vec![3.0, 1.0, 2.0]]).unwrap();
        assert_eq!(stack.n_pixels(), 2);
        assert_eq!(stack.sum_spectrum(), vec![4.0, 6.0, 2.0]);
        assert_eq!(stack.max_envelope(), vec![3.0, 5.0, 2.0]);
    }

    #[test]
    fn test_accumulate_requires_same_shape() {
        let mut a = SpectrumStack::from_rows(vec![vec![1.0, 1.0]]).unwrap();
        let b = SpectrumStack::from_rows(vec![vec![2.0, 3.0]]).unwrap();
        a.accumulate(&b).unwrap();
        assert_eq!(a.pixel(0), &[3.0, 4.0]);

        let c = SpectrumStack::from_rows(vec![vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        assert!(a.accumulate(&c).is_err());
    }
}
