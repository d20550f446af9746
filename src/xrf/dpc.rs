//! # 差分相衬 (DPC)
//!
//! 由四象限探测器信号计算光束偏转：
//! `beam_x = Lx·(thor_x/i0) / (2·(thor_tot/i0))`，`beam_y` 同理。
//! 相位梯度等于偏转量。
//!
//! ## 依赖关系
//! - 被 `commands/dpc.rs` 调用
//! - 输入由 `parsers/dpc.rs` 读取

use crate::error::{Result, XrfError};

use serde::Serialize;

/// 默认探测器尺寸 (mm)
pub const DEFAULT_DETECTOR_SIZE_MM: f64 = 10.0;

/// DPC 扫描数据
#[derive(Debug, Clone, Default)]
pub struct DpcScan {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub i0: Vec<f64>,
    pub thor_x: Vec<f64>,
    pub thor_y: Vec<f64>,
    pub thor_tot: Vec<f64>,
}

impl DpcScan {
    pub fn len(&self) -> usize {
        self.i0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i0.is_empty()
    }
}

/// 单像素 DPC 结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DpcPoint {
    pub x: f64,
    pub y: f64,
    pub beam_x: f64,
    pub beam_y: f64,
    pub phase_gradient_x: f64,
    pub phase_gradient_y: f64,
    pub magnitude: f64,
    pub total: f64,
}

/// DPC 结果
#[derive(Debug, Clone)]
pub struct DpcResult {
    pub name: String,
    pub points: Vec<DpcPoint>,
}

impl DpcResult {
    pub fn max_magnitude(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.magnitude)
            .fold(0.0, f64::max)
    }
}

/// 计算光束偏转
pub fn deflections(scan: &DpcScan, lx_mm: f64, ly_mm: f64) -> Result<DpcResult> {
    let n = scan.len();
    for (what, len) in [
        ("x", scan.x.len()),
        ("y", scan.y.len()),
        ("thor_x", scan.thor_x.len()),
        ("thor_y", scan.thor_y.len()),
        ("thor_tot", scan.thor_tot.len()),
    ] {
        if len != n {
            return Err(XrfError::MissingCorrectionData(format!(
                "{} has {} values for {} pixels",
                what, len, n
            )));
        }
    }
    if !(lx_mm.is_finite() && ly_mm.is_finite() && lx_mm > 0.0 && ly_mm > 0.0) {
        return Err(XrfError::InvalidArgument(format!(
            "detector size must be positive, got {} x {} mm",
            lx_mm, ly_mm
        )));
    }

    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        let i0 = scan.i0[i];
        if !i0.is_finite() || i0 <= 0.0 {
            return Err(XrfError::MissingCorrectionData(format!(
                "i0 at pixel {} is {}",
                i, i0
            )));
        }
        let total = scan.thor_tot[i] / i0;
        if !total.is_finite() || total == 0.0 {
            return Err(XrfError::MissingCorrectionData(format!(
                "total signal at pixel {} is zero",
                i
            )));
        }

        let beam_x = lx_mm * (scan.thor_x[i] / i0) / (2.0 * total);
        let beam_y = ly_mm * (scan.thor_y[i] / i0) / (2.0 * total);

        points.push(DpcPoint {
            x: scan.x[i],
            y: scan.y[i],
            beam_x,
            beam_y,
            phase_gradient_x: beam_x,
            phase_gradient_y: beam_y,
            magnitude: beam_x.hypot(beam_y),
            total: scan.thor_tot[i],
        });
    }

    Ok(DpcResult {
        name: scan.name.clone(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan() -> DpcScan {
        DpcScan {
            name: "dpc".to_string(),
            x: vec![0.0, 1.0],
            y: vec![0.0, 0.0],
            i0: vec![2.0, 4.0],
            thor_x: vec![0.3, -0.8],
            thor_y: vec![0.4, 0.0],
            thor_tot: vec![1.0, 2.0],
        }
    }

    #[test]
    fn test_deflection_formula() {
        let result = deflections(&scan(), 10.0, 10.0).unwrap();
        let p = &result.points[0];
        // i0 在分子分母中抵消
        assert!((p.beam_x - 1.5).abs() < 1e-12);
        assert!((p.beam_y - 2.0).abs() < 1e-12);
        assert!((p.magnitude - 2.5).abs() < 1e-12);
        assert_eq!(p.phase_gradient_x, p.beam_x);
        assert!((result.points[1].beam_x + 2.0).abs() < 1e-12);
        assert!((result.max_magnitude() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        let mut s = scan();
        s.thor_tot[1] = 0.0;
        assert!(matches!(
            deflections(&s, 10.0, 10.0),
            Err(XrfError::MissingCorrectionData(_))
        ));

        let mut s = scan();
        s.i0[0] = 0.0;
        assert!(deflections(&s, 10.0, 10.0).is_err());

        let mut s = scan();
        s.thor_y.pop();
        assert!(deflections(&s, 10.0, 10.0).is_err());
    }
}
