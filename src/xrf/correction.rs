//! # 数据校正
//!
//! 对原始计数做死时间与入射光强 (i0) 归一化：`raw * deadtime / i0`。
//!
//! ## 约定
//! - 纯函数，输入不被修改
//! - 任一像素的校正数据无效即整体失败
//! - 多元探测器逐单元校正后再求和或选取
//!
//! ## 依赖关系
//! - 被 `commands/` 和 `xrf/mapping.rs` 使用
//! - 使用 `models/spectrum.rs`

use crate::error::{Result, XrfError};
use crate::models::{DetectorSelection, ScanData, SpectrumStack};

/// 校正单个探测单元的能谱堆栈
pub fn correct(raw: &SpectrumStack, deadtime: &[f64], i0: &[f64]) -> Result<SpectrumStack> {
    let n = raw.n_pixels();

    if deadtime.len() != n {
        return Err(XrfError::MissingCorrectionData(format!(
            "deadtime has {} values for {} pixels",
            deadtime.len(),
            n
        )));
    }
    if i0.len() != n {
        return Err(XrfError::MissingCorrectionData(format!(
            "i0 has {} values for {} pixels",
            i0.len(),
            n
        )));
    }

    if let Some((idx, v)) = i0
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v <= 0.0)
    {
        return Err(XrfError::MissingCorrectionData(format!(
            "i0 at pixel {} is {}",
            idx, v
        )));
    }
    if let Some((idx, v)) = deadtime
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 1.0)
    {
        return Err(XrfError::MissingCorrectionData(format!(
            "deadtime factor at pixel {} is {} (must be >= 1)",
            idx, v
        )));
    }

    let mut corrected = raw.clone();
    for ((row, dt), norm) in corrected.rows_mut().zip(deadtime).zip(i0) {
        let factor = dt / norm;
        for v in row.iter_mut() {
            *v *= factor;
        }
    }

    Ok(corrected)
}

/// 校正整个扫描，并按选择合并探测单元
pub fn correct_scan(scan: &ScanData, selection: DetectorSelection) -> Result<SpectrumStack> {
    scan.validate()?;

    match selection {
        DetectorSelection::Element(index) => {
            let det = scan.detectors.get(index).ok_or_else(|| {
                XrfError::InvalidArgument(format!(
                    "detector element {} requested, scan '{}' has {}",
                    index,
                    scan.name,
                    scan.n_detectors()
                ))
            })?;
            correct(&det.spectra, &det.deadtime, &scan.i0)
        }
        DetectorSelection::All => {
            let mut total: Option<SpectrumStack> = None;
            for det in &scan.detectors {
                let corrected = correct(&det.spectra, &det.deadtime, &scan.i0)?;
                match total.as_mut() {
                    Some(acc) => acc.accumulate(&corrected)?,
                    None => total = Some(corrected),
                }
            }
            total.ok_or_else(|| {
                XrfError::InvalidArgument(format!("scan '{}' has no detector elements", scan.name))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectorElement;

    fn stack() -> SpectrumStack {
        SpectrumStack::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 0.0, 6.0]]).unwrap()
    }

    #[test]
    fn test_correct_applies_factors() {
        let out = correct(&stack(), &[1.0, 1.5], &[2.0, 3.0]).unwrap();
        assert_eq!(out.pixel(0), &[0.5, 1.0, 1.5]);
        assert_eq!(out.pixel(1), &[2.0, 0.0, 3.0]);
    }

    #[test]
    fn test_correct_is_linear_and_non_negative() {
        let dt = [1.2, 1.0];
        let i0 = [0.5, 4.0];
        let single = correct(&stack(), &dt, &i0).unwrap();

        let doubled_raw =
            SpectrumStack::from_rows(vec![vec![2.0, 4.0, 6.0], vec![8.0, 0.0, 12.0]]).unwrap();
        let doubled = correct(&doubled_raw, &dt, &i0).unwrap();

        for (a, b) in single.rows().zip(doubled.rows()) {
            for (x, y) in a.iter().zip(b) {
                assert!(*x >= 0.0);
                assert!((2.0 * x - y).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_correct_rejects_bad_data() {
        let s = stack();
        assert!(matches!(
            correct(&s, &[1.0], &[1.0, 1.0]),
            Err(XrfError::MissingCorrectionData(_))
        ));
        assert!(matches!(
            correct(&s, &[1.0, 1.0], &[1.0, 0.0]),
            Err(XrfError::MissingCorrectionData(_))
        ));
        assert!(matches!(
            correct(&s, &[1.0, 1.0], &[1.0, f64::NAN]),
            Err(XrfError::MissingCorrectionData(_))
        ));
        assert!(matches!(
            correct(&s, &[0.9, 1.0], &[1.0, 1.0]),
            Err(XrfError::MissingCorrectionData(_))
        ));
    }

    #[test]
    fn test_correct_scan_sums_elements() {
        let scan = ScanData {
            name: "t".to_string(),
            detectors: vec![
                DetectorElement {
                    spectra: stack(),
                    deadtime: vec![1.0, 1.0],
                },
                DetectorElement {
                    spectra: stack(),
                    deadtime: vec![2.0, 1.0],
                },
            ],
            i0: vec![1.0, 2.0],
            x: vec![0.0, 1.0],
            y: vec![0.0, 0.0],
            incident_energy_ev: vec![10000.0, 10000.0],
        };

        let all = correct_scan(&scan, DetectorSelection::All).unwrap();
        assert_eq!(all.pixel(0), &[3.0, 6.0, 9.0]);
        assert_eq!(all.pixel(1), &[4.0, 0.0, 6.0]);

        let second = correct_scan(&scan, DetectorSelection::Element(1)).unwrap();
        assert_eq!(second.pixel(0), &[2.0, 4.0, 6.0]);

        assert!(correct_scan(&scan, DetectorSelection::Element(5)).is_err());
    }
}
