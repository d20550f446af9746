//! # 能谱平滑
//!
//! 滑动平均与二次 Savitzky–Golay 平滑。
//!
//! ## 约定
//! - 窗口强制为奇数，且小于能谱长度的十分之一；不足 3 时不做平滑
//! - 边界处使用截断窗口的滑动平均
//!
//! ## 依赖关系
//! - 被 `xrf/detection.rs`, `xrf/background.rs` 使用

/// 平滑方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothingMethod {
    /// 滑动平均
    #[default]
    MovingAverage,
    /// 二次 Savitzky–Golay
    SavitzkyGolay,
}

impl std::fmt::Display for SmoothingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmoothingMethod::MovingAverage => write!(f, "moving-average"),
            SmoothingMethod::SavitzkyGolay => write!(f, "savitzky-golay"),
        }
    }
}

/// 将窗口约束为可用的奇数；返回 None 表示不平滑
pub fn effective_window(window: usize, len: usize) -> Option<usize> {
    let mut w = if window % 2 == 0 {
        window.saturating_sub(1)
    } else {
        window
    };
    // 严格小于 len / 10
    let limit = len / 10;
    while w >= limit && w >= 3 {
        w -= 2;
    }
    (w >= 3 && w < limit).then_some(w)
}

/// 按方法平滑；窗口无效时返回原数据
pub fn smooth(data: &[f64], window: usize, method: SmoothingMethod) -> Vec<f64> {
    match effective_window(window, data.len()) {
        Some(w) => match method {
            SmoothingMethod::MovingAverage => moving_average(data, w),
            SmoothingMethod::SavitzkyGolay => savitzky_golay(data, w),
        },
        None => data.to_vec(),
    }
}

/// 居中滑动平均，边界截断
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    let n = data.len();
    if window <= 1 || n == 0 {
        return data.to_vec();
    }
    let half = window / 2;

    // 前缀和
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for v in data {
        prefix.push(prefix[prefix.len() - 1] + v);
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect()
}

/// 二次 Savitzky–Golay 卷积系数（平滑，零阶导数）
///
/// c_j = (3(3m² + 3m − 1) − 15 j²) / ((2m + 1)(4m² + 4m − 3))，j ∈ [−m, m]
pub fn savitzky_golay_coefficients(window: usize) -> Vec<f64> {
    let m = (window / 2) as f64;
    let norm = (2.0 * m + 1.0) * (4.0 * m * m + 4.0 * m - 3.0);
    (0..window)
        .map(|k| {
            let j = k as f64 - m;
            (3.0 * (3.0 * m * m + 3.0 * m - 1.0) - 15.0 * j * j) / norm
        })
        .collect()
}

/// 二次 Savitzky–Golay 平滑，边界使用截断滑动平均
pub fn savitzky_golay(data: &[f64], window: usize) -> Vec<f64> {
    let n = data.len();
    if window < 3 || window > n {
        return data.to_vec();
    }
    let half = window / 2;
    let coeffs = savitzky_golay_coefficients(window);
    let mut out = moving_average(data, window);

    for i in half..n - half {
        out[i] = coeffs
            .iter()
            .zip(&data[i - half..=i + half])
            .map(|(c, y)| c * y)
            .sum();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_window() {
        assert_eq!(effective_window(5, 1000), Some(5));
        assert_eq!(effective_window(6, 1000), Some(5));
        // 过大的窗口被收缩到 len/10 以下
        assert_eq!(effective_window(31, 100), Some(9));
        assert_eq!(effective_window(5, 30), None);
        assert_eq!(effective_window(1, 1000), None);
    }

    #[test]
    fn test_sg_coefficients_sum_to_one() {
        for w in [5usize, 7, 11, 21] {
            let sum: f64 = savitzky_golay_coefficients(w).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "window {}", w);
        }
        // 5 点: (-3, 12, 17, 12, -3) / 35
        let c = savitzky_golay_coefficients(5);
        assert!((c[2] - 17.0 / 35.0).abs() < 1e-12);
        assert!((c[0] + 3.0 / 35.0).abs() < 1e-12);
    }

    #[test]
    fn test_smoothing_preserves_quadratic() {
        let data: Vec<f64> = (0..200).map(|i| 0.01 * (i as f64).powi(2) + 3.0).collect();
        let sg = smooth(&data, 7, SmoothingMethod::SavitzkyGolay);
        for i in 3..197 {
            assert!((sg[i] - data[i]).abs() < 1e-8);
        }

        let flat = vec![4.0; 100];
        let ma = smooth(&flat, 5, SmoothingMethod::MovingAverage);
        assert!(ma.iter().all(|v| (v - 4.0).abs() < 1e-12));
    }
}
