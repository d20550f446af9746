//! # 背景估计与扣除
//!
//! ## 方法
//! - `Polynomial`: 迭代多项式拟合 (modpoly)，每轮将高于拟合的点裁剪到拟合值
//! - `RollingMinimum`: 平坦最小值滤波后再做半径一半的滑动平均
//!
//! ## 约定
//! - 扣除结果不小于 0
//!
//! ## 依赖关系
//! - 被 `xrf/detection.rs` 使用
//! - 使用 `xrf/smoothing.rs` 的滑动平均

use crate::error::{Result, XrfError};
use crate::xrf::smoothing::moving_average;

/// 默认多项式阶数
pub const DEFAULT_POLY_ORDER: usize = 3;

/// 默认滚动最小值半径（通道）
pub const DEFAULT_ROLLING_RADIUS: usize = 50;

/// modpoly 最大迭代次数
const MAX_ITERATIONS: usize = 100;

/// modpoly 收敛阈值（相对变化）
const CONVERGENCE_TOL: f64 = 1e-3;

/// 背景估计方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundMethod {
    None,
    Polynomial { order: usize },
    RollingMinimum { radius: usize },
}

impl Default for BackgroundMethod {
    fn default() -> Self {
        BackgroundMethod::RollingMinimum {
            radius: DEFAULT_ROLLING_RADIUS,
        }
    }
}

impl BackgroundMethod {
    pub fn validate(&self) -> Result<()> {
        match self {
            BackgroundMethod::RollingMinimum { radius } if *radius < 2 => {
                Err(XrfError::InvalidArgument(format!(
                    "rolling minimum radius must be at least 2 channels, got {}",
                    radius
                )))
            }
            BackgroundMethod::Polynomial { order } if *order > 10 => {
                Err(XrfError::InvalidArgument(format!(
                    "polynomial order {} is too high (max 10)",
                    order
                )))
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for BackgroundMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackgroundMethod::None => write!(f, "none"),
            BackgroundMethod::Polynomial { order } => write!(f, "polynomial (order {})", order),
            BackgroundMethod::RollingMinimum { radius } => {
                write!(f, "rolling minimum (radius {})", radius)
            }
        }
    }
}

/// 估计背景
pub fn estimate(data: &[f64], method: BackgroundMethod) -> Vec<f64> {
    match method {
        BackgroundMethod::None => vec![0.0; data.len()],
        BackgroundMethod::Polynomial { order } => polynomial_background(data, order),
        BackgroundMethod::RollingMinimum { radius } => rolling_minimum(data, radius),
    }
}

/// 扣除背景，结果下限为 0
pub fn subtract(data: &[f64], background: &[f64]) -> Vec<f64> {
    data.iter()
        .zip(background)
        .map(|(y, b)| (y - b).max(0.0))
        .collect()
}

/// 迭代多项式背景
pub fn polynomial_background(data: &[f64], order: usize) -> Vec<f64> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }
    let order = order.min(n - 1);

    // x 缩放到 [-1, 1] 以改善法方程条件数
    let x: Vec<f64> = if n == 1 {
        vec![0.0]
    } else {
        (0..n)
            .map(|i| 2.0 * i as f64 / (n - 1) as f64 - 1.0)
            .collect()
    };

    let mut work = data.to_vec();
    let mut fit = evaluate(&polyfit(&x, &work, order), &x);

    for _ in 0..MAX_ITERATIONS {
        let clipped: Vec<f64> = work.iter().zip(&fit).map(|(y, f)| y.min(*f)).collect();

        let change: f64 = clipped
            .iter()
            .zip(&work)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        let norm: f64 = work.iter().map(|v| v * v).sum::<f64>().sqrt();

        work = clipped;
        fit = evaluate(&polyfit(&x, &work, order), &x);

        if norm == 0.0 || change / norm < CONVERGENCE_TOL {
            break;
        }
    }

    fit
}

/// 最小二乘多项式拟合，返回升幂系数
fn polyfit(x: &[f64], y: &[f64], order: usize) -> Vec<f64> {
    let m = order + 1;

    // 法方程 A^T A c = A^T y
    let mut powers = vec![0.0; 2 * order + 1];
    let mut rhs = vec![0.0; m];
    for (xi, yi) in x.iter().zip(y) {
        let mut p = 1.0;
        for (k, acc) in powers.iter_mut().enumerate() {
            *acc += p;
            if k < m {
                rhs[k] += p * yi;
            }
            p *= xi;
        }
    }

    let mut matrix: Vec<Vec<f64>> = (0..m)
        .map(|r| (0..m).map(|c| powers[r + c]).collect())
        .collect();

    solve_linear(&mut matrix, &mut rhs).unwrap_or_else(|| vec![0.0; m])
}

/// 部分选主元高斯消元；奇异时返回 None
fn solve_linear(a: &mut [Vec<f64>], b: &mut [f64]) -> Option<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }
    Some(solution)
}

fn evaluate(coeffs: &[f64], x: &[f64]) -> Vec<f64> {
    x.iter()
        .map(|xi| coeffs.iter().rev().fold(0.0, |acc, c| acc * xi + c))
        .collect()
}

/// 滚动最小值背景
pub fn rolling_minimum(data: &[f64], radius: usize) -> Vec<f64> {
    let n = data.len();
    if n == 0 || radius < 2 {
        return data.to_vec();
    }

    let half = radius / 2;
    let minima: Vec<f64> = (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            data[lo..hi].iter().copied().fold(f64::INFINITY, f64::min)
        })
        .collect();

    moving_average(&minima, (radius / 2).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrf::synthetic::gaussian;

    #[test]
    fn test_polynomial_recovers_baseline_under_peak() {
        let n = 500;
        let baseline: Vec<f64> = (0..n).map(|i| 50.0 + 0.05 * i as f64).collect();
        let data: Vec<f64> = baseline
            .iter()
            .enumerate()
            .map(|(i, b)| b + gaussian(i as f64, 250.0, 6.0, 400.0))
            .collect();

        let bkg = polynomial_background(&data, DEFAULT_POLY_ORDER);
        // 峰顶处背景应远低于峰高
        assert!(bkg[250] < baseline[250] + 25.0);
        assert!((bkg[20] - baseline[20]).abs() < 25.0);

        let sub = subtract(&data, &bkg);
        assert!(sub.iter().all(|v| *v >= 0.0));
        assert!(sub[250] > 350.0);
    }

    #[test]
    fn test_rolling_minimum_flat_background() {
        let data: Vec<f64> = (0..400)
            .map(|i| 20.0 + gaussian(i as f64, 200.0, 5.0, 300.0))
            .collect();
        let bkg = rolling_minimum(&data, 50);
        assert!((bkg[200] - 20.0).abs() < 1.0);
        assert!((bkg[50] - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_none_and_validation() {
        assert_eq!(estimate(&[1.0, 2.0], BackgroundMethod::None), vec![0.0, 0.0]);
        assert!(BackgroundMethod::RollingMinimum { radius: 1 }.validate().is_err());
        assert!(BackgroundMethod::default().validate().is_ok());
    }
}
