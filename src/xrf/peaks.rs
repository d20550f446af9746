//! # 局部极大值搜索
//!
//! 在扣除背景后的一维能谱上寻找候选峰，计算显著度与半显著度宽度，
//! 并按高度、显著度与峰间距过滤。
//!
//! ## 算法
//! 1. 严格局部极大值；平台取中点
//! 2. 高度过滤
//! 3. 显著度：峰高减去左右谷底中较高者（谷底搜索到更高点或边界为止）
//! 4. 显著度过滤
//! 5. 间距过滤：窗口内保留较高者
//!
//! ## 依赖关系
//! - 被 `xrf/detection.rs` 使用

use std::cmp::Ordering;

/// 局部峰
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPeak {
    pub index: usize,
    pub height: f64,
    pub prominence: f64,
    pub left_base: usize,
    pub right_base: usize,
    /// 半显著度处宽度（通道，可为小数）
    pub width: f64,
}

/// 过滤阈值
#[derive(Debug, Clone)]
pub struct PeakFilter {
    pub min_height: f64,
    pub min_prominence: f64,
    /// 最小峰间距（通道）
    pub distance: usize,
}

impl Default for PeakFilter {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            min_prominence: 0.0,
            distance: 1,
        }
    }
}

/// 搜索并过滤局部峰，结果按通道升序
pub fn find_peaks(data: &[f64], filter: &PeakFilter) -> Vec<LocalPeak> {
    if data.len() < 3 {
        return Vec::new();
    }

    let mut candidates = local_maxima(data);
    candidates.retain(|&idx| data[idx] >= filter.min_height);

    let mut peaks: Vec<LocalPeak> = candidates
        .iter()
        .map(|&idx| peak_properties(data, idx))
        .filter(|p| p.prominence >= filter.min_prominence && p.prominence > 0.0)
        .collect();

    if filter.distance > 1 {
        peaks = filter_by_distance(peaks, filter.distance);
    }

    peaks
}

/// 严格局部极大值与平台中点
fn local_maxima(data: &[f64]) -> Vec<usize> {
    let n = data.len();
    let mut maxima = Vec::new();

    let mut i = 1;
    while i < n - 1 {
        if data[i] > data[i - 1] {
            let start = i;
            while i + 1 < n && data[i + 1] == data[i] {
                i += 1;
            }
            if i + 1 < n && data[i + 1] < data[i] {
                maxima.push((start + i) / 2);
            }
        }
        i += 1;
    }

    maxima
}

fn peak_properties(data: &[f64], idx: usize) -> LocalPeak {
    let height = data[idx];

    let mut left_min = height;
    let mut left_base = idx;
    for i in (0..idx).rev() {
        if data[i] > height {
            break;
        }
        if data[i] < left_min {
            left_min = data[i];
            left_base = i;
        }
    }

    let mut right_min = height;
    let mut right_base = idx;
    for (i, &v) in data.iter().enumerate().skip(idx + 1) {
        if v > height {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = i;
        }
    }

    let prominence = height - left_min.max(right_min);
    let half = height - prominence / 2.0;
    let width = crossing(data, idx, half, false) - crossing(data, idx, half, true);

    LocalPeak {
        index: idx,
        height,
        prominence,
        left_base,
        right_base,
        width,
    }
}

/// 线性插值求阈值穿越位置
fn crossing(data: &[f64], idx: usize, threshold: f64, go_left: bool) -> f64 {
    if go_left {
        for i in (1..=idx).rev() {
            if data[i - 1] <= threshold && data[i] > threshold {
                let frac = (threshold - data[i - 1]) / (data[i] - data[i - 1]);
                return (i - 1) as f64 + frac;
            }
        }
        0.0
    } else {
        for i in idx..data.len() - 1 {
            if data[i] > threshold && data[i + 1] <= threshold {
                let frac = (data[i] - threshold) / (data[i] - data[i + 1]);
                return i as f64 + frac;
            }
        }
        (data.len() - 1) as f64
    }
}

/// 按高度降序贪心保留，距离不足的较低峰被剔除
fn filter_by_distance(mut peaks: Vec<LocalPeak>, distance: usize) -> Vec<LocalPeak> {
    peaks.sort_by(|a, b| {
        b.height
            .partial_cmp(&a.height)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });

    let mut kept: Vec<LocalPeak> = Vec::with_capacity(peaks.len());
    for peak in peaks {
        if kept
            .iter()
            .all(|k| k.index.abs_diff(peak.index) >= distance)
        {
            kept.push(peak);
        }
    }

    kept.sort_by_key(|p| p.index);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_plateau() {
        let peaks = find_peaks(&[0.0, 1.0, 3.0, 1.0, 0.0], &PeakFilter::default());
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
        assert!((peaks[0].prominence - 3.0).abs() < 1e-12);

        let plateau = find_peaks(&[0.0, 2.0, 2.0, 2.0, 0.0], &PeakFilter::default());
        assert_eq!(plateau.len(), 1);
        assert_eq!(plateau[0].index, 2);
    }

    #[test]
    fn test_each_filter_rejects_independently() {
        let data = [0.0, 5.0, 4.0, 4.5, 0.0, 1.0, 0.0];

        let by_prominence = find_peaks(
            &data,
            &PeakFilter {
                min_prominence: 2.0,
                ..PeakFilter::default()
            },
        );
        assert_eq!(
            by_prominence.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![1]
        );

        let by_height = find_peaks(
            &data,
            &PeakFilter {
                min_height: 2.0,
                ..PeakFilter::default()
            },
        );
        assert_eq!(
            by_height.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![1, 3]
        );

        let by_distance = find_peaks(
            &data,
            &PeakFilter {
                distance: 3,
                ..PeakFilter::default()
            },
        );
        // 较高的峰 (1) 保留，距离不足 3 的 3 被剔除
        assert_eq!(
            by_distance.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![1, 5]
        );
    }
}
