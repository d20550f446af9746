//! # 测试用合成数据
//!
//! 高斯峰能谱生成器与可控的谱线数据源。

use crate::models::{LineFamily, RawLine};
use crate::xrf::database::LineSource;

use std::collections::HashMap;

/// 高斯函数值
pub fn gaussian(x: f64, center: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - center).powi(2) / (2.0 * sigma * sigma)).exp()
}

/// 平坦背景上叠加若干高斯峰
///
/// `peaks` 为 (中心能量 keV, 幅度)，峰宽固定为 `sigma_channels`。
pub fn spectrum_with_peaks(
    n_channels: usize,
    ev_per_channel: f64,
    background: f64,
    sigma_channels: f64,
    peaks: &[(f64, f64)],
) -> Vec<f64> {
    (0..n_channels)
        .map(|ch| {
            let x = ch as f64;
            background
                + peaks
                    .iter()
                    .map(|(kev, amp)| {
                        gaussian(x, kev * 1000.0 / ev_per_channel, sigma_channels, *amp)
                    })
                    .sum::<f64>()
        })
        .collect()
}

/// 内存中的谱线数据源
#[derive(Debug, Default)]
pub struct FakeLineSource {
    /// 元素 → [(子线, 能量, 速率, 吸收边)]
    lines: HashMap<String, Vec<(String, f64, f64, f64)>>,
}

impl FakeLineSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, element: &str, label: &str, energy: f64, rate: f64, edge: f64) -> Self {
        self.lines
            .entry(element.to_string())
            .or_default()
            .push((label.to_string(), energy, rate, edge));
        self
    }
}

impl LineSource for FakeLineSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn raw_lines(&self, element: &str) -> Vec<RawLine> {
        self.lines
            .get(element)
            .map(|v| {
                v.iter()
                    .map(|(label, e, r, _)| RawLine::new(label.clone(), *e, *r))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn edge_energy(&self, element: &str, family: LineFamily) -> Option<f64> {
        self.lines.get(element)?.iter().find_map(|(label, _, _, edge)| {
            (LineFamily::from_label(label) == Some(family)).then_some(*edge)
        })
    }

    fn elements(&self) -> Vec<String> {
        let mut v: Vec<String> = self.lines.keys().cloned().collect();
        v.sort();
        v
    }
}
