//! # 谱峰数据模型
//!
//! 定义候选峰、散射标记与识别结果。
//!
//! ## 约定
//! - 每个候选峰恰好产生一个识别结果：谱线、散射或未识别
//!
//! ## 依赖关系
//! - 被 `xrf/detection.rs`, `xrf/identification.rs` 产生
//! - 被 `xrf/plot.rs`, `xrf/export.rs`, `commands/` 使用

use crate::models::EmissionLine;

/// 散射峰类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatterKind {
    /// 弹性 (Rayleigh) 散射
    Elastic,
    /// 非弹性 (Compton) 散射
    Compton,
}

impl std::fmt::Display for ScatterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScatterKind::Elastic => write!(f, "elastic"),
            ScatterKind::Compton => write!(f, "compton"),
        }
    }
}

/// 候选峰
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePeak {
    /// 峰顶通道
    pub channel: usize,
    /// 峰顶能量 (keV)
    pub energy_kev: f64,
    /// 峰高（扣背景后）
    pub height: f64,
    /// 显著度
    pub prominence: f64,
    /// 左基线通道
    pub left_base: usize,
    /// 右基线通道
    pub right_base: usize,
    /// 半显著度处宽度（通道）
    pub width: f64,
    /// 散射标记
    pub scatter: Option<ScatterKind>,
}

impl CandidatePeak {
    pub fn is_scatter(&self) -> bool {
        self.scatter.is_some()
    }
}

/// 未识别原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnidentifiedReason {
    /// 容差内没有可激发的谱线
    NoLineInTolerance,
    /// 容差内的谱线都已被更接近的峰占用
    Ambiguous,
}

impl std::fmt::Display for UnidentifiedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnidentifiedReason::NoLineInTolerance => write!(f, "no line in tolerance"),
            UnidentifiedReason::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

/// 数据库查询匹配
#[derive(Debug, Clone, PartialEq)]
pub struct LineMatch {
    pub line: EmissionLine,
    /// |谱线能量 - 峰能量| (keV)
    pub residual_kev: f64,
}

/// 识别结果
#[derive(Debug, Clone, PartialEq)]
pub enum Identification {
    /// 匹配到唯一谱线
    Line {
        line: EmissionLine,
        residual_kev: f64,
        confidence: f64,
    },
    /// 散射峰，不参与谱线匹配
    Scatter(ScatterKind),
    /// 未识别
    Unidentified(UnidentifiedReason),
}

/// 识别后的谱峰
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifiedPeak {
    pub peak: CandidatePeak,
    pub identification: Identification,
    /// 容差内的候选谱线数
    pub candidates_in_tolerance: usize,
}

impl IdentifiedPeak {
    /// 匹配到的谱线
    pub fn line(&self) -> Option<&EmissionLine> {
        match &self.identification {
            Identification::Line { line, .. } => Some(line),
            _ => None,
        }
    }

    pub fn is_identified(&self) -> bool {
        self.line().is_some()
    }

    pub fn is_scatter(&self) -> bool {
        matches!(self.identification, Identification::Scatter(_))
    }

    /// 显示标签
    pub fn label(&self) -> String {
        match &self.identification {
            Identification::Line { line, .. } => line.name(),
            Identification::Scatter(kind) => format!("{} scatter", kind),
            Identification::Unidentified(reason) => format!("unidentified ({})", reason),
        }
    }
}
