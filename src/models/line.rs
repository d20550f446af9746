//! # 发射谱线数据模型
//!
//! 定义特征 X 射线谱线族、原始子线与合并后的发射谱线。
//!
//! ## 依赖关系
//! - 被 `xrf/database.rs`, `xrf/tables.rs`, `parsers/line_table.rs` 使用
//! - 被 `models/peak.rs` 引用

use serde::{Deserialize, Serialize};

/// 电子壳层
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Shell {
    K,
    L,
    M,
}

impl std::fmt::Display for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shell::K => write!(f, "K"),
            Shell::L => write!(f, "L"),
            Shell::M => write!(f, "M"),
        }
    }
}

/// 谱线族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineFamily {
    Ka,
    Kb,
    La,
    Lb,
    Ma,
    Mb,
}

impl LineFamily {
    /// 所属壳层
    pub fn shell(&self) -> Shell {
        match self {
            LineFamily::Ka | LineFamily::Kb => Shell::K,
            LineFamily::La | LineFamily::Lb => Shell::L,
            LineFamily::Ma | LineFamily::Mb => Shell::M,
        }
    }

    /// 从子线或族名解析（如 "Ka1" -> Ka, "lb" -> Lb）
    pub fn from_label(label: &str) -> Option<Self> {
        let prefix: String = label.trim().chars().take(2).collect();
        match prefix.to_lowercase().as_str() {
            "ka" => Some(LineFamily::Ka),
            "kb" => Some(LineFamily::Kb),
            "la" => Some(LineFamily::La),
            "lb" => Some(LineFamily::Lb),
            "ma" => Some(LineFamily::Ma),
            "mb" => Some(LineFamily::Mb),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineFamily::Ka => "Ka",
            LineFamily::Kb => "Kb",
            LineFamily::La => "La",
            LineFamily::Lb => "Lb",
            LineFamily::Ma => "Ma",
            LineFamily::Mb => "Mb",
        }
    }
}

impl std::fmt::Display for LineFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 数据源提供的原始子线 (Siegbahn 记号)
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    /// 子线标签，如 "Ka1"
    pub label: String,
    /// 发射能量 (keV)
    pub energy_kev: f64,
    /// 辐射跃迁速率（相对值）
    pub rate: f64,
}

impl RawLine {
    pub fn new(label: impl Into<String>, energy_kev: f64, rate: f64) -> Self {
        Self {
            label: label.into(),
            energy_kev,
            rate,
        }
    }

    pub fn family(&self) -> Option<LineFamily> {
        LineFamily::from_label(&self.label)
    }
}

/// 发射谱线（按探测器分辨率合并后的子线组）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionLine {
    /// 元素符号
    pub element: String,
    /// 谱线族
    pub family: LineFamily,
    /// 子线标签，合并时以 '+' 连接，如 "Ka1+Ka2"
    pub sub_line: String,
    /// 能量 (keV)，合并时按速率加权
    pub energy_kev: f64,
    /// 壳层内相对强度 (0-1)
    pub relative_intensity: f64,
    /// 对应吸收边能量 (keV)
    pub edge_kev: f64,
    /// 当前激发能量下的激发效率 (0-1)
    pub excitation_efficiency: f64,
}

impl EmissionLine {
    /// 显示名，如 "Fe Ka"
    pub fn name(&self) -> String {
        format!("{} {}", self.element, self.family)
    }

    /// 预期强度 = 相对强度 × 激发效率，用于候选谱线排序
    pub fn expected_intensity(&self) -> f64 {
        self.relative_intensity * self.excitation_efficiency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_label() {
        assert_eq!(LineFamily::from_label("Ka1"), Some(LineFamily::Ka));
        assert_eq!(LineFamily::from_label("lb3"), Some(LineFamily::Lb));
        assert_eq!(LineFamily::from_label("Mb"), Some(LineFamily::Mb));
        assert_eq!(LineFamily::from_label("Lg1"), None);
        assert_eq!(LineFamily::Lb.shell(), Shell::L);
    }
}
