//! # 内置发射谱线表
//!
//! 提供常用元素的特征 X 射线子线能量、相对辐射速率与吸收边能量，
//! 作为 `LineSource` 的默认实现。
//!
//! ## 数据来源
//! X-ray Data Booklet (LBNL), Table 1-2 / 1-3 发射能量与吸收边；
//! 相对速率取典型的族内比值（Ka2/Ka1 ≈ 0.5，Lb1/La1 ≈ 0.55 等），
//! 仅用于同一壳层内的强弱排序。
//!
//! ## 依赖关系
//! - 被 `xrf/database.rs` 通过 `LineSource` 接口调用
//! - 纯静态数据，无外部依赖

use crate::models::{LineFamily, RawLine};
use crate::xrf::database::LineSource;

use std::collections::HashMap;
use std::sync::LazyLock;

/// 仪器默认关注的 K 线元素
pub const K_SHELL_ELEMENTS: &[&str] = &[
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca", "Ti", "V", "Cr", "Mn", "Fe", "Co",
    "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br",
];

/// 仪器默认关注的 L 线元素
pub const L_SHELL_ELEMENTS: &[&str] = &[
    "Br", "Zr", "Mo", "Pd", "Ag", "Cd", "I", "La", "Ce", "Sm", "Eu", "Gd", "Lu", "W", "Ir", "Pt",
    "Au", "Hg", "Pb",
];

/// 仪器默认关注的 M 线元素
pub const M_SHELL_ELEMENTS: &[&str] = &["U"];

/// 默认工作元素集（去重，保持顺序）
pub fn default_elements() -> Vec<String> {
    let mut elements: Vec<String> = Vec::new();
    for symbol in K_SHELL_ELEMENTS
        .iter()
        .chain(L_SHELL_ELEMENTS)
        .chain(M_SHELL_ELEMENTS)
    {
        if !elements.iter().any(|e| e == symbol) {
            elements.push(symbol.to_string());
        }
    }
    elements
}

/// 吸收边能量 (keV)
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsorptionEdges {
    pub k: Option<f64>,
    pub l3: Option<f64>,
    pub m5: Option<f64>,
}

/// 单个元素的谱线数据
#[derive(Debug, Clone)]
pub struct ElementLineData {
    /// 原子序数
    pub z: u32,
    pub edges: AbsorptionEdges,
    /// (子线标签, 能量 keV, 相对速率)
    pub lines: Vec<(&'static str, f64, f64)>,
}

/// K 系子线：Ka1, Ka2, Kb1
fn k_series(ka1: f64, ka2: f64, kb1: f64, kb_rate: f64) -> Vec<(&'static str, f64, f64)> {
    vec![("Ka1", ka1, 1.0), ("Ka2", ka2, 0.5), ("Kb1", kb1, kb_rate)]
}

/// L 系子线：La1, La2, Lb1, Lb2, Lb3
fn l_series(la1: f64, la2: f64, lb1: f64, lb2: f64, lb3: f64) -> Vec<(&'static str, f64, f64)> {
    vec![
        ("La1", la1, 1.0),
        ("La2", la2, 0.11),
        ("Lb1", lb1, 0.55),
        ("Lb2", lb2, 0.2),
        ("Lb3", lb3, 0.07),
    ]
}

fn k_element(z: u32, k_edge: f64, lines: Vec<(&'static str, f64, f64)>) -> ElementLineData {
    ElementLineData {
        z,
        edges: AbsorptionEdges {
            k: Some(k_edge),
            ..Default::default()
        },
        lines,
    }
}

fn l_element(z: u32, l3_edge: f64, lines: Vec<(&'static str, f64, f64)>) -> ElementLineData {
    ElementLineData {
        z,
        edges: AbsorptionEdges {
            l3: Some(l3_edge),
            ..Default::default()
        },
        lines,
    }
}

/// 谱线数据库
pub static LINE_TABLE: LazyLock<HashMap<&'static str, ElementLineData>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // ─────────────────────────────────────────────────────────────
    // K 系
    // ─────────────────────────────────────────────────────────────
    m.insert("Na", k_element(11, 1.0721, k_series(1.0410, 1.0410, 1.0711, 0.015)));
    m.insert("Mg", k_element(12, 1.3050, k_series(1.2536, 1.2536, 1.3022, 0.03)));
    m.insert("Al", k_element(13, 1.5596, k_series(1.4867, 1.4863, 1.5575, 0.045)));
    m.insert("Si", k_element(14, 1.8389, k_series(1.7400, 1.7394, 1.8359, 0.06)));
    m.insert("P", k_element(15, 2.1455, k_series(2.0137, 2.0127, 2.1391, 0.075)));
    m.insert("S", k_element(16, 2.4720, k_series(2.3078, 2.3066, 2.4640, 0.09)));
    m.insert("Cl", k_element(17, 2.8224, k_series(2.6224, 2.6208, 2.8156, 0.105)));
    m.insert("Ar", k_element(18, 3.2060, k_series(2.9577, 2.9556, 3.1905, 0.12)));
    m.insert("K", k_element(19, 3.6074, k_series(3.3138, 3.3111, 3.5896, 0.135)));
    m.insert("Ca", k_element(20, 4.0381, k_series(3.6917, 3.6881, 4.0127, 0.15)));
    m.insert("Ti", k_element(22, 4.9664, k_series(4.5109, 4.5049, 4.9318, 0.165)));
    m.insert("V", k_element(23, 5.4651, k_series(4.9522, 4.9446, 5.4273, 0.17)));
    m.insert("Cr", k_element(24, 5.9892, k_series(5.4147, 5.4055, 5.9467, 0.18)));
    m.insert("Mn", k_element(25, 6.5390, k_series(5.8988, 5.8877, 6.4905, 0.18)));
    m.insert("Fe", k_element(26, 7.1120, k_series(6.4038, 6.3908, 7.0580, 0.18)));
    m.insert("Co", k_element(27, 7.7089, k_series(6.9303, 6.9153, 7.6494, 0.18)));
    m.insert("Ni", k_element(28, 8.3328, k_series(7.4782, 7.4609, 8.2647, 0.18)));
    m.insert("Cu", k_element(29, 8.9789, k_series(8.0478, 8.0278, 8.9053, 0.18)));
    m.insert("Zn", k_element(30, 9.6586, k_series(8.6389, 8.6158, 9.5720, 0.19)));
    m.insert("Ga", k_element(31, 10.3671, k_series(9.2517, 9.2248, 10.2642, 0.2)));
    m.insert("Ge", k_element(32, 11.1031, k_series(9.8864, 9.8553, 10.9821, 0.21)));
    m.insert("As", k_element(33, 11.8667, k_series(10.5437, 10.5080, 11.7262, 0.22)));
    m.insert("Se", k_element(34, 12.6578, k_series(11.2224, 11.1814, 12.4959, 0.23)));

    // 溴 (Br) 同时给出 K 系与 L 系
    let mut br_lines = k_series(11.9242, 11.8776, 13.2914, 0.24);
    br_lines.extend([("La1", 1.4804, 1.0), ("La2", 1.4804, 0.11), ("Lb1", 1.5259, 0.55)]);
    m.insert(
        "Br",
        ElementLineData {
            z: 35,
            edges: AbsorptionEdges {
                k: Some(13.4737),
                l3: Some(1.5499),
                m5: None,
            },
            lines: br_lines,
        },
    );

    // ─────────────────────────────────────────────────────────────
    // L 系
    // ─────────────────────────────────────────────────────────────
    m.insert("Zr", l_element(40, 2.2223, l_series(2.0424, 2.0399, 2.1244, 2.2194, 2.2010)));
    m.insert("Mo", l_element(42, 2.5202, l_series(2.2932, 2.2898, 2.3948, 2.5184, 2.4732)));
    m.insert("Pd", l_element(46, 3.1733, l_series(2.8386, 2.8330, 2.9903, 3.1720, 3.0728)));
    m.insert("Ag", l_element(47, 3.3511, l_series(2.9843, 2.9780, 3.1509, 3.3478, 3.2344)));
    m.insert("Cd", l_element(48, 3.5375, l_series(3.1337, 3.1269, 3.3166, 3.5282, 3.4019)));
    m.insert("I", l_element(53, 4.5571, l_series(3.9377, 3.9260, 4.2208, 4.5075, 4.3134)));
    m.insert("La", l_element(57, 5.4827, l_series(4.6510, 4.6340, 5.0421, 5.3835, 5.1429)));
    m.insert("Ce", l_element(58, 5.7234, l_series(4.8402, 4.8230, 5.2622, 5.6134, 5.3640)));
    m.insert("Sm", l_element(62, 6.7162, l_series(5.6361, 5.6090, 6.2051, 6.5867, 6.3168)));
    m.insert("Eu", l_element(63, 6.9769, l_series(5.8457, 5.8166, 6.4564, 6.8432, 6.5713)));
    m.insert("Gd", l_element(64, 7.2428, l_series(6.0572, 6.0250, 6.7132, 7.1028, 6.8311)));
    m.insert("Lu", l_element(71, 9.2441, l_series(7.6555, 7.6049, 8.7090, 9.0489, 8.8470)));
    m.insert("W", l_element(74, 10.2068, l_series(8.3976, 8.3352, 9.6724, 9.9615, 9.8188)));
    m.insert("Ir", l_element(77, 11.2152, l_series(9.1751, 9.0995, 10.7083, 10.9203, 10.8678)));
    m.insert("Pt", l_element(78, 11.5637, l_series(9.4423, 9.3618, 11.0707, 11.2505, 11.2349)));
    m.insert("Au", l_element(79, 11.9187, l_series(9.7133, 9.6280, 11.4423, 11.5847, 11.6103)));
    m.insert("Hg", l_element(80, 12.2839, l_series(9.9888, 9.8976, 11.8226, 11.9241, 11.9922)));
    m.insert("Pb", l_element(82, 13.0352, l_series(10.5515, 10.4495, 12.6137, 12.6226, 12.7938)));

    // ─────────────────────────────────────────────────────────────
    // M 系
    // ─────────────────────────────────────────────────────────────
    m.insert(
        "U",
        ElementLineData {
            z: 92,
            edges: AbsorptionEdges {
                m5: Some(3.5517),
                ..Default::default()
            },
            lines: vec![("Ma1", 3.1708, 1.0), ("Ma2", 3.1610, 0.1), ("Mb", 3.3360, 0.6)],
        },
    );

    m
});

/// 获取元素的谱线数据
pub fn get_element(symbol: &str) -> Option<&'static ElementLineData> {
    LINE_TABLE.get(symbol)
}

/// 内置谱线表数据源
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLineTable;

impl LineSource for BuiltinLineTable {
    fn name(&self) -> &str {
        "builtin"
    }

    fn raw_lines(&self, element: &str) -> Vec<RawLine> {
        get_element(element)
            .map(|data| {
                data.lines
                    .iter()
                    .map(|(label, energy, rate)| RawLine::new(*label, *energy, *rate))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn edge_energy(&self, element: &str, family: LineFamily) -> Option<f64> {
        let edges = get_element(element)?.edges;
        match family {
            LineFamily::Ka | LineFamily::Kb => edges.k,
            LineFamily::La | LineFamily::Lb => edges.l3,
            LineFamily::Ma | LineFamily::Mb => edges.m5,
        }
    }

    fn elements(&self) -> Vec<String> {
        let mut symbols: Vec<(&'static str, u32)> =
            LINE_TABLE.iter().map(|(s, d)| (*s, d.z)).collect();
        symbols.sort_by_key(|(_, z)| *z);
        symbols.into_iter().map(|(s, _)| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_elements_are_tabulated() {
        for symbol in default_elements() {
            assert!(
                get_element(&symbol).is_some(),
                "{} is in the working set but not tabulated",
                symbol
            );
        }
    }

    #[test]
    fn test_lines_below_their_edges() {
        let table = BuiltinLineTable;
        for symbol in table.elements() {
            for line in table.raw_lines(&symbol) {
                let family = line.family().unwrap();
                let edge = table.edge_energy(&symbol, family).unwrap();
                assert!(
                    line.energy_kev < edge,
                    "{} {} at {} keV is above its edge {} keV",
                    symbol,
                    line.label,
                    line.energy_kev,
                    edge
                );
            }
        }
    }

    #[test]
    fn test_fe_edge() {
        let edge = BuiltinLineTable.edge_energy("Fe", LineFamily::Ka).unwrap();
        assert!((edge - 7.112).abs() < 1e-6);
        assert!(BuiltinLineTable.edge_energy("Fe", LineFamily::La).is_none());
    }
}
