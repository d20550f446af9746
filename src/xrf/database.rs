//! # XRF 谱线数据库适配器
//!
//! 包装外部原子物理谱线数据源，按激发能量预计算并缓存可激发的发射谱线。
//!
//! ## 约定
//! - `initialize` 对同一激发能量（按 1 eV 量化）幂等，重复调用命中缓存
//! - 查询未初始化的激发能量返回 `DatabaseNotInitialized`
//! - 间距小于探测器分辨率的子线合并为一条谱线（按速率加权能量）
//! - 每条谱线附带当前激发能量下的激发效率，查询按预期强度排序
//! - 初始化通过 `&mut self` 完成，之后只读，可跨线程共享
//!
//! ## 依赖关系
//! - 被 `xrf/identification.rs`, `xrf/mapping.rs`, `commands/` 使用
//! - 默认数据源为 `xrf/tables.rs`，也可由 `parsers/line_table.rs` 提供

use crate::error::{Result, XrfError};
use crate::models::{EmissionLine, LineFamily, LineMatch, RawLine, Shell};
use crate::xrf::{physics, tables};

use std::cmp::Ordering;
use std::collections::HashMap;

/// 默认探测器能量分辨率 (eV)
pub const DEFAULT_RESOLUTION_EV: f64 = 120.0;

/// 谱线数据源接口
///
/// 物理常数只通过此接口进入系统。
pub trait LineSource: Send + Sync {
    /// 数据源名称
    fn name(&self) -> &str;

    /// 元素的全部原始子线
    fn raw_lines(&self, element: &str) -> Vec<RawLine>;

    /// 谱线族对应的吸收边能量 (keV)
    fn edge_energy(&self, element: &str, family: LineFamily) -> Option<f64>;

    /// 数据源中可用的元素
    fn elements(&self) -> Vec<String>;

    /// 壳层荧光产额，默认按内置表中的原子序数估算，未知元素为 1
    fn fluorescence_yield(&self, element: &str, shell: Shell) -> f64 {
        tables::get_element(element)
            .map(|data| physics::fluorescence_yield(data.z, shell))
            .unwrap_or(1.0)
    }
}

/// 初始化摘要
#[derive(Debug, Clone)]
pub struct InitSummary {
    /// 激发能量 (keV)
    pub excitation_kev: f64,
    /// 是否命中缓存
    pub cached: bool,
    /// 每个元素的可激发谱线数
    pub per_element: Vec<(String, usize)>,
}

impl InitSummary {
    pub fn total_lines(&self) -> usize {
        self.per_element.iter().map(|(_, n)| n).sum()
    }
}

/// 谱线数据库
pub struct LineDatabase {
    source: Box<dyn LineSource>,
    elements: Vec<String>,
    resolution_kev: f64,
    cache: HashMap<u64, Vec<EmissionLine>>,
}

impl LineDatabase {
    /// 使用默认工作元素集和 120 eV 分辨率创建
    pub fn new(source: Box<dyn LineSource>) -> Self {
        Self {
            source,
            elements: tables::default_elements(),
            resolution_kev: DEFAULT_RESOLUTION_EV / 1000.0,
            cache: HashMap::new(),
        }
    }

    /// 使用内置谱线表创建
    pub fn builtin() -> Self {
        Self::new(Box::new(tables::BuiltinLineTable))
    }

    /// 设置关注的元素集
    pub fn with_elements(mut self, elements: Vec<String>) -> Self {
        self.elements = elements;
        self.cache.clear();
        self
    }

    /// 设置探测器分辨率 (eV)
    pub fn with_resolution_ev(mut self, resolution_ev: f64) -> Self {
        self.resolution_kev = resolution_ev.max(0.0) / 1000.0;
        self.cache.clear();
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// 为给定激发能量构建并缓存谱线
    pub fn initialize(&mut self, excitation_kev: f64) -> Result<InitSummary> {
        if !excitation_kev.is_finite() || excitation_kev <= 0.0 {
            return Err(XrfError::InvalidArgument(format!(
                "excitation energy must be positive, got {} keV",
                excitation_kev
            )));
        }

        let key = energy_key(excitation_kev);
        let cached = self.cache.contains_key(&key);

        if !cached {
            let mut lines = Vec::new();
            for element in &self.elements {
                let raw = self.source.raw_lines(element);
                let combined = combine_lines(element, &raw, self.resolution_kev, |family| {
                    self.source.edge_energy(element, family)
                });
                lines.extend(
                    combined
                        .into_iter()
                        .filter(|line| line.edge_kev < excitation_kev)
                        .map(|mut line| {
                            let omega = self.source.fluorescence_yield(element, line.family.shell());
                            line.excitation_efficiency =
                                physics::excitation_efficiency(line.edge_kev, excitation_kev, omega);
                            line
                        }),
                );
            }
            self.cache.insert(key, lines);
        }

        let lines = &self.cache[&key];
        let per_element = self
            .elements
            .iter()
            .map(|e| {
                let count = lines.iter().filter(|l| &l.element == e).count();
                (e.clone(), count)
            })
            .collect();

        Ok(InitSummary {
            excitation_kev,
            cached,
            per_element,
        })
    }

    pub fn is_initialized(&self, excitation_kev: f64) -> bool {
        self.cache.contains_key(&energy_key(excitation_kev))
    }

    /// 获取某激发能量下的全部可激发谱线
    pub fn lines(&self, excitation_kev: f64) -> Result<&[EmissionLine]> {
        self.cache
            .get(&energy_key(excitation_kev))
            .map(|v| v.as_slice())
            .ok_or(XrfError::DatabaseNotInitialized {
                energy_kev: excitation_kev,
            })
    }

    /// 查找容差内的谱线
    ///
    /// 排序：预期强度（相对强度 × 激发效率）降序，残差升序，再按元素与子线名。
    pub fn lookup(
        &self,
        excitation_kev: f64,
        energy_kev: f64,
        tolerance_kev: f64,
    ) -> Result<Vec<LineMatch>> {
        let lines = self.lines(excitation_kev)?;

        let mut matches: Vec<LineMatch> = lines
            .iter()
            .filter_map(|line| {
                let residual = (line.energy_kev - energy_kev).abs();
                (residual <= tolerance_kev).then(|| LineMatch {
                    line: line.clone(),
                    residual_kev: residual,
                })
            })
            .collect();

        matches.sort_by(compare_matches);
        Ok(matches)
    }

    /// 按元素与谱线族查找最强的一条谱线
    pub fn find_line(
        &self,
        excitation_kev: f64,
        element: &str,
        family: LineFamily,
    ) -> Result<&EmissionLine> {
        self.lines(excitation_kev)?
            .iter()
            .filter(|l| l.element.eq_ignore_ascii_case(element) && l.family == family)
            .max_by(|a, b| {
                a.relative_intensity
                    .partial_cmp(&b.relative_intensity)
                    .unwrap_or(Ordering::Equal)
            })
            .ok_or_else(|| XrfError::UnknownLine(format!("{} {}", element, family)))
    }
}

/// 匹配排序规则
pub fn compare_matches(a: &LineMatch, b: &LineMatch) -> Ordering {
    b.line
        .expected_intensity()
        .partial_cmp(&a.line.expected_intensity())
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.residual_kev
                .partial_cmp(&b.residual_kev)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.line.element.cmp(&b.line.element))
        .then_with(|| a.line.sub_line.cmp(&b.line.sub_line))
}

/// 激发能量缓存键（1 eV 量化）
fn energy_key(excitation_kev: f64) -> u64 {
    (excitation_kev * 1000.0).round().max(0.0) as u64
}

/// 按探测器分辨率合并子线
///
/// 相邻子线（按能量排序）与组内最后一条的间距不超过分辨率时归为一组。
/// 组的能量按速率加权，速率求和，谱线族取组内最强子线的族。
/// 相对强度为组速率除以同壳层所有组的速率和。
pub fn combine_lines<F>(
    element: &str,
    raw: &[RawLine],
    resolution_kev: f64,
    edge_of: F,
) -> Vec<EmissionLine>
where
    F: Fn(LineFamily) -> Option<f64>,
{
    let mut valid: Vec<&RawLine> = raw
        .iter()
        .filter(|l| l.family().is_some() && l.energy_kev > 0.0 && l.rate > 0.0)
        .collect();
    valid.sort_by(|a, b| {
        a.energy_kev
            .partial_cmp(&b.energy_kev)
            .unwrap_or(Ordering::Equal)
    });

    let mut groups: Vec<Vec<&RawLine>> = Vec::new();
    for line in valid {
        match groups.last_mut() {
            Some(group)
                if group.last().map_or(false, |last| {
                    (line.energy_kev - last.energy_kev).abs() <= resolution_kev
                        && last.family().map(|f| f.shell()) == line.family().map(|f| f.shell())
                }) =>
            {
                group.push(line)
            }
            _ => groups.push(vec![line]),
        }
    }

    // (family, label, energy, rate)
    let mut merged: Vec<(LineFamily, String, f64, f64)> = Vec::new();
    for mut group in groups {
        group.sort_by(|a, b| b.rate.partial_cmp(&a.rate).unwrap_or(Ordering::Equal));
        let total_rate: f64 = group.iter().map(|l| l.rate).sum();
        let energy = group.iter().map(|l| l.energy_kev * l.rate).sum::<f64>() / total_rate;
        let family = match group[0].family() {
            Some(f) => f,
            None => continue,
        };
        let label = group
            .iter()
            .map(|l| l.label.as_str())
            .collect::<Vec<_>>()
            .join("+");
        merged.push((family, label, energy, total_rate));
    }

    let mut shell_totals: HashMap<Shell, f64> = HashMap::new();
    for (family, _, _, rate) in &merged {
        *shell_totals.entry(family.shell()).or_insert(0.0) += rate;
    }

    merged
        .into_iter()
        .filter_map(|(family, sub_line, energy_kev, rate)| {
            let edge_kev = edge_of(family)?;
            let total = shell_totals.get(&family.shell()).copied().unwrap_or(rate);
            Some(EmissionLine {
                element: element.to_string(),
                family,
                sub_line,
                energy_kev,
                relative_intensity: rate / total,
                edge_kev,
                excitation_efficiency: 1.0,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrf::synthetic::FakeLineSource;

    #[test]
    fn test_combine_merges_within_resolution() {
        let raw = vec![
            RawLine::new("Ka1", 6.4038, 1.0),
            RawLine::new("Ka2", 6.3908, 0.5),
            RawLine::new("Kb1", 7.0580, 0.18),
        ];
        let lines = combine_lines("Fe", &raw, 0.120, |_| Some(7.112));
        assert_eq!(lines.len(), 2);

        let ka = &lines[0];
        assert_eq!(ka.family, LineFamily::Ka);
        assert_eq!(ka.sub_line, "Ka1+Ka2");
        let expected = (6.4038 * 1.0 + 6.3908 * 0.5) / 1.5;
        assert!((ka.energy_kev - expected).abs() < 1e-9);
        assert!((ka.relative_intensity - 1.5 / 1.68).abs() < 1e-9);

        let kb = &lines[1];
        assert_eq!(kb.family, LineFamily::Kb);
        assert_eq!(kb.sub_line, "Kb1");
    }

    #[test]
    fn test_uninitialized_energy_fails() {
        let db = LineDatabase::builtin();
        assert!(matches!(
            db.lookup(10.0, 6.4, 0.06),
            Err(XrfError::DatabaseNotInitialized { .. })
        ));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut db = LineDatabase::builtin();
        let first = db.initialize(10.0).unwrap();
        assert!(!first.cached);
        let second = db.initialize(10.0004).unwrap();
        assert!(second.cached);
        assert_eq!(first.total_lines(), second.total_lines());
        assert!(db.is_initialized(10.0));
        assert!(!db.is_initialized(12.0));
    }

    #[test]
    fn test_only_excitable_lines_cached() {
        let mut db = LineDatabase::builtin();
        db.initialize(7.0).unwrap();
        let lines = db.lines(7.0).unwrap();
        // Fe K 吸收边 7.112 keV 高于 7 keV
        assert!(!lines.iter().any(|l| l.element == "Fe"));
        assert!(lines.iter().any(|l| l.element == "Mn" && l.family == LineFamily::Ka));
        assert!(lines.iter().all(|l| l.edge_kev < 7.0));
    }

    #[test]
    fn test_lookup_orders_by_intensity_then_residual() {
        let source = FakeLineSource::new()
            .with_line("Aa", "Ka1", 5.00, 1.0, 6.0)
            .with_line("Aa", "Kb1", 5.50, 0.2, 6.0)
            .with_line("Bb", "Ka1", 5.02, 1.0, 6.0)
            .with_line("Cc", "La1", 5.01, 1.0, 6.0)
            .with_line("Cc", "Lb1", 4.50, 1.0, 6.0);
        let mut db = LineDatabase::new(Box::new(source))
            .with_elements(vec!["Aa".into(), "Bb".into(), "Cc".into()]);
        db.initialize(10.0).unwrap();

        let matches = db.lookup(10.0, 5.005, 0.05).unwrap();
        let names: Vec<String> = matches.iter().map(|m| m.line.element.clone()).collect();
        // 相对强度: Bb Ka 1.0, Aa Ka 1/1.2, Cc La 0.5
        assert_eq!(names, vec!["Bb", "Aa", "Cc"]);
    }

    #[test]
    fn test_efficiency_depends_on_excitation_energy() {
        let mut db = LineDatabase::builtin();
        db.initialize(9.0).unwrap();
        db.initialize(20.0).unwrap();

        let fe_near = db.find_line(9.0, "Fe", LineFamily::Ka).unwrap().excitation_efficiency;
        let fe_far = db.find_line(20.0, "Fe", LineFamily::Ka).unwrap().excitation_efficiency;
        assert!(fe_near > fe_far);
        assert!(fe_near > 0.0 && fe_near <= 1.0);

        // 相对强度只在壳层内归一，与激发能量无关
        let rel_near = db.find_line(9.0, "Fe", LineFamily::Ka).unwrap().relative_intensity;
        let rel_far = db.find_line(20.0, "Fe", LineFamily::Ka).unwrap().relative_intensity;
        assert!((rel_near - rel_far).abs() < 1e-12);
    }

    #[test]
    fn test_line_near_edge_ranks_first() {
        // 两条谱线强度与残差相同，仅吸收边位置不同
        let source = FakeLineSource::new()
            .with_line("Aa", "Ka1", 5.00, 1.0, 3.0)
            .with_line("Zz", "Ka1", 5.00, 1.0, 9.5);
        let mut db = LineDatabase::new(Box::new(source))
            .with_elements(vec!["Aa".into(), "Zz".into()]);
        db.initialize(10.0).unwrap();

        let matches = db.lookup(10.0, 5.0, 0.05).unwrap();
        let names: Vec<&str> = matches.iter().map(|m| m.line.element.as_str()).collect();
        assert_eq!(names, vec!["Zz", "Aa"]);
        assert!(matches[0].line.excitation_efficiency > matches[1].line.excitation_efficiency);
    }

    #[test]
    fn test_find_line() {
        let mut db = LineDatabase::builtin();
        db.initialize(10.0).unwrap();
        let cu = db.find_line(10.0, "cu", LineFamily::Ka).unwrap();
        assert!((cu.energy_kev - 8.041).abs() < 0.01);
        assert!(matches!(
            db.find_line(10.0, "Pb", LineFamily::La),
            Err(XrfError::UnknownLine(_))
        ));
    }
}
