//! # 外部谱线表解析器
//!
//! 从 CSV 读取发射谱线，作为 `LineSource` 替代内置谱线表。
//!
//! ## 格式说明
//! ```text
//! element,line,energy_kev,rate,edge_kev
//! Fe,Ka1,6.4038,1.0,7.112
//! Fe,Ka2,6.3908,0.5,7.112
//! ```
//! - `edge_kev` 为该子线所属谱线族的吸收边；同一族取首次出现的值
//!
//! ## 依赖关系
//! - 被 `commands/` 通过 `--line-table` 使用
//! - 实现 `xrf/database.rs` 的 `LineSource`

use crate::error::{Result, XrfError};
use crate::models::{LineFamily, RawLine};
use crate::xrf::database::LineSource;

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct LineRecord {
    element: String,
    line: String,
    energy_kev: f64,
    rate: f64,
    edge_kev: f64,
}

/// CSV 谱线表
#[derive(Debug, Clone)]
pub struct CsvLineTable {
    name: String,
    lines: BTreeMap<String, Vec<RawLine>>,
    edges: HashMap<(String, LineFamily), f64>,
}

impl CsvLineTable {
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| XrfError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, name: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut lines: BTreeMap<String, Vec<RawLine>> = BTreeMap::new();
        let mut edges = HashMap::new();

        for record in rdr.deserialize() {
            let r: LineRecord = record?;
            let family = LineFamily::from_label(&r.line).ok_or_else(|| XrfError::ParseError {
                format: "line table".to_string(),
                path: name.to_string(),
                reason: format!("unsupported line label '{}' for {}", r.line, r.element),
            })?;
            if !(r.energy_kev > 0.0 && r.rate >= 0.0 && r.edge_kev > r.energy_kev) {
                return Err(XrfError::ParseError {
                    format: "line table".to_string(),
                    path: name.to_string(),
                    reason: format!(
                        "inconsistent values for {} {}: energy {} keV, rate {}, edge {} keV",
                        r.element, r.line, r.energy_kev, r.rate, r.edge_kev
                    ),
                });
            }

            edges
                .entry((r.element.clone(), family))
                .or_insert(r.edge_kev);
            lines
                .entry(r.element)
                .or_default()
                .push(RawLine::new(r.line, r.energy_kev, r.rate));
        }

        if lines.is_empty() {
            return Err(XrfError::ParseError {
                format: "line table".to_string(),
                path: name.to_string(),
                reason: "no lines defined".to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            lines,
            edges,
        })
    }
}

impl LineSource for CsvLineTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_lines(&self, element: &str) -> Vec<RawLine> {
        self.lines.get(element).cloned().unwrap_or_default()
    }

    fn edge_energy(&self, element: &str, family: LineFamily) -> Option<f64> {
        self.edges.get(&(element.to_string(), family)).copied()
    }

    fn elements(&self) -> Vec<String> {
        self.lines.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrf::database::LineDatabase;

    const TABLE: &str = "\
element,line,energy_kev,rate,edge_kev
Fe,Ka1,6.4038,1.0,7.112
Fe,Ka2,6.3908,0.5,7.112
Fe,Kb1,7.0580,0.18,7.112
Zn,Ka1,8.6389,1.0,9.6586
";

    #[test]
    fn test_table_as_line_source() {
        let table = CsvLineTable::from_reader(TABLE.as_bytes(), "table").unwrap();
        assert_eq!(table.elements(), vec!["Fe", "Zn"]);
        assert_eq!(table.raw_lines("Fe").len(), 3);
        assert_eq!(table.edge_energy("Zn", LineFamily::Ka), Some(9.6586));
        assert_eq!(table.edge_energy("Zn", LineFamily::Kb), None);

        let elements = table.elements();
        let mut db = LineDatabase::new(Box::new(table)).with_elements(elements);
        db.initialize(9.0).unwrap();
        let lines = db.lines(9.0).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.element == "Fe"));
    }

    #[test]
    fn test_rejects_bad_label() {
        let bad = "element,line,energy_kev,rate,edge_kev\nFe,Lg1,6.0,1.0,7.0\n";
        assert!(matches!(
            CsvLineTable::from_reader(bad.as_bytes(), "bad"),
            Err(XrfError::ParseError { .. })
        ));
    }
}
