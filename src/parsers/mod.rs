//! # 解析器模块
//!
//! 提供扫描数据、DPC 数据和外部谱线表的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: scan, dpc, line_table

pub mod dpc;
pub mod line_table;
pub mod scan;

use crate::error::{Result, XrfError};
use crate::models::{LineFamily, ScanData};

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// 从文件路径推断格式并解析扫描数据
pub fn parse_scan_file(path: &Path) -> Result<ScanData> {
    if !path.exists() {
        return Err(XrfError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => scan::parse_scan_file(path),
        _ => Err(XrfError::UnsupportedFormat(format!(
            "Cannot determine scan format for: {}",
            path.display()
        ))),
    }
}

static LINE_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([a-z]{1,2})(?:[\s_\-]*([klm][ab]\d?))?\s*$").expect("valid line regex")
});

/// 解析谱线说明，如 "Fe"、"Fe Ka"、"cu-kb"、"PbLa1"
///
/// 返回规范化的元素符号与可选的谱线族。
pub fn parse_line_spec(spec: &str) -> Result<(String, Option<LineFamily>)> {
    let caps = LINE_SPEC
        .captures(spec)
        .ok_or_else(|| XrfError::InvalidArgument(format!("invalid line specifier '{}'", spec)))?;

    let symbol = &caps[1];
    let mut element = symbol[..1].to_uppercase();
    element.push_str(&symbol[1..].to_lowercase());

    let family = caps.get(2).and_then(|m| LineFamily::from_label(m.as_str()));
    Ok((element, family))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_spec() {
        assert_eq!(parse_line_spec("Fe").unwrap(), ("Fe".to_string(), None));
        assert_eq!(
            parse_line_spec("fe ka").unwrap(),
            ("Fe".to_string(), Some(LineFamily::Ka))
        );
        assert_eq!(
            parse_line_spec("Cu-Kb").unwrap(),
            ("Cu".to_string(), Some(LineFamily::Kb))
        );
        assert_eq!(
            parse_line_spec("PbLa1").unwrap(),
            ("Pb".to_string(), Some(LineFamily::La))
        );
        assert!(parse_line_spec("Fe Kx").is_err());
        assert!(parse_line_spec("").is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let path = std::env::temp_dir().join(format!("xrfkit_{}.h5", std::process::id()));
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(
            parse_scan_file(&path),
            Err(XrfError::UnsupportedFormat(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
