//! # DPC CSV 格式解析器
//!
//! ## 格式说明
//! ```text
//! x,y,i0,thor_x,thor_y,thor_tot
//! 0.000,0.000,1.02e5,0.013,-0.004,0.98
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/dpc.rs` 使用
//! - 产生 `xrf/dpc.rs` 的 `DpcScan`
//! - 使用 `csv` + `serde` 反序列化

use crate::error::{Result, XrfError};
use crate::xrf::dpc::DpcScan;

use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// DPC 文件中的一行
#[derive(Debug, Deserialize)]
struct DpcRecord {
    x: f64,
    y: f64,
    i0: f64,
    thor_x: f64,
    thor_y: f64,
    thor_tot: f64,
}

/// 解析 DPC 文件
pub fn parse_dpc_file(path: &Path) -> Result<DpcScan> {
    let file = File::open(path).map_err(|e| XrfError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_dpc_reader(
        file,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

pub fn parse_dpc_reader<R: Read>(reader: R, name: &str) -> Result<DpcScan> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut scan = DpcScan {
        name: name.to_string(),
        ..DpcScan::default()
    };

    for record in rdr.deserialize() {
        let r: DpcRecord = record?;
        scan.x.push(r.x);
        scan.y.push(r.y);
        scan.i0.push(r.i0);
        scan.thor_x.push(r.thor_x);
        scan.thor_y.push(r.thor_y);
        scan.thor_tot.push(r.thor_tot);
    }

    if scan.is_empty() {
        return Err(XrfError::ParseError {
            format: "DPC CSV".to_string(),
            path: name.to_string(),
            reason: "no data rows".to_string(),
        });
    }

    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dpc() {
        let content = "x,y,i0,thor_x,thor_y,thor_tot\n0,0,2,0.3,0.4,1\n1,0,4,-0.8,0,2\n";
        let scan = parse_dpc_reader(content.as_bytes(), "dpc").unwrap();
        assert_eq!(scan.len(), 2);
        assert_eq!(scan.thor_x, vec![0.3, -0.8]);

        let bad = "x,y,i0,thor_x,thor_y\n0,0,1,1,1\n";
        assert!(parse_dpc_reader(bad.as_bytes(), "bad").is_err());
    }
}
