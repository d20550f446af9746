//! # 扫描 CSV 格式解析器
//!
//! 解析逐像素、逐探测单元的 XRF 扫描数据。
//!
//! ## 格式说明
//! ```text
//! pixel,detector,x,y,i0,deadtime,incident_energy_ev,ch0,ch1,...
//! 0,0,0.000,0.000,1.02e5,1.03,10000.0,0,3,5,...
//! 0,1,0.000,0.000,1.02e5,1.05,10000.0,1,2,4,...
//! ```
//! - 每行为一个 (像素, 探测单元) 的能谱
//! - 前 7 列按列名识别，其余列按顺序作为通道
//! - 以 `#` 开头的行为注释
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/spectrum.rs`
//! - 使用 `csv` 库读取

use crate::error::{Result, XrfError};
use crate::models::{DetectorElement, ScanData, SpectrumStack};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const REQUIRED_COLUMNS: [&str; 7] = [
    "pixel",
    "detector",
    "x",
    "y",
    "i0",
    "deadtime",
    "incident_energy_ev",
];

/// 列位置
struct ColumnLayout {
    fixed: [usize; 7],
    channels: Vec<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord, path: &str) -> Result<Self> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        let mut fixed = [0usize; 7];
        for (slot, required) in fixed.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = names
                .iter()
                .position(|n| n == required)
                .ok_or_else(|| XrfError::ParseError {
                    format: "scan CSV".to_string(),
                    path: path.to_string(),
                    reason: format!("missing column '{}'", required),
                })?;
        }

        let channels: Vec<usize> = (0..names.len()).filter(|i| !fixed.contains(i)).collect();
        if channels.is_empty() {
            return Err(XrfError::ParseError {
                format: "scan CSV".to_string(),
                path: path.to_string(),
                reason: "no spectrum channel columns".to_string(),
            });
        }

        Ok(Self { fixed, channels })
    }
}

/// 单像素的元数据
#[derive(Debug, Clone, Copy)]
struct PixelMeta {
    x: f64,
    y: f64,
    i0: f64,
    energy_ev: f64,
}

/// 解析扫描文件
pub fn parse_scan_file(path: &Path) -> Result<ScanData> {
    let file = File::open(path).map_err(|e| XrfError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_scan_reader(
        file,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
        &path.display().to_string(),
    )
}

/// 从任意输入流解析扫描数据
pub fn parse_scan_reader<R: Read>(reader: R, name: &str, source: &str) -> Result<ScanData> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let layout = ColumnLayout::from_headers(rdr.headers()?, source)?;
    let n_channels = layout.channels.len();

    let parse_err = |line: u64, reason: String| XrfError::ParseError {
        format: "scan CSV".to_string(),
        path: source.to_string(),
        reason: format!("line {}: {}", line, reason),
    };

    let mut pixels: BTreeMap<usize, PixelMeta> = BTreeMap::new();
    // detector → pixel → (deadtime, spectrum)
    let mut detectors: BTreeMap<usize, BTreeMap<usize, (f64, Vec<f64>)>> = BTreeMap::new();

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let field = |idx: usize| -> Result<f64> {
            let raw = record.get(idx).unwrap_or("");
            raw.parse::<f64>()
                .map_err(|_| parse_err(line, format!("invalid number '{}'", raw)))
        };
        let index = |idx: usize| -> Result<usize> {
            let raw = record.get(idx).unwrap_or("");
            raw.parse::<usize>()
                .map_err(|_| parse_err(line, format!("invalid index '{}'", raw)))
        };

        let [c_pixel, c_det, c_x, c_y, c_i0, c_dt, c_e] = layout.fixed;
        let pixel = index(c_pixel)?;
        let detector = index(c_det)?;
        let meta = PixelMeta {
            x: field(c_x)?,
            y: field(c_y)?,
            i0: field(c_i0)?,
            energy_ev: field(c_e)?,
        };
        let deadtime = field(c_dt)?;

        let spectrum = layout
            .channels
            .iter()
            .map(|&c| field(c))
            .collect::<Result<Vec<f64>>>()?;

        pixels.entry(pixel).or_insert(meta);
        let previous = detectors
            .entry(detector)
            .or_default()
            .insert(pixel, (deadtime, spectrum));
        if previous.is_some() {
            return Err(parse_err(
                line,
                format!("duplicate row for pixel {} detector {}", pixel, detector),
            ));
        }
    }

    if pixels.is_empty() {
        return Err(XrfError::ParseError {
            format: "scan CSV".to_string(),
            path: source.to_string(),
            reason: "no data rows".to_string(),
        });
    }

    // 像素编号必须为 0..n 连续
    let n_pixels = pixels.len();
    if pixels.keys().copied().ne(0..n_pixels) {
        return Err(XrfError::ParseError {
            format: "scan CSV".to_string(),
            path: source.to_string(),
            reason: format!("pixel indices are not contiguous 0..{}", n_pixels),
        });
    }

    let mut elements = Vec::with_capacity(detectors.len());
    for (det, rows) in detectors {
        if rows.len() != n_pixels {
            return Err(XrfError::DimensionMismatch {
                what: format!("pixels of detector element {}", det),
                expected: n_pixels,
                found: rows.len(),
            });
        }
        let mut spectra = SpectrumStack::with_channels(n_channels)?;
        let mut deadtime = Vec::with_capacity(n_pixels);
        for (_, (dt, spectrum)) in rows {
            spectra.push(&spectrum)?;
            deadtime.push(dt);
        }
        elements.push(DetectorElement { spectra, deadtime });
    }

    let scan = ScanData {
        name: name.to_string(),
        detectors: elements,
        i0: pixels.values().map(|m| m.i0).collect(),
        x: pixels.values().map(|m| m.x).collect(),
        y: pixels.values().map(|m| m.y).collect(),
        incident_energy_ev: pixels.values().map(|m| m.energy_ev).collect(),
    };
    scan.validate()?;
    Ok(scan)
}

/// 只读取入射能量列，返回平均值 (keV)
pub fn peek_incident_energy_kev(path: &Path) -> Result<f64> {
    let file = File::open(path).map_err(|e| XrfError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(file);

    let source = path.display().to_string();
    let layout = ColumnLayout::from_headers(rdr.headers()?, &source)?;
    let col = layout.fixed[6];

    let mut sum = 0.0;
    let mut count = 0usize;
    for record in rdr.records() {
        let record = record?;
        if let Some(v) = record.get(col).and_then(|s| s.parse::<f64>().ok()) {
            if v.is_finite() && v > 0.0 {
                sum += v;
                count += 1;
            }
        }
    }

    if count == 0 {
        return Err(XrfError::ParseError {
            format: "scan CSV".to_string(),
            path: source,
            reason: "no valid incident energy values".to_string(),
        });
    }
    Ok(sum / count as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# two pixels, two detector elements
pixel,detector,x,y,i0,deadtime,incident_energy_ev,c0,c1,c2
0,0,0.0,0.0,100,1.0,10000,1,2,3
0,1,0.0,0.0,100,1.1,10000,4,5,6
1,0,0.5,0.0,200,1.0,10010,7,8,9
1,1,0.5,0.0,200,1.2,10010,1,1,1
";

    #[test]
    fn test_parse_scan() {
        let scan = parse_scan_reader(SAMPLE.as_bytes(), "sample", "memory").unwrap();
        assert_eq!(scan.n_pixels(), 2);
        assert_eq!(scan.n_detectors(), 2);
        assert_eq!(scan.n_channels(), 3);
        assert_eq!(scan.detectors[1].deadtime, vec![1.1, 1.2]);
        assert_eq!(scan.detectors[0].spectra.pixel(1), &[7.0, 8.0, 9.0]);
        assert_eq!(scan.x, vec![0.0, 0.5]);
        assert!((scan.mean_incident_energy_kev().unwrap() - 10.005).abs() < 1e-9);
    }

    #[test]
    fn test_missing_rows_rejected() {
        let truncated: String = SAMPLE.lines().take(5).collect::<Vec<_>>().join("\n");
        assert!(matches!(
            parse_scan_reader(truncated.as_bytes(), "t", "memory"),
            Err(XrfError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_column_rejected() {
        let bad = "pixel,detector,x,y,i0,incident_energy_ev,c0\n0,0,0,0,1,10000,5\n";
        assert!(matches!(
            parse_scan_reader(bad.as_bytes(), "t", "memory"),
            Err(XrfError::ParseError { .. })
        ));
    }
}
