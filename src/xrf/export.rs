//! # 分析结果导出
//!
//! ## 支持格式
//! - CSV: 识别峰表、能谱处理曲线、元素分布图、DPC 结果
//! - XY: 能谱文本交换格式（能量, 强度）
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{Result, XrfError};
use crate::models::{Identification, IdentifiedPeak};
use crate::xrf::detection::DetectionResult;
use crate::xrf::dpc::DpcResult;
use crate::xrf::mapping::ElementMap;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// 导出识别峰表
pub fn peaks_to_csv(peaks: &[IdentifiedPeak], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record([
        "channel",
        "energy_kev",
        "height",
        "prominence",
        "width_channels",
        "assignment",
        "line",
        "line_energy_kev",
        "residual_ev",
        "confidence",
        "candidates_in_tolerance",
    ])?;

    for p in peaks {
        let (line, line_energy, residual, confidence) = match &p.identification {
            Identification::Line {
                line,
                residual_kev,
                confidence,
            } => (
                format!("{} {}", line.element, line.sub_line),
                format!("{:.4}", line.energy_kev),
                format!("{:.1}", residual_kev * 1000.0),
                format!("{:.3}", confidence),
            ),
            _ => (String::new(), String::new(), String::new(), String::new()),
        };

        wtr.write_record(&[
            p.peak.channel.to_string(),
            format!("{:.4}", p.peak.energy_kev),
            format!("{:.3}", p.peak.height),
            format!("{:.3}", p.peak.prominence),
            format!("{:.2}", p.peak.width),
            p.label(),
            line,
            line_energy,
            residual,
            confidence,
            p.candidates_in_tolerance.to_string(),
        ])?;
    }

    wtr.flush().map_err(|e| XrfError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 导出能谱处理曲线（原始/平滑/背景/扣背景）
pub fn traces_to_csv(raw: &[f64], result: &DetectionResult, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["energy_kev", "raw", "smoothed", "background", "subtracted"])?;

    for i in 0..result.energies.len() {
        wtr.write_record(&[
            format!("{:.5}", result.energies[i]),
            format!("{:.6}", raw.get(i).copied().unwrap_or(0.0)),
            format!("{:.6}", result.smoothed[i]),
            format!("{:.6}", result.background[i]),
            format!("{:.6}", result.subtracted[i]),
        ])?;
    }

    wtr.flush().map_err(|e| XrfError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 导出元素分布图
pub fn map_to_csv(map: &ElementMap, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["x", "y", "intensity"])?;
    for ((x, y), v) in map.x.iter().zip(&map.y).zip(&map.intensity) {
        wtr.write_record(&[format!("{:.6}", x), format!("{:.6}", y), format!("{:.6}", v)])?;
    }

    wtr.flush().map_err(|e| XrfError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 导出 DPC 结果
pub fn dpc_to_csv(result: &DpcResult, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    for point in &result.points {
        wtr.serialize(point)?;
    }
    wtr.flush().map_err(|e| XrfError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// 导出能谱为 XY 格式
pub fn spectrum_to_xy(
    energies: &[f64],
    values: &[f64],
    name: &str,
    output_path: &Path,
) -> Result<()> {
    let write_err = |e: std::io::Error| XrfError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    };

    let mut file = BufWriter::new(File::create(output_path).map_err(write_err)?);

    writeln!(file, "# XRF Spectrum: {}", name).map_err(write_err)?;
    writeln!(file, "# Columns: Energy (keV), Intensity").map_err(write_err)?;
    writeln!(file, "#").map_err(write_err)?;

    for (e, v) in energies.iter().zip(values) {
        writeln!(file, "{:.5}\t{:.6}", e, v).map_err(write_err)?;
    }

    file.flush().map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrf::dpc::{deflections, DpcScan};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("xrfkit_export_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_spectrum_xy() {
        let path = temp_path("spectrum.xy");
        spectrum_to_xy(&[1.0, 1.01], &[5.0, 6.0], "demo", &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let data_lines: Vec<&str> = content.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(data_lines, vec!["1.00000\t5.000000", "1.01000\t6.000000"]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_dpc_csv_header() {
        let scan = DpcScan {
            name: "d".to_string(),
            x: vec![0.0],
            y: vec![0.0],
            i0: vec![1.0],
            thor_x: vec![0.1],
            thor_y: vec![0.1],
            thor_tot: vec![1.0],
        };
        let path = temp_path("dpc.csv");
        dpc_to_csv(&deflections(&scan, 10.0, 10.0).unwrap(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("x,y,beam_x,beam_y,phase_gradient_x,phase_gradient_y,magnitude,total"));
        std::fs::remove_file(&path).ok();
    }
}
