//! # plot-spectrum 子命令实现
//!
//! 绘制校正后的求和能谱与最大值包络能谱（对数坐标）。
//!
//! ## 依赖关系
//! - 使用 `cli/spectrum.rs` 定义的 PlotSpectrumArgs
//! - 使用 `xrf/plot.rs` 与 `xrf/export.rs`

use super::pipeline;
use crate::cli::spectrum::PlotSpectrumArgs;
use crate::error::{Result, XrfError};
use crate::utils::{output, progress};
use crate::xrf::{export, plot};

/// 执行能谱绘图
pub fn execute(args: PlotSpectrumArgs) -> Result<()> {
    output::print_header("XRF Spectrum Overview");

    if !args.input.is_file() {
        return Err(XrfError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    let spinner = progress::create_spinner("Reading scan and applying corrections...");
    let loaded = pipeline::load_scan(&args.input, &args.calibration, args.sensor, None);
    spinner.finish_and_clear();
    let loaded = loaded?;
    pipeline::print_scan_summary(&loaded, args.sensor);

    let sum = loaded.corrected.sum_spectrum();
    let envelope = loaded.corrected.max_envelope();
    let stem = pipeline::scan_stem(&args.input);

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| format!("{}_spectrum.{}", stem, args.plot.format.extension()).into());

    plot::spectrum_overview(
        loaded.axis.energies(),
        &sum,
        &envelope,
        &output_path,
        &loaded.scan.name,
        pipeline::plot_options(&args.plot),
    )?;
    output::print_written("spectrum plot", &output_path);

    if args.xy {
        let dir = output_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        for (kind, values) in [("sum", &sum), ("envelope", &envelope)] {
            let path = dir.join(format!("{}_{}.xy", stem, kind));
            export::spectrum_to_xy(
                loaded.axis.energies(),
                values,
                &format!("{} ({})", loaded.scan.name, kind),
                &path,
            )?;
            output::print_written(kind, &path);
        }
    }

    output::print_success("Spectrum overview complete");
    Ok(())
}
