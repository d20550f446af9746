//! # dpc 子命令实现
//!
//! 由四象限探测器信号计算光束偏转与相位梯度。
//!
//! ## 依赖关系
//! - 使用 `cli/dpc.rs` 定义的 DpcArgs
//! - 使用 `parsers/dpc.rs` 读取数据，`xrf/dpc.rs` 计算

use super::pipeline;
use crate::cli::dpc::DpcArgs;
use crate::error::Result;
use crate::parsers::dpc::parse_dpc_file;
use crate::utils::output;
use crate::xrf::{dpc, export, plot};

/// 执行 DPC 分析
pub fn execute(args: DpcArgs) -> Result<()> {
    output::print_header("Differential Phase Contrast");

    let scan = parse_dpc_file(&args.input)?;
    output::print_field("Scan", &scan.name);
    output::print_field("Points", &scan.len().to_string());
    output::print_field("Detector size", &format!("{} x {} mm", args.lx, args.ly));

    let result = dpc::deflections(&scan, args.lx, args.ly)?;

    let n = result.points.len() as f64;
    let mean_bx = result.points.iter().map(|p| p.beam_x).sum::<f64>() / n;
    let mean_by = result.points.iter().map(|p| p.beam_y).sum::<f64>() / n;
    output::print_field("Mean deflection x", &format!("{:.4e} mm", mean_bx));
    output::print_field("Mean deflection y", &format!("{:.4e} mm", mean_by));
    output::print_field("Max magnitude", &format!("{:.4e} mm", result.max_magnitude()));

    if let Some(path) = &args.output_csv {
        export::dpc_to_csv(&result, path)?;
        output::print_written("deflections", path);
    }

    if let Some(path) = &args.plot {
        plot::dpc_plot(
            &result,
            args.point_size,
            path,
            pipeline::plot_options(&args.plot_opts),
        )?;
        output::print_written("DPC plot", path);
    }

    output::print_success(&format!("DPC analysis complete for {} points", result.points.len()));
    Ok(())
}
