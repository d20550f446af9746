//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `xrf/`, `batch/`, `utils/`
//! - 子模块: pipeline, process, detect, map, dpc, spectrum

pub mod detect;
pub mod dpc;
pub mod map;
pub mod pipeline;
pub mod process;
pub mod spectrum;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Process(args) => process::execute(args),
        Commands::DetectPeaks(args) => detect::execute(args),
        Commands::MapElement(args) => map::execute(args),
        Commands::Dpc(args) => dpc::execute(args),
        Commands::PlotSpectrum(args) => spectrum::execute(args),
    }
}
