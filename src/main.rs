//! # xrf-analyze - XRF 能谱分析工具箱
//!
//! 同步辐射微区 X 射线荧光扫描的能谱分析：死时间与 i0 校正、能量标定、
//! 峰检测与基于谱线数据库的峰识别、元素分布图以及差分相衬 (DPC)。
//!
//! ## 子命令
//! - `process`       - 完整分析流程（单文件或目录批量）
//! - `detect-peaks`  - 峰检测与识别
//! - `map-element`   - 元素 / 散射峰分布图
//! - `dpc`           - 差分相衬分析
//! - `plot-spectrum` - 能谱总览图
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (扫描 / DPC / 谱线表解析)
//!   │     ├── xrf/       (校正、标定、检测、识别、分布图、绘图)
//!   │     ├── batch/     (批量并行处理)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (终端输出与进度条)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod utils;
mod xrf;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
