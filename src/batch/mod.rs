//! # 批量处理模块
//!
//! 对目录中的多个扫描文件执行同一分析流程。
//!
//! ## 功能
//! - 按 glob 模式收集扫描文件
//! - 并行处理
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `commands/process.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchResult, BatchRunner, ProcessResult};
