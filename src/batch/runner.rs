//! # 批量执行器
//!
//! 并行执行批量处理任务。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/process.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{Result, XrfError};
use crate::utils::progress;

use rayon::prelude::*;
use std::path::PathBuf;

/// 单个文件处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 处理成功
    Success(String),
    /// 跳过（如输出已存在）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (文件路径, 错误信息)
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(path, err) => {
                self.failed += 1;
                self.failures.push((path, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建批量执行器，`jobs == 0` 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理文件列表
    pub fn run<F>(&self, files: &[PathBuf], processor: F) -> Result<BatchResult>
    where
        F: Fn(&PathBuf) -> ProcessResult + Sync + Send,
    {
        let pb = progress::create_progress_bar(files.len() as u64, "Processing scans");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| XrfError::Other(format!("Failed to build thread pool: {}", e)))?;

        let results: Vec<ProcessResult> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let result = processor(file);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }
        Ok(batch_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_counts_outcomes() {
        let files: Vec<PathBuf> = (0..6).map(|i| PathBuf::from(format!("{}.csv", i))).collect();
        let runner = BatchRunner::new(2);
        assert_eq!(runner.jobs(), 2);

        let result = runner
            .run(&files, |f| {
                let stem = f.file_stem().unwrap().to_string_lossy().to_string();
                match stem.parse::<usize>().unwrap() % 3 {
                    0 => ProcessResult::Success(stem),
                    1 => ProcessResult::Skipped(stem),
                    _ => ProcessResult::Failed(stem, "bad".to_string()),
                }
            })
            .unwrap();

        assert_eq!(result.success, 2);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.failed, 2);
        assert_eq!(result.total(), 6);
        assert_eq!(result.failures.len(), 2);
    }
}
