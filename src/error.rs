//! # 统一错误处理模块
//!
//! 定义 xrfkit 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// xrfkit 统一错误类型
#[derive(Error, Debug)]
pub enum XrfError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 分析流程错误
    // ─────────────────────────────────────────────────────────────
    #[error("Line database not initialized for excitation energy {energy_kev:.3} keV")]
    DatabaseNotInitialized { energy_kev: f64 },

    #[error("Missing or invalid correction data: {0}")]
    MissingCorrectionData(String),

    #[error("Spectrum unusable for peak detection: {0}")]
    EmptySpectrum(String),

    #[error("Invalid energy calibration: {0}")]
    InvalidCalibration(String),

    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Emission line not found in database: {0}")]
    UnknownLine(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // CSV / 绘图错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Plot rendering failed: {0}")]
    PlotError(String),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, XrfError>;
