//! # 数据模型模块
//!
//! 定义能谱、发射谱线和谱峰的统一数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `xrf/` 和 `commands/` 使用
//! - 子模块: spectrum, line, peak

pub mod line;
pub mod peak;
pub mod spectrum;

pub use line::{EmissionLine, LineFamily, RawLine, Shell};
pub use peak::{
    CandidatePeak, Identification, IdentifiedPeak, LineMatch, ScatterKind, UnidentifiedReason,
};
pub use spectrum::{DetectorElement, DetectorSelection, Representative, ScanData, SpectrumStack};
