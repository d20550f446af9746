//! # XRF 分析模块
//!
//! 提供 X 射线荧光能谱的校正、标定、峰检测、峰识别与空间分布分析。
//!
//! ## 子模块
//! - `tables` / `database`: 发射谱线数据源与按激发能量缓存的谱线数据库
//! - `correction`: 死时间与 i0 归一化
//! - `calibration`: 通道与能量映射
//! - `smoothing` / `background` / `peaks` / `scatter` / `detection`: 峰检测流水线
//! - `identification`: 峰到谱线的稳定分配
//! - `mapping`: 元素分布图
//! - `dpc`: 差分相衬
//! - `plot` / `export`: 图表与数据导出
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/` 的数据结构

pub mod background;
pub mod calibration;
pub mod correction;
pub mod database;
pub mod detection;
pub mod dpc;
pub mod export;
pub mod identification;
pub mod mapping;
pub mod peaks;
pub mod physics;
pub mod plot;
pub mod scatter;
pub mod smoothing;
pub mod tables;

#[cfg(test)]
pub mod synthetic;

pub use background::BackgroundMethod;
pub use calibration::{EnergyAxis, EnergyCalibration};
pub use database::{LineDatabase, LineSource};
pub use detection::{DetectionConfig, DetectionResult};
pub use mapping::{ColorScale, ElementMap, GeometryCorrection, MapTarget};
pub use scatter::ScatterConfig;
pub use smoothing::SmoothingMethod;
