// src/core/mod.rs
//! Loading, grouping, merging and exporting outreach data

pub mod aggregator;
pub mod config_manager;
pub mod fs_ops;
pub mod record_loader;
pub mod report;
pub mod result_store;
pub mod workbook;

pub use config_manager::AppConfig;
pub use fs_ops::FsOps;
pub use record_loader::RecordLoader;
pub use report::InsightReport;
pub use result_store::ResultTable;
