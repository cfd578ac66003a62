//! # PACS管理模块
//!
//! 报告引擎的配置加载、校验与日志初始化

pub mod config;
pub mod logging;

pub use config::{ConfigManager, ConfigValidator, LoggingConfig, LogFormat, ReportingConfig, StorageSettings};
pub use logging::init_logging;
