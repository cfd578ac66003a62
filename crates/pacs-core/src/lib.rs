//! # PACS Core
//!
//! 报告引擎的核心模块，提供基础数据结构、错误定义、患者身份规范化和通用工具。

pub mod error;
pub mod identity;
pub mod models;
pub mod utils;

pub use error::{ErrorKind, PacsError, Result};
pub use identity::{normalize, normalize_raw, RawPatientFields};
pub use models::*;
