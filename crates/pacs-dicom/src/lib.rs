//! # DICOM头信息模块
//!
//! 从DICOM对象中提取报告表头所需的患者和检查字段。

pub mod header;

pub use header::StudyHeader;
