//! # PACS存储模块
//!
//! 保存报告关键图像，返回可写入 `ImageRef.path` 的稳定路径。

pub mod images;

pub use images::ImageStore;
