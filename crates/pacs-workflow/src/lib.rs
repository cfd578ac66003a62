//! # PACS报告工作流模块
//!
//! 提供报告生命周期管理功能，包括：
//! - 报告状态机：草稿、终审、补充报告之间的状态转换
//! - 生命周期操作：终审、打开/确认/保存补充报告，以及锁定规则
//! - 持久化协作者接口及内存实现
//! - 工作流引擎：按报告串行化转换并保存

pub mod engine;
pub mod lifecycle;
pub mod repository;
pub mod state_machine;

// 重新导出主要类型
pub use engine::ReportWorkflowEngine;
pub use lifecycle::ReportLifecycle;
pub use repository::{InMemoryReportRepository, ReportRepository};
pub use state_machine::{ReportEvent, ReportStateMachine};
