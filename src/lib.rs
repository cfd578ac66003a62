//! # PACS报告引擎
//!
//! 放射科报告的编排与分页：
//! - [`pacs_core`]：数据模型、错误类型、患者身份规范化
//! - [`pacs_workflow`]：报告状态机与生命周期，按报告串行化的工作流引擎
//! - [`pacs_layout`]：文本测量与分页排版
//! - [`pacs_dicom`]：从DICOM对象读取表头信息
//! - [`pacs_storage`]：关键图像存储
//! - [`pacs_admin`]：配置与日志
//!
//! [`ReportingService`] 把工作流引擎和排版引擎串起来：排版前先从持久化层
//! 取得报告快照，排版过程中不会看到并发编辑。

pub use pacs_admin;
pub use pacs_core;
pub use pacs_dicom;
pub use pacs_layout;
pub use pacs_storage;
pub use pacs_workflow;

use pacs_core::{ContentVersion, RawPatientFields, Result};
use pacs_layout::{compose_for_print, LayoutEngine, LayoutPlan, PageSpec};
use pacs_workflow::{ReportRepository, ReportWorkflowEngine};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 报告服务：工作流 + 打印排版
#[derive(Debug)]
pub struct ReportingService<R> {
    workflow: ReportWorkflowEngine<R>,
    layout: LayoutEngine,
    page: PageSpec,
}

impl<R: ReportRepository> ReportingService<R> {
    pub fn new(repository: Arc<R>, layout: LayoutEngine, page: PageSpec) -> Self {
        Self {
            workflow: ReportWorkflowEngine::new(repository),
            layout,
            page,
        }
    }

    /// 工作流引擎
    pub fn workflow(&self) -> &ReportWorkflowEngine<R> {
        &self.workflow
    }

    /// 对报告的当前快照排版
    pub async fn print(
        &self,
        report_id: Uuid,
        raw_patient: &RawPatientFields,
        version: ContentVersion,
    ) -> Result<LayoutPlan> {
        let snapshot = self.workflow.snapshot(report_id).await?;
        let printable = compose_for_print(&snapshot, raw_patient, version);
        let plan = self.layout.layout(&printable, &self.page)?;

        info!(
            "Report {} printed ({:?}): {} pages",
            report_id, version, plan.page_count
        );
        Ok(plan)
    }
}
