//! 报告生命周期
//!
//! 在状态机之上实现草稿、终审、补充报告的各项操作。所有操作要么完整生效，
//! 要么不修改文档（先校验，后修改）。持久化由调用方负责。

use crate::state_machine::{ReportEvent, ReportStateMachine};
use chrono::Utc;
use pacs_core::utils::is_blank;
use pacs_core::{
    AddendumRecord, ImageRef, PacsError, ReportDocument, ReportSections, ReportStatus, Result,
    StudyFields,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 报告生命周期管理
#[derive(Debug, Default)]
pub struct ReportLifecycle {
    state_machine: ReportStateMachine,
}

impl ReportLifecycle {
    /// 创建新的生命周期管理器
    pub fn new() -> Self {
        Self {
            state_machine: ReportStateMachine::new(),
        }
    }

    /// 获取状态机实例
    pub fn state_machine(&self) -> &ReportStateMachine {
        &self.state_machine
    }

    /// 创建草稿
    pub fn create_draft(&self, study: StudyFields) -> ReportDocument {
        let doc = ReportDocument::new_draft(study);
        info!("Created draft report {} for study {}", doc.id, doc.study.id);
        doc
    }

    /// 保存正文（草稿自动保存，或确认理由后的补充报告编辑）
    pub fn update_sections(
        &self,
        doc: &mut ReportDocument,
        sections: ReportSections,
        addendum: Option<&AddendumRecord>,
    ) -> Result<()> {
        self.ensure_editable(doc, addendum)
            .map_err(|e| rejected(doc.id, e))?;

        doc.sections = sections;
        doc.updated_at = Utc::now();
        debug!("Report {} sections saved ({})", doc.id, doc.status);
        Ok(())
    }

    /// 追加关键图像，索引为追加前的图像数量
    pub fn attach_image(
        &self,
        doc: &mut ReportDocument,
        path: impl Into<String>,
        addendum: Option<&AddendumRecord>,
    ) -> Result<ImageRef> {
        self.ensure_editable(doc, addendum)
            .map_err(|e| rejected(doc.id, e))?;

        let path = path.into();
        if is_blank(&path) {
            return Err(rejected(doc.id, PacsError::Validation("image path is required".to_string())));
        }

        let image = ImageRef {
            path,
            index: doc.images.len(),
        };
        doc.images.push(image.clone());
        doc.updated_at = Utc::now();
        Ok(image)
    }

    /// 移除关键图像，其后图像的索引依次前移
    pub fn remove_image(
        &self,
        doc: &mut ReportDocument,
        index: usize,
        addendum: Option<&AddendumRecord>,
    ) -> Result<ImageRef> {
        self.ensure_editable(doc, addendum)
            .map_err(|e| rejected(doc.id, e))?;

        if index >= doc.images.len() {
            return Err(PacsError::NotFound(format!(
                "image {} in report {}",
                index, doc.id
            )));
        }

        let removed = doc.images.remove(index);
        for (i, image) in doc.images.iter_mut().enumerate() {
            image.index = i;
        }
        doc.updated_at = Utc::now();
        Ok(removed)
    }

    /// 指定报告医生（仅草稿）
    pub fn assign_reporter(&self, doc: &mut ReportDocument, reported_by: &str) -> Result<()> {
        self.state_machine
            .transition(doc.status, ReportEvent::Edit)
            .and_then(|_| match doc.status {
                ReportStatus::Draft => Ok(()),
                _ => Err(PacsError::InvalidState(format!(
                    "reporter can only be assigned while Draft, report is {}",
                    doc.status
                ))),
            })
            .map_err(|e| rejected(doc.id, e))?;

        if is_blank(reported_by) {
            return Err(rejected(doc.id, PacsError::Validation("reporter name is required".to_string())));
        }

        doc.reported_by = reported_by.trim().to_string();
        doc.updated_at = Utc::now();
        Ok(())
    }

    /// 终审报告
    ///
    /// 审核医生为空或当前状态不是草稿时返回 `Validation`。
    /// 成功后冻结当前正文作为原始版本。
    pub fn finalize(&self, doc: &mut ReportDocument, approved_by: &str) -> Result<()> {
        let next = self
            .state_machine
            .transition(doc.status, ReportEvent::Finalize)
            .map_err(|_| {
                rejected(
                    doc.id,
                    PacsError::Validation(format!(
                        "only a Draft report can be finalized, report is {}",
                        doc.status
                    )),
                )
            })?;

        if is_blank(approved_by) {
            return Err(rejected(
                doc.id,
                PacsError::Validation("approver required before finalizing".to_string()),
            ));
        }

        let now = Utc::now();
        doc.approved_by = approved_by.trim().to_string();
        doc.status = next;
        doc.original_sections = Some(doc.sections.clone());
        doc.finalized_at = Some(now);
        doc.reported_at.get_or_insert(now);
        doc.updated_at = now;

        info!("Report {} finalized by approver", doc.id);
        Ok(())
    }

    /// 打开补充报告
    ///
    /// 仅终审状态可打开；同一报告同时最多一个未保存的补充报告。
    pub fn open_addendum(&self, doc: &mut ReportDocument, created_by: &str) -> Result<AddendumRecord> {
        let next = self
            .state_machine
            .transition(doc.status, ReportEvent::OpenAddendum)
            .map_err(|e| rejected(doc.id, e))?;

        if doc.addendum.is_some() {
            return Err(rejected(
                doc.id,
                PacsError::InvalidState(format!("report {} already has an addendum", doc.id)),
            ));
        }
        if is_blank(created_by) {
            return Err(rejected(
                doc.id,
                PacsError::Validation("addendum author is required".to_string()),
            ));
        }

        let now = Utc::now();
        let record = AddendumRecord {
            id: Uuid::new_v4(),
            parent_report_id: doc.id,
            reason: String::new(),
            confirmed_at: None,
            created_by: created_by.trim().to_string(),
            created_at: now,
            base_sections: doc.content(pacs_core::ContentVersion::Original).clone(),
        };

        doc.status = next;
        doc.updated_at = now;

        info!("Addendum {} opened for report {}", record.id, doc.id);
        Ok(record)
    }

    /// 确认补充报告理由（一次性锁存）
    pub fn confirm_addendum_reason(&self, record: &mut AddendumRecord, reason: &str) -> Result<()> {
        if record.is_confirmed() {
            warn!("Addendum {} reason already confirmed", record.id);
            return Err(PacsError::AlreadyConfirmed(format!(
                "addendum {} reason",
                record.id
            )));
        }
        if is_blank(reason) {
            warn!("Addendum {} reason rejected: blank", record.id);
            return Err(PacsError::Validation(
                "addendum reason required before editing".to_string(),
            ));
        }

        record.reason = reason.trim().to_string();
        record.confirmed_at = Some(Utc::now());

        info!("Addendum {} reason confirmed, sections unlocked", record.id);
        Ok(())
    }

    /// 保存补充报告
    pub fn save_addendum(&self, doc: &mut ReportDocument, record: &AddendumRecord) -> Result<()> {
        if !record.is_confirmed() {
            return Err(rejected(
                doc.id,
                PacsError::Validation("addendum reason must be confirmed before saving".to_string()),
            ));
        }
        if record.parent_report_id != doc.id {
            return Err(rejected(
                doc.id,
                PacsError::Validation(format!(
                    "addendum {} belongs to report {}",
                    record.id, record.parent_report_id
                )),
            ));
        }

        let next = self
            .state_machine
            .transition(doc.status, ReportEvent::SaveAddendum)
            .map_err(|e| rejected(doc.id, e))?;

        doc.status = next;
        doc.addendum = Some(record.clone());
        doc.updated_at = Utc::now();

        info!("Addendum {} saved on report {}", record.id, doc.id);
        Ok(())
    }

    /// 编辑前置检查：草稿可编辑；补充报告需已确认理由
    fn ensure_editable(&self, doc: &ReportDocument, addendum: Option<&AddendumRecord>) -> Result<()> {
        self.state_machine.transition(doc.status, ReportEvent::Edit)?;

        if doc.status != ReportStatus::AddendumPending {
            return Ok(());
        }

        match addendum {
            Some(record) if record.parent_report_id != doc.id => Err(PacsError::Validation(format!(
                "addendum {} belongs to report {}",
                record.id, record.parent_report_id
            ))),
            Some(record) if record.is_confirmed() => Ok(()),
            _ => Err(PacsError::Validation(
                "addendum reason required before editing".to_string(),
            )),
        }
    }
}

fn rejected(report_id: Uuid, err: PacsError) -> PacsError {
    warn!("Report {} transition rejected: {}", report_id, err);
    err
}
