//! 报告工作流引擎
//!
//! 协调生命周期操作与持久化协作者。同一报告的转换在报告级互斥锁内串行执行，
//! 避免两个并发的“打开补充报告”同时成功。

use crate::lifecycle::ReportLifecycle;
use crate::repository::ReportRepository;
use pacs_core::{
    AddendumRecord, ImageRef, PacsError, ReportDocument, ReportSections, Result, StudyFields,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// 报告工作流引擎
#[derive(Debug)]
pub struct ReportWorkflowEngine<R> {
    lifecycle: ReportLifecycle,
    repository: Arc<R>,
    report_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<R: ReportRepository> ReportWorkflowEngine<R> {
    /// 创建新的工作流引擎
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            lifecycle: ReportLifecycle::new(),
            repository,
            report_locks: Mutex::new(HashMap::new()),
        }
    }

    /// 获取生命周期管理器实例
    pub fn lifecycle(&self) -> &ReportLifecycle {
        &self.lifecycle
    }

    /// 获取持久化协作者实例
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// 为检查创建草稿并保存
    pub async fn create_draft(&self, study: StudyFields) -> Result<ReportDocument> {
        let doc = self.lifecycle.create_draft(study);
        self.repository.save(&doc, None).await?;
        Ok(doc)
    }

    /// 获取报告的不可变快照（用于排版）
    pub async fn snapshot(&self, report_id: Uuid) -> Result<ReportDocument> {
        self.repository
            .load(report_id)
            .await?
            .ok_or_else(|| PacsError::NotFound(format!("Report {} not found", report_id)))
    }

    /// 按检查UID查找报告
    pub async fn find_by_study(&self, study_uid: &str) -> Result<Option<ReportDocument>> {
        self.repository.load_by_study(study_uid).await
    }

    /// 保存正文
    pub async fn save_sections(
        &self,
        report_id: Uuid,
        sections: ReportSections,
    ) -> Result<ReportDocument> {
        let (doc, _) = self
            .transact(report_id, |lifecycle, doc, open| {
                lifecycle.update_sections(doc, sections, open.as_ref())
            })
            .await?;
        Ok(doc)
    }

    /// 追加关键图像
    pub async fn attach_image(&self, report_id: Uuid, path: String) -> Result<ImageRef> {
        let (_, image) = self
            .transact(report_id, |lifecycle, doc, open| {
                lifecycle.attach_image(doc, path, open.as_ref())
            })
            .await?;
        Ok(image)
    }

    /// 移除关键图像
    pub async fn remove_image(&self, report_id: Uuid, index: usize) -> Result<ImageRef> {
        let (_, image) = self
            .transact(report_id, |lifecycle, doc, open| {
                lifecycle.remove_image(doc, index, open.as_ref())
            })
            .await?;
        Ok(image)
    }

    /// 指定报告医生
    pub async fn assign_reporter(&self, report_id: Uuid, reported_by: &str) -> Result<ReportDocument> {
        let (doc, _) = self
            .transact(report_id, |lifecycle, doc, _| {
                lifecycle.assign_reporter(doc, reported_by)
            })
            .await?;
        Ok(doc)
    }

    /// 终审报告
    pub async fn finalize(&self, report_id: Uuid, approved_by: &str) -> Result<ReportDocument> {
        let (doc, _) = self
            .transact(report_id, |lifecycle, doc, _| lifecycle.finalize(doc, approved_by))
            .await?;
        Ok(doc)
    }

    /// 打开补充报告
    pub async fn open_addendum(&self, report_id: Uuid, created_by: &str) -> Result<AddendumRecord> {
        let (_, record) = self
            .transact(report_id, |lifecycle, doc, open| {
                if let Some(existing) = open.as_ref() {
                    return Err(PacsError::InvalidState(format!(
                        "addendum {} is already open for report {}",
                        existing.id, doc.id
                    )));
                }
                let record = lifecycle.open_addendum(doc, created_by)?;
                *open = Some(record.clone());
                Ok(record)
            })
            .await?;
        Ok(record)
    }

    /// 确认补充报告理由
    pub async fn confirm_addendum_reason(&self, report_id: Uuid, reason: &str) -> Result<AddendumRecord> {
        let (_, record) = self
            .transact(report_id, |lifecycle, doc, open| {
                let record = open.as_mut().ok_or_else(|| {
                    PacsError::InvalidState(format!("report {} has no open addendum", doc.id))
                })?;
                lifecycle.confirm_addendum_reason(record, reason)?;
                Ok(record.clone())
            })
            .await?;
        Ok(record)
    }

    /// 保存补充报告
    pub async fn save_addendum(&self, report_id: Uuid) -> Result<ReportDocument> {
        let (doc, _) = self
            .transact(report_id, |lifecycle, doc, open| {
                let record = open.as_ref().ok_or_else(|| {
                    PacsError::InvalidState(format!("report {} has no open addendum", doc.id))
                })?;
                lifecycle.save_addendum(doc, record)?;
                *open = None;
                Ok(())
            })
            .await?;
        Ok(doc)
    }

    /// 在报告级互斥锁内：加载、执行转换、保存
    ///
    /// 转换失败时不保存，已持久化的报告保持不变。
    async fn transact<T>(
        &self,
        report_id: Uuid,
        op: impl FnOnce(&ReportLifecycle, &mut ReportDocument, &mut Option<AddendumRecord>) -> Result<T>,
    ) -> Result<(ReportDocument, T)> {
        let lock = self.report_lock(report_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.transact_locked(report_id, op).await
        };
        self.release_report_lock(report_id, lock).await;
        result
    }

    async fn transact_locked<T>(
        &self,
        report_id: Uuid,
        op: impl FnOnce(&ReportLifecycle, &mut ReportDocument, &mut Option<AddendumRecord>) -> Result<T>,
    ) -> Result<(ReportDocument, T)> {
        let mut doc = self
            .repository
            .load(report_id)
            .await?
            .ok_or_else(|| PacsError::NotFound(format!("Report {} not found", report_id)))?;
        let mut open = self.repository.open_addendum_for(report_id).await?;

        let previous = doc.status;
        let output = op(&self.lifecycle, &mut doc, &mut open)?;

        self.repository.save(&doc, open.as_ref()).await?;
        if previous != doc.status {
            info!("Report {} status updated from {} to {}", report_id, previous, doc.status);
        }

        Ok((doc, output))
    }

    async fn report_lock(&self, report_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.report_locks.lock().await;
        locks.entry(report_id).or_default().clone()
    }

    /// 没有其他等待者时移除报告锁
    async fn release_report_lock(&self, report_id: Uuid, lock: Arc<Mutex<()>>) {
        let mut locks = self.report_locks.lock().await;
        // 映射表自身持有一份，加上这里的一份
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&report_id);
        }
    }

    #[cfg(test)]
    async fn held_lock_count(&self) -> usize {
        self.report_locks.lock().await.len()
    }
}
