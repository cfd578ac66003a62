//! 报告持久化协作者
//!
//! 引擎只依赖 `ReportRepository` trait；关系型存储的实现在引擎之外。
//! 瞬时故障由调用方重试，这里不做重试。

use async_trait::async_trait;
use pacs_core::{AddendumRecord, ReportDocument, ReportStatus, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 报告持久化接口
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// 保存报告及（可选的）未保存补充报告记录，返回报告ID
    async fn save(&self, doc: &ReportDocument, addendum: Option<&AddendumRecord>) -> Result<Uuid>;

    /// 按报告ID加载
    async fn load(&self, report_id: Uuid) -> Result<Option<ReportDocument>>;

    /// 按检查UID加载
    async fn load_by_study(&self, study_uid: &str) -> Result<Option<ReportDocument>>;

    /// 获取报告当前打开（未保存）的补充报告记录
    async fn open_addendum_for(&self, report_id: Uuid) -> Result<Option<AddendumRecord>>;
}

#[derive(Debug, Clone)]
struct StoredReport {
    document: ReportDocument,
    open_addendum: Option<AddendumRecord>,
}

/// 内存实现，用于测试和演示
#[derive(Debug, Default)]
pub struct InMemoryReportRepository {
    reports: RwLock<HashMap<Uuid, StoredReport>>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已保存的报告数量
    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn save(&self, doc: &ReportDocument, addendum: Option<&AddendumRecord>) -> Result<Uuid> {
        // 只有补充报告编辑中的报告才保留打开的记录
        let open_addendum = match doc.status {
            ReportStatus::AddendumPending => addendum.cloned(),
            _ => None,
        };

        let mut reports = self.reports.write().await;
        reports.insert(
            doc.id,
            StoredReport {
                document: doc.clone(),
                open_addendum,
            },
        );
        Ok(doc.id)
    }

    async fn load(&self, report_id: Uuid) -> Result<Option<ReportDocument>> {
        let reports = self.reports.read().await;
        Ok(reports.get(&report_id).map(|stored| stored.document.clone()))
    }

    async fn load_by_study(&self, study_uid: &str) -> Result<Option<ReportDocument>> {
        let reports = self.reports.read().await;
        Ok(reports
            .values()
            .map(|stored| &stored.document)
            .filter(|doc| doc.study.id == study_uid)
            .max_by_key(|doc| doc.updated_at)
            .cloned())
    }

    async fn open_addendum_for(&self, report_id: Uuid) -> Result<Option<AddendumRecord>> {
        let reports = self.reports.read().await;
        Ok(reports
            .get(&report_id)
            .and_then(|stored| stored.open_addendum.clone()))
    }
}
