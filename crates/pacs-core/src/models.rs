//! 核心数据模型定义

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 无法恢复的字段占位值
pub const NOT_AVAILABLE: &str = "N/A";

/// 性别
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Gender {
    M,
    F,
    O,
    #[default]
    Unknown,
}

impl Gender {
    /// 解析单字母性别代码（不区分大小写）
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "M" => Some(Gender::M),
            "F" => Some(Gender::F),
            "O" => Some(Gender::O),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
            Gender::O => "O",
            Gender::Unknown => NOT_AVAILABLE,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 规范化后的患者身份（每次渲染时派生，不直接持久化）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientIdentity {
    pub name: String,
    pub age: String,
    pub gender: Gender,
}

impl PatientIdentity {
    pub fn unknown() -> Self {
        Self {
            name: NOT_AVAILABLE.to_string(),
            age: NOT_AVAILABLE.to_string(),
            gender: Gender::Unknown,
        }
    }

    /// 表头“年龄/性别”单元格的文本
    pub fn age_gender_label(&self) -> String {
        format!("{} / {}", self.age, self.gender)
    }
}

impl Default for PatientIdentity {
    fn default() -> Self {
        Self::unknown()
    }
}

/// 检查信息（表头字段）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudyFields {
    pub id: String,                               // Study Instance UID
    pub accession_number: String,                 // 检查号
    pub study_date_time: Option<NaiveDateTime>,   // 检查时间
    pub modality: String,                         // CT, MR, DR等
    pub body_part: String,                        // 检查部位
    pub referring_doctor: String,                 // 申请医生
}

/// 报告叙述段落
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    History,
    Findings,
    Conclusion,
}

impl SectionKind {
    /// 版面中的固定顺序
    pub const ALL: [SectionKind; 3] = [
        SectionKind::History,
        SectionKind::Findings,
        SectionKind::Conclusion,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::History => "History",
            SectionKind::Findings => "Findings",
            SectionKind::Conclusion => "Conclusion",
        }
    }
}

/// 报告正文（富文本）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSections {
    pub history: String,
    pub findings: String,
    pub conclusion: String,
}

impl ReportSections {
    pub fn new(
        history: impl Into<String>,
        findings: impl Into<String>,
        conclusion: impl Into<String>,
    ) -> Self {
        Self {
            history: history.into(),
            findings: findings.into(),
            conclusion: conclusion.into(),
        }
    }

    pub fn get(&self, kind: SectionKind) -> &str {
        match kind {
            SectionKind::History => &self.history,
            SectionKind::Findings => &self.findings,
            SectionKind::Conclusion => &self.conclusion,
        }
    }
}

/// 关键图像引用，列表顺序即版面顺序
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRef {
    pub path: String,
    pub index: usize,
}

/// 报告状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportStatus {
    Draft,           // 草稿
    Final,           // 已审核
    AddendumPending, // 补充报告编辑中
    Addendum,        // 补充报告已保存
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportStatus::Draft => "Draft",
            ReportStatus::Final => "Final",
            ReportStatus::AddendumPending => "AddendumPending",
            ReportStatus::Addendum => "Addendum",
        };
        f.write_str(s)
    }
}

/// 补充报告记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddendumRecord {
    pub id: Uuid,
    pub parent_report_id: Uuid,
    /// 确认后不可修改
    pub reason: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// 打开补充报告时冻结的终审内容
    pub base_sections: ReportSections,
}

impl AddendumRecord {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

/// 可渲染的内容版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentVersion {
    /// 当前（可能已被补充报告修改）的内容
    Current,
    /// 终审时冻结的内容；尚未终审时等同于当前内容
    Original,
}

/// 报告文档
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportDocument {
    pub id: Uuid,
    #[serde(default)]
    pub patient_identity: PatientIdentity,
    pub study: StudyFields,
    #[serde(default)]
    pub sections: ReportSections,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub reported_by: String,
    #[serde(default)]
    pub approved_by: String,
    pub status: ReportStatus,
    #[serde(default)]
    pub addendum: Option<AddendumRecord>,
    #[serde(default)]
    pub original_sections: Option<ReportSections>,
    #[serde(default)]
    pub reported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportDocument {
    /// 创建新的草稿
    pub fn new_draft(study: StudyFields) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            patient_identity: PatientIdentity::unknown(),
            study,
            sections: ReportSections::default(),
            images: Vec::new(),
            reported_by: String::new(),
            approved_by: String::new(),
            status: ReportStatus::Draft,
            addendum: None,
            original_sections: None,
            reported_at: None,
            finalized_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_patient(mut self, identity: PatientIdentity) -> Self {
        self.patient_identity = identity;
        self
    }

    /// 获取指定版本的可渲染内容
    pub fn content(&self, version: ContentVersion) -> &ReportSections {
        match version {
            ContentVersion::Current => &self.sections,
            ContentVersion::Original => self.original_sections.as_ref().unwrap_or(&self.sections),
        }
    }

    /// 已确认的补充报告（用于版面中的补充报告区块）
    pub fn confirmed_addendum(&self) -> Option<&AddendumRecord> {
        self.addendum.as_ref().filter(|record| record.is_confirmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_code("m"), Some(Gender::M));
        assert_eq!(Gender::from_code(" F "), Some(Gender::F));
        assert_eq!(Gender::from_code("o"), Some(Gender::O));
        assert_eq!(Gender::from_code("X"), None);
        assert_eq!(Gender::Unknown.to_string(), "N/A");
    }

    #[test]
    fn test_content_versions() {
        let mut doc = ReportDocument::new_draft(StudyFields::default());
        doc.sections = ReportSections::new("H", "F", "C");
        assert_eq!(doc.content(ContentVersion::Original), &doc.sections);

        doc.original_sections = Some(doc.sections.clone());
        doc.sections.findings = "F2".to_string();
        assert_eq!(doc.content(ContentVersion::Original).findings, "F");
        assert_eq!(doc.content(ContentVersion::Current).findings, "F2");
    }

    #[test]
    fn test_document_json_defaults() {
        let json = r#"{
            "id": "6f1c2b7e-8a55-4f43-9a57-0e6d6c3b2a11",
            "study": {
                "id": "1.2.3",
                "accession_number": "A1",
                "study_date_time": null,
                "modality": "CT",
                "body_part": "CHEST",
                "referring_doctor": "Dr. Y"
            },
            "status": "Draft",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let doc: ReportDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.patient_identity, PatientIdentity::unknown());
        assert!(doc.images.is_empty());
        assert!(doc.confirmed_addendum().is_none());
    }
}
