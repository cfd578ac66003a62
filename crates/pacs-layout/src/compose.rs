//! 打印快照组装

use pacs_core::{normalize_raw, ContentVersion, RawPatientFields, ReportDocument};
use tracing::debug;

/// 组装用于排版的报告快照
///
/// 在文档副本上合并规范化后的患者身份，并选取要渲染的内容版本。
/// `Original` 版本使用定稿时冻结的段落，且不带补充报告区块。
pub fn compose_for_print(
    doc: &ReportDocument,
    raw_patient: &RawPatientFields,
    version: ContentVersion,
) -> ReportDocument {
    let mut snapshot = doc.clone();
    snapshot.patient_identity = normalize_raw(raw_patient);

    if version == ContentVersion::Original {
        snapshot.sections = doc.content(ContentVersion::Original).clone();
        snapshot.addendum = None;
    }

    debug!(
        "Composed print snapshot for report {} ({:?}, {} images)",
        doc.id,
        version,
        snapshot.images.len()
    );
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pacs_core::{AddendumRecord, Gender, ReportSections, ReportStatus, StudyFields};

    fn addended_document() -> ReportDocument {
        let mut doc = ReportDocument::new_draft(StudyFields::default());
        doc.original_sections = Some(ReportSections::new("H", "F", "C"));
        doc.sections = ReportSections::new("H", "F", "C revised");
        doc.status = ReportStatus::Addendum;
        doc.addendum = Some(AddendumRecord {
            id: uuid::Uuid::new_v4(),
            parent_report_id: doc.id,
            reason: "Late comparison".to_string(),
            confirmed_at: Some(Utc::now()),
            created_by: "Dr. Y".to_string(),
            created_at: Utc::now(),
            base_sections: ReportSections::new("H", "F", "C"),
        });
        doc
    }

    fn raw() -> RawPatientFields {
        RawPatientFields {
            name: "DOE^JOHN^45Y/M".to_string(),
            age: None,
            sex: None,
        }
    }

    #[test]
    fn test_compose_merges_identity() {
        let doc = addended_document();
        let snapshot = compose_for_print(&doc, &raw(), ContentVersion::Current);

        assert_eq!(snapshot.patient_identity.name, "DOE JOHN");
        assert_eq!(snapshot.patient_identity.age, "45");
        assert_eq!(snapshot.patient_identity.gender, Gender::M);
        assert_eq!(snapshot.sections.conclusion, "C revised");
        assert!(snapshot.confirmed_addendum().is_some());

        // 原文档不受影响
        assert_eq!(doc.patient_identity.name, "N/A");
    }

    #[test]
    fn test_compose_original_version() {
        let doc = addended_document();
        let snapshot = compose_for_print(&doc, &raw(), ContentVersion::Original);

        assert_eq!(snapshot.sections.conclusion, "C");
        assert!(snapshot.addendum.is_none());
        assert_eq!(snapshot.status, ReportStatus::Addendum);
    }

    #[test]
    fn test_compose_original_of_draft_uses_current() {
        let mut doc = ReportDocument::new_draft(StudyFields::default());
        doc.sections = ReportSections::new("draft history", "", "");

        let snapshot = compose_for_print(&doc, &raw(), ContentVersion::Original);
        assert_eq!(snapshot.sections.history, "draft history");
    }
}
