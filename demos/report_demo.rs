//! 报告引擎演示程序
//!
//! 创建草稿、终审、打开并保存补充报告，最后输出两个版本的分页结果。

use pacs_reporting::pacs_admin::{init_logging, LoggingConfig};
use pacs_reporting::pacs_core::{ContentVersion, RawPatientFields, ReportSections, StudyFields};
use pacs_reporting::pacs_layout::{
    BlockKind, CachedMeasurer, FixedLineMeasurer, LayoutConfig, LayoutEngine, PageSpec,
};
use pacs_reporting::pacs_workflow::InMemoryReportRepository;
use pacs_reporting::ReportingService;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LoggingConfig::default())?;

    let layout = LayoutEngine::new(LayoutConfig::default())
        .with_measurer(Arc::new(CachedMeasurer::new(FixedLineMeasurer::default())));
    let service = ReportingService::new(
        Arc::new(InMemoryReportRepository::new()),
        layout,
        PageSpec::default(),
    );
    let workflow = service.workflow();

    println!("PACS 报告引擎演示\n");

    // 1. 草稿
    let draft = workflow
        .create_draft(StudyFields {
            id: "1.2.840.113619.2.55.3.604688119".to_string(),
            accession_number: "ACC-20240315-001".to_string(),
            modality: "CT".to_string(),
            body_part: "Chest".to_string(),
            referring_doctor: "WANG LEI".to_string(),
            ..StudyFields::default()
        })
        .await?;
    workflow
        .save_sections(
            draft.id,
            ReportSections::new(
                "<p>Cough for two weeks.</p>",
                "<p>Patchy consolidation in the right lower lobe.<br>No pleural effusion.</p>",
                "<p>Right lower lobe pneumonia.</p>",
            ),
        )
        .await?;
    for i in 0..4 {
        workflow
            .attach_image(draft.id, format!("reports/{}/key-{}.png", draft.id, i))
            .await?;
    }
    workflow.assign_reporter(draft.id, "Dr. Chen").await?;
    println!("草稿已创建: {}", draft.id);

    // 2. 终审
    let finalized = workflow.finalize(draft.id, "Dr. Li").await?;
    println!("报告状态: {}", finalized.status);

    // 3. 补充报告
    workflow.open_addendum(draft.id, "Dr. Li").await?;
    workflow
        .confirm_addendum_reason(draft.id, "Follow-up CT received for comparison")
        .await?;
    workflow
        .save_sections(
            draft.id,
            ReportSections::new(
                "<p>Cough for two weeks.</p>",
                "<p>Consolidation partially resolved on follow-up.</p>",
                "<p>Improving right lower lobe pneumonia.</p>",
            ),
        )
        .await?;
    let addended = workflow.save_addendum(draft.id).await?;
    println!("报告状态: {}", addended.status);

    // 4. 排版
    let raw_patient = RawPatientFields {
        name: "ZHANG^SAN^067Y/M".to_string(),
        age: None,
        sex: None,
    };
    for version in [ContentVersion::Current, ContentVersion::Original] {
        let plan = service.print(draft.id, &raw_patient, version).await?;
        println!(
            "\n{:?}: {} 页, {} 个版面块, {} 个超出页面",
            version,
            plan.page_count,
            plan.blocks.len(),
            plan.overflowing().len()
        );
        for block in plan.blocks.iter().filter(|b| b.kind != BlockKind::Image) {
            println!(
                "  p{} {:<14} y={:>6.1} h={:>6.1}",
                block.page,
                format!("{:?}", block.kind),
                block.y,
                block.height
            );
        }
    }

    Ok(())
}
