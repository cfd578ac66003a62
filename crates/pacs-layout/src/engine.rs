//! 分页引擎
//!
//! 单次前向排版：游标 `y` 从第一页上边距开始，依次放置表头行、标题、
//! 叙述段落、关键图像、补充报告和签名。引擎从不因内容放不下而报错，
//! 只会产生可能越界的版面块。
//!
//! 换页规则：
//! - 段落标题放置前，若 `y + 标题高度 > page_break_threshold` 则换页；
//!   正文紧跟标题放在同一页，不单独检查（过长的正文由渲染器裁切）。
//! - 图像区标题使用更低的 `image_grid_threshold`；图像网格内部不检查换页。
//! - 恰好等于阈值时不换页。
//!
//! 签名固定锚定在当前页内容区底部，不参与流式排版，
//! 正文过长时可能与签名重叠。

use crate::measure::TextMeasurer;
use crate::page::{BlockContent, BlockKind, HeaderCell, LayoutConfig, LayoutPlan, Page, PageBlock, PageSpec};
use pacs_core::utils::{collapse_whitespace, format_date_time, is_blank, rich_text_to_plain};
use pacs_core::{PacsError, ReportDocument, Result, SectionKind, NOT_AVAILABLE};
use std::sync::Arc;
use tracing::debug;

/// 排版引擎
///
/// 测量能力由外部注入；未注入时排版直接返回 `Precondition` 错误。
#[derive(Clone, Default)]
pub struct LayoutEngine {
    measurer: Option<Arc<dyn TextMeasurer>>,
    config: LayoutConfig,
}

impl std::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("has_measurer", &self.measurer.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl LayoutEngine {
    /// 创建新的排版引擎
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            measurer: None,
            config,
        }
    }

    /// 注入测量能力
    pub fn with_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = Some(measurer);
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// 对报告快照排版
    pub fn layout(&self, doc: &ReportDocument, page_spec: &PageSpec) -> Result<LayoutPlan> {
        let measurer = self.measurer.as_deref().ok_or_else(|| {
            PacsError::Precondition("text measurer is required for layout".to_string())
        })?;
        page_spec.validate()?;

        Ok(layout(doc, measurer, page_spec, &self.config))
    }
}

/// 排版核心过程
pub fn layout(
    doc: &ReportDocument,
    measurer: &dyn TextMeasurer,
    page_spec: &PageSpec,
    config: &LayoutConfig,
) -> LayoutPlan {
    let mut pass = LayoutPass::new(measurer, page_spec, config);

    pass.header_rows(doc);
    pass.title(doc);
    pass.sections(doc);
    pass.image_grid(doc);
    pass.addendum(doc);
    pass.signatures(doc);

    let plan = pass.finish();
    debug!(
        "Report {} laid out: {} pages, {} blocks, {} overflowing",
        doc.id,
        plan.page_count,
        plan.blocks.len(),
        plan.overflowing().len()
    );
    plan
}

struct LayoutPass<'a> {
    measurer: &'a dyn TextMeasurer,
    page_spec: &'a PageSpec,
    config: &'a LayoutConfig,
    page: Page,
    blocks: Vec<PageBlock>,
}

impl<'a> LayoutPass<'a> {
    fn new(measurer: &'a dyn TextMeasurer, page_spec: &'a PageSpec, config: &'a LayoutConfig) -> Self {
        Self {
            measurer,
            page_spec,
            config,
            page: Page {
                index: 0,
                cursor_y: page_spec.margin_top,
            },
            blocks: Vec::new(),
        }
    }

    fn content_width(&self) -> f32 {
        self.page_spec.content_width()
    }

    fn left(&self) -> f32 {
        self.page_spec.margin_left
    }

    /// 在当前游标处放置一个块（不移动游标）
    fn place(&mut self, kind: BlockKind, x: f32, width: f32, height: f32, content: BlockContent) {
        self.blocks.push(PageBlock {
            kind,
            x,
            y: self.page.cursor_y,
            width,
            height,
            page: self.page.index,
            content,
        });
    }

    /// 放置一个占满内容宽度的块并把游标移到其下方
    fn flow(&mut self, kind: BlockKind, height: f32, content: BlockContent) {
        let (x, width) = (self.left(), self.content_width());
        self.place(kind, x, width, height, content);
        self.page.cursor_y += height;
    }

    fn break_page(&mut self) {
        self.page = Page {
            index: self.page.index + 1,
            cursor_y: self.page_spec.margin_top,
        };
        debug!("Page break, now on page {}", self.page.index);
    }

    /// 放置高度为 `height` 的块前检查阈值，超出则换页
    fn break_if_exceeds(&mut self, height: f32, threshold: f32) {
        if self.page.cursor_y + height > threshold {
            self.break_page();
        }
    }

    fn header_rows(&mut self, doc: &ReportDocument) {
        let identity = &doc.patient_identity;
        let study = &doc.study;
        let reported_at = doc.reported_at.map(|dt| dt.naive_utc());

        let rows = [
            [
                ("Patient Name", identity.name.clone()),
                ("Age / Gender", identity.age_gender_label()),
                ("ID", study.id.clone()),
            ],
            [
                ("Study Date", format_date_time(study.study_date_time.as_ref())),
                ("Referring Doctor", study.referring_doctor.clone()),
                ("Accession No.", study.accession_number.clone()),
            ],
            [
                ("Reported Date", format_date_time(reported_at.as_ref())),
                ("Modality", study.modality.clone()),
                ("Body Part", study.body_part.clone()),
            ],
        ];

        let column_width = self.content_width() / 3.0;
        let inner_width = (column_width - 2.0 * self.config.cell_inset).max(1.0);

        let measured: Vec<(f32, Vec<HeaderCell>)> = rows
            .into_iter()
            .map(|row| {
                let cells: Vec<HeaderCell> = row
                    .into_iter()
                    .map(|(label, value)| HeaderCell {
                        label: label.to_string(),
                        value: or_not_available(&value),
                    })
                    .collect();
                let height = self.row_height(&cells, inner_width);
                (height, cells)
            })
            .collect();

        let table_height = measured.iter().map(|(height, _)| height).sum();
        let (x, width) = (self.left(), self.content_width());
        self.place(BlockKind::Header, x, width, table_height, BlockContent::None);

        for (height, cells) in measured {
            self.flow(BlockKind::Row, height, BlockContent::Cells(cells));
        }
    }

    /// 行高：各单元格 `max(14, 测量高度 + 14)` 的最大值，且不低于 24
    fn row_height(&self, cells: &[HeaderCell], inner_width: f32) -> f32 {
        cells
            .iter()
            .map(|cell| {
                let measured = self
                    .measurer
                    .measure(&cell.value, inner_width, &self.config.value_font);
                (measured + self.config.cell_padding).max(self.config.cell_min_height)
            })
            .fold(self.config.row_min_height, f32::max)
    }

    fn title(&mut self, doc: &ReportDocument) {
        let text = collapse_whitespace(&format!(
            "{} {} REPORT",
            doc.study.modality, doc.study.body_part
        ))
        .to_uppercase();

        self.page.cursor_y += self.config.title_gap;
        self.flow(BlockKind::Title, self.config.title_height, BlockContent::Text(text));
        self.page.cursor_y += self.config.title_after_gap;
    }

    fn sections(&mut self, doc: &ReportDocument) {
        let label_height = self.config.section_label_height;

        for kind in SectionKind::ALL {
            self.break_if_exceeds(label_height, self.config.page_break_threshold);
            self.flow(
                BlockKind::SectionTitle,
                label_height,
                BlockContent::Text(kind.label().to_string()),
            );

            let body = rich_text_to_plain(doc.sections.get(kind));
            let body_height =
                self.measurer
                    .measure(&body, self.content_width(), &self.config.body_font);
            self.flow(BlockKind::SectionBody, body_height, BlockContent::Text(body));
            self.page.cursor_y += self.config.section_gap;
        }
    }

    fn image_grid(&mut self, doc: &ReportDocument) {
        if doc.images.is_empty() {
            return;
        }

        let title_height = self.config.image_grid_title_height;
        self.break_if_exceeds(title_height, self.config.image_grid_threshold);
        self.flow(
            BlockKind::ImageGrid,
            title_height,
            BlockContent::Text("Key Images".to_string()),
        );

        let per_row = self.config.images_per_row.max(1);
        let size = self.config.thumbnail_size;
        let mut x = self.left();

        for (i, image) in doc.images.iter().enumerate() {
            if i > 0 && i % per_row == 0 {
                self.page.cursor_y += self.config.image_row_pitch;
                x = self.left();
            }
            self.place(
                BlockKind::Image,
                x,
                size,
                size,
                BlockContent::Image {
                    path: image.path.clone(),
                    index: image.index,
                },
            );
            x += self.config.image_pitch;
        }

        self.page.cursor_y += self.config.image_row_pitch;
    }

    fn addendum(&mut self, doc: &ReportDocument) {
        let Some(record) = doc.confirmed_addendum() else {
            return;
        };

        self.flow(BlockKind::Divider, self.config.divider_height, BlockContent::None);
        self.page.cursor_y += self.config.section_gap;
        if self.config.addendum_on_new_page {
            self.break_page();
        }

        let padding = self.config.addendum_padding;
        let reason_height = self.measurer.measure(
            &record.reason,
            (self.content_width() - 2.0 * padding).max(1.0),
            &self.config.body_font,
        );
        let height = self.config.addendum_title_height + reason_height + 2.0 * padding;

        self.flow(
            BlockKind::AddendumBanner,
            height,
            BlockContent::Addendum {
                reason: record.reason.clone(),
                created_by: record.created_by.clone(),
                confirmed_at: record.confirmed_at,
            },
        );
        self.page.cursor_y += self.config.section_gap;
    }

    /// 签名固定在当前页内容区底部，不移动游标
    fn signatures(&mut self, doc: &ReportDocument) {
        let anchor_y = self.page_spec.content_bottom() - self.config.signature_height;
        let half = self.content_width() / 2.0;
        let left = self.left();
        let flow_y = self.page.cursor_y;

        self.page.cursor_y = anchor_y;
        for (i, (role, name)) in [
            ("Reported By", &doc.reported_by),
            ("Approved By", &doc.approved_by),
        ]
        .into_iter()
        .enumerate()
        {
            self.place(
                BlockKind::Signatures,
                left + half * i as f32,
                half,
                self.config.signature_height,
                BlockContent::Signature {
                    role: role.to_string(),
                    name: name.trim().to_string(),
                },
            );
        }
        self.page.cursor_y = flow_y;
    }

    fn finish(self) -> LayoutPlan {
        LayoutPlan {
            page_spec: self.page_spec.clone(),
            page_count: self.page.index + 1,
            blocks: self.blocks,
        }
    }
}

fn or_not_available(value: &str) -> String {
    if is_blank(value) {
        NOT_AVAILABLE.to_string()
    } else {
        collapse_whitespace(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{CachedMeasurer, FixedLineMeasurer, FontSpec};
    use chrono::Utc;
    use pacs_core::{
        AddendumRecord, ImageRef, PatientIdentity, ReportSections, ReportStatus, StudyFields,
    };
    use std::collections::HashMap;

    /// 按文本返回预设高度，其余文本高度固定
    struct TableMeasurer {
        heights: HashMap<String, f32>,
        default: f32,
    }

    impl TableMeasurer {
        fn uniform(default: f32) -> Self {
            Self {
                heights: HashMap::new(),
                default,
            }
        }

        fn with(mut self, text: &str, height: f32) -> Self {
            self.heights.insert(text.to_string(), height);
            self
        }
    }

    impl TextMeasurer for TableMeasurer {
        fn measure(&self, text: &str, _max_width: f32, _font: &FontSpec) -> f32 {
            self.heights.get(text).copied().unwrap_or(self.default)
        }
    }

    fn document(sections: ReportSections, images: usize) -> ReportDocument {
        let mut doc = ReportDocument::new_draft(StudyFields {
            id: "1.2.3".to_string(),
            accession_number: "ACC-1".to_string(),
            study_date_time: None,
            modality: "ct".to_string(),
            body_part: "chest".to_string(),
            referring_doctor: "Dr. Referrer".to_string(),
        })
        .with_patient(PatientIdentity {
            name: "DOE JOHN".to_string(),
            age: "45".to_string(),
            gender: pacs_core::Gender::M,
        });
        doc.sections = sections;
        doc.images = (0..images)
            .map(|index| ImageRef {
                path: format!("img/{}.png", index),
                index,
            })
            .collect();
        doc.reported_by = "Dr. R".to_string();
        doc.approved_by = "Dr. X".to_string();
        doc
    }

    fn run(doc: &ReportDocument, measurer: &dyn TextMeasurer) -> LayoutPlan {
        layout(doc, measurer, &PageSpec::default(), &LayoutConfig::default())
    }

    fn kinds(plan: &LayoutPlan, kind: BlockKind) -> Vec<&PageBlock> {
        plan.blocks_of_kind(kind).collect()
    }

    #[test]
    fn test_missing_measurer_is_precondition_error() {
        let engine = LayoutEngine::new(LayoutConfig::default());
        let doc = document(ReportSections::new("H", "F", "C"), 0);

        let err = engine.layout(&doc, &PageSpec::default()).unwrap_err();
        assert!(matches!(err, PacsError::Precondition(_)));

        let engine = engine.with_measurer(Arc::new(FixedLineMeasurer::default()));
        assert!(engine.layout(&doc, &PageSpec::default()).is_ok());
    }

    #[test]
    fn test_header_rows_use_floor() {
        let doc = document(ReportSections::new("H", "F", "C"), 0);
        let plan = run(&doc, &TableMeasurer::uniform(5.0));

        let rows = kinds(&plan, BlockKind::Row);
        assert_eq!(rows.len(), 3);
        // max(14, 5 + 14) = 19 低于 24
        assert!(rows.iter().all(|row| row.height == 24.0));
        assert_eq!(rows[0].y, 40.0);
        assert_eq!(rows[1].y, 64.0);
        assert_eq!(rows[2].y, 88.0);

        let header = kinds(&plan, BlockKind::Header);
        assert_eq!(header[0].height, 72.0);
    }

    #[test]
    fn test_header_row_grows_with_tall_value() {
        let doc = document(ReportSections::new("H", "F", "C"), 0);
        let measurer = TableMeasurer::uniform(5.0).with("Dr. Referrer", 31.5);
        let plan = run(&doc, &measurer);

        let rows = kinds(&plan, BlockKind::Row);
        assert_eq!(rows[0].height, 24.0);
        assert_eq!(rows[1].height, 45.5);
        assert_eq!(rows[2].y, 40.0 + 24.0 + 45.5);
    }

    #[test]
    fn test_title_follows_header_with_gap() {
        let doc = document(ReportSections::new("H", "F", "C"), 0);
        let plan = run(&doc, &TableMeasurer::uniform(0.0));

        let title = kinds(&plan, BlockKind::Title)[0];
        assert_eq!(title.y, 40.0 + 72.0 + 20.0);
        assert_eq!(title.content, BlockContent::Text("CT CHEST REPORT".to_string()));
    }

    #[test]
    fn test_sections_in_order_on_first_page() {
        let doc = document(ReportSections::new("<p>H</p>", "F", "C"), 0);
        let plan = run(&doc, &TableMeasurer::uniform(14.0));

        let titles: Vec<_> = kinds(&plan, BlockKind::SectionTitle)
            .into_iter()
            .map(|b| b.content.clone())
            .collect();
        assert_eq!(
            titles,
            vec![
                BlockContent::Text("History".to_string()),
                BlockContent::Text("Findings".to_string()),
                BlockContent::Text("Conclusion".to_string()),
            ]
        );

        let bodies = kinds(&plan, BlockKind::SectionBody);
        assert_eq!(bodies[0].content, BlockContent::Text("H".to_string()));
        assert!(bodies.iter().all(|b| b.page == 0));
        assert_eq!(plan.page_count, 1);
    }

    #[test]
    fn test_section_label_breaks_page_past_threshold() {
        // 标题块之后 y = 40 + 72 + 20 + 24 + 16 = 172
        // History: 标签 172..190，正文 500 → 690，加间距 702
        // Findings 标签 702 + 18 > 700 → 换页
        let doc = document(ReportSections::new("H", "F", "C"), 0);
        let measurer = TableMeasurer::uniform(0.0).with("H", 500.0);
        let plan = run(&doc, &measurer);

        let titles = kinds(&plan, BlockKind::SectionTitle);
        assert_eq!(titles[0].page, 0);
        assert_eq!(titles[1].page, 1);
        assert_eq!(titles[1].y, 40.0);
        assert_eq!(titles[2].page, 1);
        assert_eq!(plan.page_count, 2);
    }

    #[test]
    fn test_section_label_exactly_at_threshold_stays() {
        // History 正文 480：结束 670，加间距 682；682 + 18 = 700 恰好等于阈值
        let doc = document(ReportSections::new("H", "F", "C"), 0);
        let measurer = TableMeasurer::uniform(0.0).with("H", 480.0);
        let plan = run(&doc, &measurer);

        let findings = kinds(&plan, BlockKind::SectionTitle)[1];
        assert_eq!(findings.y, 682.0);
        assert_eq!(findings.page, 0);
    }

    #[test]
    fn test_long_body_follows_label_without_break() {
        let doc = document(ReportSections::new("H", "F", "C"), 0);
        let measurer = TableMeasurer::uniform(0.0).with("H", 2000.0);
        let plan = run(&doc, &measurer);

        let history_body = kinds(&plan, BlockKind::SectionBody)[0];
        assert_eq!(history_body.page, 0);
        assert_eq!(history_body.y, 190.0);
        assert!(plan.overflowing().contains(&history_body));
    }

    #[test]
    fn test_image_grid_rows_of_three() {
        let doc = document(ReportSections::new("H", "F", "C"), 7);
        let plan = run(&doc, &TableMeasurer::uniform(0.0));

        let grid = kinds(&plan, BlockKind::ImageGrid)[0];
        let images = kinds(&plan, BlockKind::Image);
        assert_eq!(images.len(), 7);

        let first_row_y = grid.y + grid.height;
        let expected_rows = [0, 0, 0, 1, 1, 1, 2];
        let expected_cols = [0, 1, 2, 0, 1, 2, 0];
        for (i, image) in images.iter().enumerate() {
            assert_eq!(image.y, first_row_y + 170.0 * expected_rows[i] as f32);
            assert_eq!(image.x, 40.0 + 170.0 * expected_cols[i] as f32);
            assert_eq!(image.width, 150.0);
            assert_eq!(image.content, BlockContent::Image { path: format!("img/{}.png", i), index: i });
        }
    }

    #[test]
    fn test_image_grid_breaks_on_lower_threshold() {
        // 段落结束后 y = 172 + 3 * (18 + 12) + 360 = 622 > 550
        let doc = document(ReportSections::new("H", "F", "C"), 4);
        let measurer = TableMeasurer::uniform(0.0).with("C", 360.0);
        let plan = run(&doc, &measurer);

        let grid = kinds(&plan, BlockKind::ImageGrid)[0];
        assert_eq!(grid.page, 1);
        assert_eq!(grid.y, 40.0);
        assert!(kinds(&plan, BlockKind::Image).iter().all(|b| b.page == 1));
    }

    #[test]
    fn test_image_grid_runs_off_page_without_break() {
        let doc = document(ReportSections::new("H", "F", "C"), 12);
        let plan = run(&doc, &TableMeasurer::uniform(0.0));

        let images = kinds(&plan, BlockKind::Image);
        assert!(images.iter().all(|b| b.page == 0));
        assert!(!plan.overflowing().is_empty());
    }

    #[test]
    fn test_no_images_no_grid() {
        let doc = document(ReportSections::new("H", "F", "C"), 0);
        let plan = run(&doc, &TableMeasurer::uniform(0.0));
        assert!(kinds(&plan, BlockKind::ImageGrid).is_empty());
        assert!(kinds(&plan, BlockKind::Image).is_empty());
    }

    fn with_addendum(mut doc: ReportDocument, confirmed: bool) -> ReportDocument {
        doc.status = ReportStatus::Addendum;
        doc.addendum = Some(AddendumRecord {
            id: uuid::Uuid::new_v4(),
            parent_report_id: doc.id,
            reason: "Comparison with prior study".to_string(),
            confirmed_at: confirmed.then(Utc::now),
            created_by: "Dr. Y".to_string(),
            created_at: Utc::now(),
            base_sections: doc.sections.clone(),
        });
        doc
    }

    #[test]
    fn test_addendum_banner_on_new_page() {
        let doc = with_addendum(document(ReportSections::new("H", "F", "C"), 0), true);
        let measurer = TableMeasurer::uniform(0.0).with("Comparison with prior study", 14.0);
        let plan = run(&doc, &measurer);

        let divider = kinds(&plan, BlockKind::Divider)[0];
        assert_eq!(divider.page, 0);

        let banner = kinds(&plan, BlockKind::AddendumBanner)[0];
        assert_eq!(banner.page, 1);
        assert_eq!(banner.y, 40.0);
        assert_eq!(banner.height, 20.0 + 14.0 + 20.0);
        assert_eq!(plan.page_count, 2);
    }

    #[test]
    fn test_addendum_banner_inline_when_configured() {
        let doc = with_addendum(document(ReportSections::new("H", "F", "C"), 0), true);
        let config = LayoutConfig {
            addendum_on_new_page: false,
            ..LayoutConfig::default()
        };
        let plan = layout(&doc, &TableMeasurer::uniform(0.0), &PageSpec::default(), &config);

        let banner = kinds(&plan, BlockKind::AddendumBanner)[0];
        assert_eq!(banner.page, 0);
        assert_eq!(plan.page_count, 1);
    }

    #[test]
    fn test_unconfirmed_addendum_not_rendered() {
        let doc = with_addendum(document(ReportSections::new("H", "F", "C"), 0), false);
        let plan = run(&doc, &TableMeasurer::uniform(0.0));
        assert!(kinds(&plan, BlockKind::AddendumBanner).is_empty());
        assert!(kinds(&plan, BlockKind::Divider).is_empty());
    }

    #[test]
    fn test_signatures_anchored_on_last_page() {
        let doc = document(ReportSections::new("H", "F", "C"), 0);
        let measurer = TableMeasurer::uniform(0.0).with("H", 500.0);
        let plan = run(&doc, &measurer);

        let signatures = kinds(&plan, BlockKind::Signatures);
        assert_eq!(signatures.len(), 2);
        for signature in &signatures {
            assert_eq!(signature.page, 1);
            assert_eq!(signature.y, 842.0 - 100.0 - 40.0);
        }
        assert_eq!(
            signatures[1].content,
            BlockContent::Signature {
                role: "Approved By".to_string(),
                name: "Dr. X".to_string()
            }
        );
    }

    #[test]
    fn test_long_conclusion_overlaps_signatures() {
        let long = "Extensive findings. ".repeat(400);
        let doc = document(ReportSections::new("H", "F", long), 0);
        let plan = run(&doc, &FixedLineMeasurer::default());

        let conclusion = kinds(&plan, BlockKind::SectionBody)[2];
        let signatures = kinds(&plan, BlockKind::Signatures);
        assert_eq!(conclusion.page, signatures[0].page);
        assert!(signatures.iter().any(|s| s.overlaps(conclusion)));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let doc = document(ReportSections::new("<p>History of trauma</p>", "Normal", "No fracture"), 5);
        let measurer = FixedLineMeasurer::default();
        assert_eq!(run(&doc, &measurer), run(&doc, &measurer));
    }

    #[test]
    fn test_empty_header_values_use_placeholder() {
        let mut doc = document(ReportSections::new("H", "F", "C"), 0);
        doc.study.referring_doctor = "  ".to_string();
        let plan = run(&doc, &TableMeasurer::uniform(0.0));

        let row = kinds(&plan, BlockKind::Row)[1];
        let BlockContent::Cells(cells) = &row.content else {
            panic!("row without cells");
        };
        assert_eq!(cells[1].value, "N/A");
        assert_eq!(cells[0].value, "N/A");
    }

    #[test]
    fn test_concurrent_passes_share_cached_measurer() {
        let findings = "Patchy consolidation in the right lower lobe. ".repeat(40);
        let docs: Vec<ReportDocument> = (0..3)
            .map(|i| {
                document(
                    ReportSections::new(
                        format!("Cough for {} days", i + 2),
                        format!("<p>{}</p>", findings.repeat(i + 1)),
                        "Right lower lobe pneumonia.",
                    ),
                    i * 2,
                )
            })
            .collect();
        let expected: Vec<LayoutPlan> = docs
            .iter()
            .map(|doc| run(doc, &FixedLineMeasurer::default()))
            .collect();

        // 容量小于条目数，并发下同时触发淘汰
        let shared = Arc::new(CachedMeasurer::with_capacity(FixedLineMeasurer::default(), 8));
        let engine = LayoutEngine::new(LayoutConfig::default()).with_measurer(shared.clone());

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let engine = engine.clone();
                let docs = &docs;
                let expected = &expected;
                scope.spawn(move || {
                    for round in 0..20 {
                        let i = (worker + round) % docs.len();
                        let plan = engine.layout(&docs[i], &PageSpec::default()).unwrap();
                        assert_eq!(plan, expected[i]);
                    }
                });
            }
        });

        assert!(shared.cached_entries() <= 8);
    }
}
