//! 页面模板与版面块

use crate::measure::FontSpec;
use chrono::{DateTime, Utc};
use pacs_core::{PacsError, Result};
use serde::{Deserialize, Serialize};

/// 页面模板（固定纸张尺寸）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSpec {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl PageSpec {
    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// 内容区底边的纵坐标
    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin_bottom
    }

    /// 检查模板尺寸是否可用
    pub fn validate(&self) -> Result<()> {
        if self.content_width() <= 0.0 {
            return Err(PacsError::Precondition(format!(
                "page content width must be positive, got {}",
                self.content_width()
            )));
        }
        if self.content_bottom() <= self.margin_top {
            return Err(PacsError::Precondition(format!(
                "page content height must be positive, got {}",
                self.content_bottom() - self.margin_top
            )));
        }
        Ok(())
    }
}

impl Default for PageSpec {
    /// A4（单位：pt）
    fn default() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            margin_top: 40.0,
            margin_bottom: 100.0,
            margin_left: 40.0,
            margin_right: 40.0,
        }
    }
}

/// 排版常量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// 表头行的最小高度
    pub row_min_height: f32,
    /// 单元格的最小高度
    pub cell_min_height: f32,
    /// 单元格测量高度之外的留白
    pub cell_padding: f32,
    /// 单元格左右内边距
    pub cell_inset: f32,
    /// 表头与标题之间的间距
    pub title_gap: f32,
    pub title_height: f32,
    /// 标题与第一个段落之间的间距
    pub title_after_gap: f32,
    pub section_label_height: f32,
    pub section_gap: f32,
    /// 段落标题超过此纵坐标时换页
    pub page_break_threshold: f32,
    /// 图像区标题超过此纵坐标时换页
    pub image_grid_threshold: f32,
    pub image_grid_title_height: f32,
    pub thumbnail_size: f32,
    /// 同一行相邻图像的水平间距（左边到左边）
    pub image_pitch: f32,
    /// 图像行之间的垂直间距（顶边到顶边）
    pub image_row_pitch: f32,
    pub images_per_row: usize,
    pub divider_height: f32,
    pub addendum_title_height: f32,
    pub addendum_padding: f32,
    /// 补充报告区块另起一页
    pub addendum_on_new_page: bool,
    pub signature_height: f32,
    pub value_font: FontSpec,
    pub body_font: FontSpec,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_min_height: 24.0,
            cell_min_height: 14.0,
            cell_padding: 14.0,
            cell_inset: 6.0,
            title_gap: 20.0,
            title_height: 24.0,
            title_after_gap: 16.0,
            section_label_height: 18.0,
            section_gap: 12.0,
            page_break_threshold: 700.0,
            image_grid_threshold: 550.0,
            image_grid_title_height: 20.0,
            thumbnail_size: 150.0,
            image_pitch: 170.0,
            image_row_pitch: 170.0,
            images_per_row: 3,
            divider_height: 1.0,
            addendum_title_height: 20.0,
            addendum_padding: 10.0,
            addendum_on_new_page: true,
            signature_height: 40.0,
            value_font: FontSpec::new("Helvetica", 10.0),
            body_font: FontSpec::new("Helvetica", 10.0),
        }
    }
}

/// 排版过程中的当前页与游标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    /// 从 0 开始
    pub index: usize,
    pub cursor_y: f32,
}

/// 版面块类型，渲染器据此选择绘制方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// 表头表格边框
    Header,
    Row,
    Title,
    SectionTitle,
    SectionBody,
    /// 图像区标题
    ImageGrid,
    Image,
    Divider,
    AddendumBanner,
    Signatures,
}

/// 表头单元格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCell {
    pub label: String,
    pub value: String,
}

/// 版面块内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockContent {
    None,
    Text(String),
    Cells(Vec<HeaderCell>),
    Image {
        path: String,
        index: usize,
    },
    Addendum {
        reason: String,
        created_by: String,
        confirmed_at: Option<DateTime<Utc>>,
    },
    Signature {
        role: String,
        name: String,
    },
}

/// 定位后的版面块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBlock {
    pub kind: BlockKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub page: usize,
    pub content: BlockContent,
}

impl PageBlock {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// 同页且矩形相交
    pub fn overlaps(&self, other: &PageBlock) -> bool {
        self.page == other.page
            && self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// 一次排版的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPlan {
    pub page_spec: PageSpec,
    pub page_count: usize,
    pub blocks: Vec<PageBlock>,
}

impl LayoutPlan {
    pub fn blocks_on_page(&self, page: usize) -> impl Iterator<Item = &PageBlock> {
        self.blocks.iter().filter(move |block| block.page == page)
    }

    pub fn blocks_of_kind(&self, kind: BlockKind) -> impl Iterator<Item = &PageBlock> {
        self.blocks.iter().filter(move |block| block.kind == kind)
    }

    /// 超出内容区底边的块（渲染时会被裁切）
    pub fn overflowing(&self) -> Vec<&PageBlock> {
        let bottom = self.page_spec.content_bottom();
        self.blocks
            .iter()
            .filter(|block| block.bottom() > bottom)
            .collect()
    }
}
