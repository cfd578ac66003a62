//! # PACS报告排版模块
//!
//! 将结构化报告（表头、叙述段落、关键图像、签名、补充报告）排布到固定尺寸的
//! 打印页面上，输出带页码和坐标的版面块序列，由外部渲染器绘制。

pub mod compose;
pub mod engine;
pub mod measure;
pub mod page;

pub use compose::compose_for_print;
pub use engine::{layout, LayoutEngine};
pub use measure::{
    CachedMeasurer, FixedLineMeasurer, FontSpec, TextMeasurer, DEFAULT_MEASURE_CACHE_CAPACITY,
};
pub use page::{
    BlockContent, BlockKind, HeaderCell, LayoutConfig, LayoutPlan, Page, PageBlock, PageSpec,
};
