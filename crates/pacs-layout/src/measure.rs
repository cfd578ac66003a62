//! 文本测量能力
//!
//! 排版引擎只需要“给定文本、宽度和字体，返回渲染高度”这一能力，
//! 具体的字形度量由外部提供。实现必须对相同输入返回相同结果。

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

/// 字体参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
    pub bold: bool,
    /// 行高倍数
    pub line_height: f32,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
            bold: false,
            line_height: 1.4,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// 单行占用的高度
    pub fn line_advance(&self) -> f32 {
        self.size * self.line_height
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new("Helvetica", 10.0)
    }
}

/// 文本测量能力
///
/// 可被多个排版过程并发调用；单次排版过程内部按顺序调用。
pub trait TextMeasurer: Send + Sync {
    /// 返回文本在 `max_width` 宽度内换行后的渲染高度
    fn measure(&self, text: &str, max_width: f32, font: &FontSpec) -> f32;
}

/// 等宽近似测量：每个字符按 `size * char_width_ratio` 计宽，按宽度折行
#[derive(Debug, Clone)]
pub struct FixedLineMeasurer {
    pub char_width_ratio: f32,
}

impl FixedLineMeasurer {
    pub fn new(char_width_ratio: f32) -> Self {
        Self { char_width_ratio }
    }

    fn chars_per_line(&self, max_width: f32, font: &FontSpec) -> usize {
        let mut advance = font.size * self.char_width_ratio;
        if font.bold {
            advance *= 1.1;
        }
        if advance <= 0.0 {
            return usize::MAX;
        }
        ((max_width / advance).floor() as usize).max(1)
    }
}

impl Default for FixedLineMeasurer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl TextMeasurer for FixedLineMeasurer {
    fn measure(&self, text: &str, max_width: f32, font: &FontSpec) -> f32 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let per_line = self.chars_per_line(max_width, font);
        let lines: usize = text
            .lines()
            .map(|line| line.chars().count().div_ceil(per_line).max(1))
            .sum();

        lines as f32 * font.line_advance()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MeasureKey {
    text: String,
    max_width: u32,
    family: String,
    size: u32,
    bold: bool,
    line_height: u32,
}

impl MeasureKey {
    fn new(text: &str, max_width: f32, font: &FontSpec) -> Self {
        Self {
            text: text.to_string(),
            max_width: max_width.to_bits(),
            family: font.family.clone(),
            size: font.size.to_bits(),
            bold: font.bold,
            line_height: font.line_height.to_bits(),
        }
    }
}

/// 缓存默认容量
pub const DEFAULT_MEASURE_CACHE_CAPACITY: usize = 4096;

/// 按插入顺序淘汰的测量缓存
#[derive(Debug)]
struct MeasureCache {
    entries: HashMap<MeasureKey, f32>,
    order: VecDeque<MeasureKey>,
    capacity: usize,
}

impl MeasureCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, key: MeasureKey, height: f32) {
        if self.entries.contains_key(&key) {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, height);
    }
}

/// 带缓存的测量器，可在多个排版过程间共享
///
/// 缓存有容量上限，满后淘汰最早写入的条目。
#[derive(Debug)]
pub struct CachedMeasurer<M> {
    inner: M,
    cache: RwLock<MeasureCache>,
}

impl<M: TextMeasurer> CachedMeasurer<M> {
    pub fn new(inner: M) -> Self {
        Self::with_capacity(inner, DEFAULT_MEASURE_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: M, capacity: usize) -> Self {
        Self {
            inner,
            cache: RwLock::new(MeasureCache::new(capacity)),
        }
    }

    /// 已缓存的条目数
    pub fn cached_entries(&self) -> usize {
        self.cache.read().map(|cache| cache.entries.len()).unwrap_or(0)
    }
}

impl<M: TextMeasurer> TextMeasurer for CachedMeasurer<M> {
    fn measure(&self, text: &str, max_width: f32, font: &FontSpec) -> f32 {
        let key = MeasureKey::new(text, max_width, font);
        if let Ok(cache) = self.cache.read() {
            if let Some(height) = cache.entries.get(&key) {
                return *height;
            }
        }

        let height = self.inner.measure(text, max_width, font);
        // 锁中毒时直接返回测量值，不缓存
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, height);
        }
        height
    }
}
