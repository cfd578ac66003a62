//! 通用工具函数

use chrono::NaiveDateTime;
use html2text::render::text_renderer::TrivialDecorator;

/// 合并连续空白并去掉首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 判断字段是否为空（仅包含空白）
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// 富文本转换时的行宽，足够大以免 html2text 自行折行
const PLAIN_TEXT_WIDTH: usize = 1 << 16;

/// 将编辑器产生的富文本转换为用于测量和绘制的纯文本
///
/// 由 html2text 解析标签与实体，块级元素和 `<br>` 产生换行。
/// 每行内部空白合并，空行去掉。
pub fn rich_text_to_plain(rich: &str) -> String {
    let rendered = html2text::from_read_with_decorator(
        rich.as_bytes(),
        PLAIN_TEXT_WIDTH,
        TrivialDecorator::new(),
    );

    rendered
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 表头中日期时间的显示格式
pub fn format_date_time(value: Option<&NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| crate::models::NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \t b\n c  "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
        assert!(is_blank(" \n"));
        assert!(!is_blank(" x "));
    }

    #[test]
    fn test_rich_text_to_plain() {
        let rich = "<p>No acute <b>findings</b>.</p><p>Lungs&nbsp;clear<br/>Heart normal</p>";
        assert_eq!(
            rich_text_to_plain(rich),
            "No acute findings.\nLungs clear\nHeart normal"
        );
        assert_eq!(rich_text_to_plain("plain text"), "plain text");
        assert_eq!(rich_text_to_plain("a &lt; b &amp;&amp; c"), "a < b && c");
        assert_eq!(rich_text_to_plain("<p></p>"), "");
    }

    #[test]
    fn test_rich_text_keeps_comparison_signs() {
        let body = "Nodule < 5 mm in RUL, previously > 3 mm. Follow-up advised.";
        assert_eq!(rich_text_to_plain(body), body);
        assert_eq!(
            rich_text_to_plain("<p>Size <b>&lt; 5 mm</b></p>"),
            "Size < 5 mm"
        );
    }

    #[test]
    fn test_rich_text_decodes_entities() {
        assert_eq!(
            rich_text_to_plain("<p>T&#233;l&eacute; 5&#8201;mm</p>"),
            "Télé 5 mm"
        );
        assert_eq!(rich_text_to_plain("caf&#xE9; &copy;"), "café ©");
    }

    #[test]
    fn test_format_date_time() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 0)
            .unwrap();
        assert_eq!(format_date_time(Some(&dt)), "2024-03-05 09:07");
        assert_eq!(format_date_time(None), "N/A");
    }
}
