//! 患者身份规范化
//!
//! 上游系统的患者姓名字段可能以多种约定嵌入年龄和性别（`DOE^JOHN^45Y/M`、
//! `DOE JOHN 45Y/M`、独立字段等）。这里统一解析为 `{name, age, gender}`，
//! 任何输入都不会失败，最坏情况下输出 `N/A` 占位值。

use crate::models::{Gender, PatientIdentity, NOT_AVAILABLE};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// DICOM PN 组件分隔符
const COMPONENT_SEPARATOR: char = '^';

/// 规范化后姓名中不允许出现的字符
const META_CHARACTERS: [char; 2] = ['^', '='];

/// 原始性别字段中的占位默认值，视为未提供
const SEX_PLACEHOLDER: &str = "O";

/// 原始患者字段
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawPatientFields {
    pub name: String,
    pub age: Option<String>,
    pub sex: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Components,
    Inline,
    Verbatim,
}

fn combined_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(\d{1,3})Y?/([MFO])$").expect("valid regex"))
}

fn age_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(\d{1,3})Y$").expect("valid regex"))
}

fn gender_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[MFO]$").expect("valid regex"))
}

fn inline_age_gender() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d{1,3})Y?/([MFO])").expect("valid regex"))
}

/// 解析过程中逐步填充的字段
#[derive(Debug, Default)]
struct Partial {
    name: String,
    age: Option<String>,
    gender: Option<Gender>,
}

impl Partial {
    fn fill_age(&mut self, digits: &str) {
        if self.age.is_none() {
            self.age = clean_age(digits);
        }
    }

    fn fill_gender(&mut self, code: &str) {
        if self.gender.is_none() {
            self.gender = Gender::from_code(code);
        }
    }
}

/// 规范化患者身份
pub fn normalize(raw_name: &str, raw_age: Option<&str>, raw_sex: Option<&str>) -> PatientIdentity {
    let (mut partial, strategy) = if raw_name.contains(COMPONENT_SEPARATOR) {
        (parse_components(raw_name), Strategy::Components)
    } else if let Some(partial) = parse_inline(raw_name) {
        (partial, Strategy::Inline)
    } else {
        let partial = Partial {
            name: raw_name.to_string(),
            ..Partial::default()
        };
        (partial, Strategy::Verbatim)
    };

    if partial.age.is_none() {
        partial.age = raw_age.and_then(clean_age);
    }
    if partial.gender.is_none() {
        partial.gender = raw_sex.and_then(parse_raw_sex);
    }

    debug!(
        "patient identity normalized via {:?} (age: {}, gender: {})",
        strategy,
        partial.age.is_some(),
        partial.gender.is_some()
    );

    PatientIdentity {
        name: clean_name(&partial.name),
        age: partial.age.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        gender: partial.gender.unwrap_or(Gender::Unknown),
    }
}

/// 从原始字段记录规范化
pub fn normalize_raw(raw: &RawPatientFields) -> PatientIdentity {
    normalize(&raw.name, raw.age.as_deref(), raw.sex.as_deref())
}

fn parse_components(raw_name: &str) -> Partial {
    let mut partial = Partial::default();
    let mut name_tokens = Vec::new();

    for token in raw_name.split(COMPONENT_SEPARATOR).map(str::trim) {
        if token.is_empty() {
            continue;
        }
        if let Some(caps) = combined_token().captures(token) {
            partial.fill_age(&caps[1]);
            partial.fill_gender(&caps[2]);
        } else if let Some(caps) = age_token().captures(token) {
            partial.fill_age(&caps[1]);
        } else if gender_token().is_match(token) {
            partial.fill_gender(token);
        } else {
            name_tokens.push(token);
        }
    }

    partial.name = name_tokens.join(" ");
    partial
}

fn parse_inline(raw_name: &str) -> Option<Partial> {
    let caps = inline_age_gender().captures(raw_name)?;
    let matched = caps.get(0)?;

    let mut partial = Partial::default();
    partial.fill_age(&caps[1]);
    partial.fill_gender(&caps[2]);
    partial.name = format!(
        "{} {}",
        &raw_name[..matched.start()],
        &raw_name[matched.end()..]
    );
    Some(partial)
}

/// 年龄输出为十进制数字：去掉 `Y` 单位和前导零；非数字值原样保留
fn clean_age(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let digits = trimmed.trim_end_matches(['Y', 'y']);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        let stripped = digits.trim_start_matches('0');
        let age = if stripped.is_empty() { "0" } else { stripped };
        return Some(age.to_string());
    }

    Some(trimmed.to_string())
}

fn parse_raw_sex(raw: &str) -> Option<Gender> {
    let value = raw.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(SEX_PLACEHOLDER) {
        return None;
    }

    match value.to_ascii_uppercase().as_str() {
        "MALE" => Some(Gender::M),
        "FEMALE" => Some(Gender::F),
        "OTHER" => Some(Gender::O),
        code => Gender::from_code(code),
    }
}

fn clean_name(name: &str) -> String {
    let stripped: String = name
        .chars()
        .map(|c| if META_CHARACTERS.contains(&c) { ' ' } else { c })
        .collect();
    let collapsed = crate::utils::collapse_whitespace(&stripped);

    if collapsed.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        collapsed
    }
}
