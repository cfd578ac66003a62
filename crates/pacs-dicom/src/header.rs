//! DICOM检查头信息提取
//!
//! 只读取报告表头需要的少量标签，原样交给身份规范化处理。

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use dicom::core::value::{PrimitiveValue, Value};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{open_file, InMemDicomObject};
use pacs_core::utils::collapse_whitespace;
use pacs_core::{PacsError, RawPatientFields, Result, StudyFields};
use std::path::Path;
use tracing::{debug, error, info};

/// 报告表头所需的检查信息
#[derive(Debug, Clone, PartialEq)]
pub struct StudyHeader {
    /// 未经处理的患者字段
    pub patient: RawPatientFields,
    pub study: StudyFields,
}

impl StudyHeader {
    /// 从DICOM文件读取
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("读取DICOM检查头: {:?}", path);

        let obj = open_file(path).map_err(|e| {
            error!("DICOM文件解析失败: {:?}", e);
            PacsError::DicomParseError(format!("无法解析DICOM文件 {:?}: {}", path, e))
        })?;

        Ok(Self::from_object(&obj))
    }

    /// 从内存中的DICOM对象提取
    pub fn from_object(obj: &InMemDicomObject) -> Self {
        let patient = RawPatientFields {
            name: string_element(obj, tags::PATIENT_NAME).unwrap_or_default(),
            age: string_element(obj, tags::PATIENT_AGE),
            sex: string_element(obj, tags::PATIENT_SEX),
        };

        let study_date = string_element(obj, tags::STUDY_DATE);
        let study_time = string_element(obj, tags::STUDY_TIME);

        let study = StudyFields {
            id: string_element(obj, tags::STUDY_INSTANCE_UID).unwrap_or_default(),
            accession_number: string_element(obj, tags::ACCESSION_NUMBER).unwrap_or_default(),
            study_date_time: parse_study_date_time(study_date.as_deref(), study_time.as_deref()),
            modality: string_element(obj, tags::MODALITY).unwrap_or_default(),
            body_part: string_element(obj, tags::BODY_PART_EXAMINED).unwrap_or_default(),
            referring_doctor: string_element(obj, tags::REFERRING_PHYSICIAN_NAME)
                .map(|name| person_name_to_display(&name))
                .unwrap_or_default(),
        };

        debug!("提取检查头完成，检查UID: {}", study.id);
        Self { patient, study }
    }
}

/// 获取字符串类型元素的值（多值时取第一个），去除DICOM填充空格
fn string_element(obj: &InMemDicomObject, tag: Tag) -> Option<String> {
    let element = match obj.element(tag) {
        Ok(element) => element,
        Err(_) => {
            debug!("未找到标签: {:?}", tag);
            return None;
        }
    };

    let value = match element.value() {
        Value::Primitive(PrimitiveValue::Str(s)) => Some(s.to_string()),
        Value::Primitive(PrimitiveValue::Strs(strings)) => strings.first().map(|s| s.to_string()),
        _ => {
            debug!("标签 {:?} 不是字符串类型", tag);
            None
        }
    };

    value
        .map(|s| s.trim_matches(|c: char| c == ' ' || c == '\0').to_string())
        .filter(|s| !s.is_empty())
}

/// 人名（PN）转为显示文本：组件分隔符换成空格
fn person_name_to_display(name: &str) -> String {
    collapse_whitespace(&name.replace(['^', '='], " "))
}

/// 解析 DA（YYYYMMDD）和 TM（HHMMSS.FFFFFF，可截断）
///
/// 日期无效时返回 `None`；时间缺失或无效时取零点。
fn parse_study_date_time(date: Option<&str>, time: Option<&str>) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date?.trim(), "%Y%m%d").ok()?;

    let time = time
        .and_then(|raw| {
            let whole = raw.trim().split('.').next().unwrap_or_default();
            if whole.is_empty() || whole.len() > 6 || !whole.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let padded = format!("{:0<6}", whole);
            NaiveTime::parse_from_str(&padded, "%H%M%S").ok()
        })
        .unwrap_or(NaiveTime::MIN);

    Some(date.and_time(time))
}
