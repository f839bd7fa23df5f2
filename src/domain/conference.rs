// ==========================================
// 会议截稿数据集 - 会议记录领域模型
// ==========================================
// 职责: ConferenceRecord（规范化后的单届会议）与导入中间结构
// ==========================================

use crate::domain::types::{
    parse_deadline, parse_event_date, DateValue, AOE_IANA, AOE_LABEL,
};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;

// ==========================================
// RawConferenceRecord - 导入中间结构体
// ==========================================
// 用途: YAML 解析后的原始条目（字段名 → 原始值，保持文件顺序）
// 生命周期: 仅在校验流程内
#[derive(Debug, Clone)]
pub struct RawConferenceRecord {
    pub entry_number: usize, // 数据集中的条目序号（从 1 开始）
    pub fields: IndexMap<String, serde_yaml::Value>,
}

impl RawConferenceRecord {
    pub fn new(entry_number: usize, fields: IndexMap<String, serde_yaml::Value>) -> Self {
        Self {
            entry_number,
            fields,
        }
    }

    /// 尽力提取身份标识（用于报告分组，字段可能缺失）
    pub fn identity_hint(&self) -> String {
        let name = self
            .fields
            .get("conference")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let year = self.fields.get("year").and_then(|v| match v {
            serde_yaml::Value::Number(n) => n.as_i64().map(|y| y.to_string()),
            serde_yaml::Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        });

        match (name, year) {
            (Some(name), Some(year)) => format!("{} {}", name, year),
            (Some(name), None) => name,
            _ => format!("#{}", self.entry_number),
        }
    }
}

// ==========================================
// CategorySet - 会议分类标签集合
// ==========================================
// YAML 中写作逗号分隔的大写字符串（如 "PY,DATA"）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet(pub Vec<String>);

impl CategorySet {
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl Serialize for CategorySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ==========================================
// GeoLocation - 坐标点
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoLocation {
    pub title: String,
    pub latitude: f64,  // 纬度，最多 5 位小数
    pub longitude: f64, // 经度，最多 5 位小数
}

// ==========================================
// Coordinates - 地理编码结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

// ==========================================
// ConferenceRecord - 单届会议记录
// ==========================================
// 字段顺序即 YAML 输出顺序
// 日期字段保存规范化后的文本，解析结果通过方法获取
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConferenceRecord {
    // ===== 身份 =====
    pub conference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_name: Option<String>,
    pub year: i32,

    // ===== 链接 =====
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfp_link: Option<String>,

    // ===== 截稿时间 =====
    pub cfp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfp_ext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workshop_deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tutorial_deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>, // 缺省即 AoE

    // ===== 地点与日期 =====
    pub place: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_places: Option<Vec<String>>,
    pub start: String,
    pub end: String,

    // ===== 分类与附加信息 =====
    pub sub: CategorySet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finaid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mastodon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bluesky: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Vec<GeoLocation>>,

    // ===== 未知字段与 has_* 标志（原样保留）=====
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl ConferenceRecord {
    /// 身份标识（会议名 + 年份）
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity {
            conference: self.conference.clone(),
            year: self.year,
        }
    }

    pub fn is_online(&self) -> bool {
        self.place.trim().eq_ignore_ascii_case("online")
    }

    /// 主截稿时间（格式非法时为 None）
    pub fn cfp_deadline(&self) -> Option<DateValue<NaiveDateTime>> {
        parse_deadline(&self.cfp)
    }

    /// 有效截稿时间: cfp_ext 为具体时间时优先，否则取 cfp
    pub fn effective_deadline(&self) -> Option<NaiveDateTime> {
        let extended = self
            .cfp_ext
            .as_deref()
            .and_then(parse_deadline)
            .and_then(|v| v.concrete().copied());
        extended.or_else(|| self.cfp_deadline().and_then(|v| v.concrete().copied()))
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        parse_event_date(&self.start).and_then(|v| v.concrete().copied())
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        parse_event_date(&self.end).and_then(|v| v.concrete().copied())
    }
}

// ==========================================
// RecordIdentity - 记录身份
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordIdentity {
    pub conference: String,
    pub year: i32,
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.conference, self.year)
    }
}

// ==========================================
// ResolvedTimezone - 解析后的时区
// ==========================================
// 供下游倒计时使用；AoE 不回写到 YAML
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTimezone {
    Iana(String),
    AnywhereOnEarth,
}

impl ResolvedTimezone {
    /// 可被 chrono-tz 解析的 IANA 名称
    pub fn iana_name(&self) -> &str {
        match self {
            ResolvedTimezone::Iana(name) => name,
            ResolvedTimezone::AnywhereOnEarth => AOE_IANA,
        }
    }
}

impl fmt::Display for ResolvedTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedTimezone::Iana(name) => f.write_str(name),
            ResolvedTimezone::AnywhereOnEarth => f.write_str(AOE_LABEL),
        }
    }
}

// ==========================================
// NormalizedRecord - 规范化结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub entry_number: usize,
    pub record: ConferenceRecord,
    pub resolved_timezone: ResolvedTimezone,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ConferenceRecord {
        ConferenceRecord {
            conference: "PyCon X".to_string(),
            alt_name: None,
            year: 2025,
            link: "https://pyconx.org".to_string(),
            cfp_link: None,
            cfp: "2025-03-01 23:59:00".to_string(),
            cfp_ext: None,
            workshop_deadline: None,
            tutorial_deadline: None,
            timezone: None,
            place: "Berlin, Germany".to_string(),
            extra_places: None,
            start: "2025-06-01".to_string(),
            end: "2025-06-03".to_string(),
            sub: CategorySet(vec!["PY".to_string()]),
            sponsor: None,
            finaid: None,
            twitter: None,
            mastodon: None,
            bluesky: None,
            note: None,
            location: None,
            extra: IndexMap::new(),
        }
    }

    #[test]
    fn test_effective_deadline_prefers_extension() {
        let mut record = sample_record();
        assert_eq!(
            record.effective_deadline().unwrap().to_string(),
            "2025-03-01 23:59:00"
        );

        record.cfp_ext = Some("2025-03-15 23:59:00".to_string());
        assert_eq!(
            record.effective_deadline().unwrap().to_string(),
            "2025-03-15 23:59:00"
        );

        // 延期为哨兵值时回退到 cfp
        record.cfp_ext = Some("TBA".to_string());
        assert_eq!(
            record.effective_deadline().unwrap().to_string(),
            "2025-03-01 23:59:00"
        );
    }

    #[test]
    fn test_serialize_field_order_and_omits_none() {
        let mut record = sample_record();
        record.sub = CategorySet(vec!["PY".to_string(), "DATA".to_string()]);
        let yaml = serde_yaml::to_string(&record).unwrap();

        let conference_pos = yaml.find("conference:").unwrap();
        let year_pos = yaml.find("year:").unwrap();
        let cfp_pos = yaml.find("cfp:").unwrap();
        assert!(conference_pos < year_pos && year_pos < cfp_pos);
        assert!(yaml.contains("sub: PY,DATA"));
        assert!(!yaml.contains("cfp_ext"));
        assert!(!yaml.contains("timezone"));
    }

    #[test]
    fn test_identity_hint_fallbacks() {
        let mut fields = IndexMap::new();
        let raw = RawConferenceRecord::new(7, fields.clone());
        assert_eq!(raw.identity_hint(), "#7");

        fields.insert(
            "conference".to_string(),
            serde_yaml::Value::String("EuroPython".to_string()),
        );
        fields.insert("year".to_string(), serde_yaml::Value::Number(2024.into()));
        let raw = RawConferenceRecord::new(7, fields);
        assert_eq!(raw.identity_hint(), "EuroPython 2024");
    }

    #[test]
    fn test_resolved_timezone_display() {
        assert_eq!(ResolvedTimezone::AnywhereOnEarth.to_string(), "UTC-12");
        assert_eq!(ResolvedTimezone::AnywhereOnEarth.iana_name(), "Etc/GMT+12");
        assert_eq!(
            ResolvedTimezone::Iana("Europe/Berlin".to_string()).to_string(),
            "Europe/Berlin"
        );
    }
}
