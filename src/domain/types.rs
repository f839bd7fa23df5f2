// ==========================================
// 会议截稿数据集 - 领域类型定义
// ==========================================
// 职责: 日期哨兵值、日期值、违规级别与违规类型
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 截稿时间格式（YYYY-MM-DD HH:mm:ss）
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 会议日期格式（YYYY-MM-DD）
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 数据集允许的最早年份（首届 Python 会议之前无意义）
pub const MIN_YEAR: i32 = 1989;

/// AoE（Anywhere on Earth）显示名
pub const AOE_LABEL: &str = "UTC-12";

/// AoE 对应的 IANA 名称（注意 Etc/GMT 的符号与直觉相反）
pub const AOE_IANA: &str = "Etc/GMT+12";

// ==========================================
// 日期哨兵值 (Sentinel)
// ==========================================
// 哨兵值跳过所有先后顺序校验
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    Tba,       // 待定
    Cancelled, // 已取消
    None,      // 不适用
}

impl Sentinel {
    /// 解析哨兵值（大小写不敏感）
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tba" => Some(Sentinel::Tba),
            "cancelled" => Some(Sentinel::Cancelled),
            "none" => Some(Sentinel::None),
            _ => None,
        }
    }

    /// 规范写法
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentinel::Tba => "TBA",
            Sentinel::Cancelled => "Cancelled",
            Sentinel::None => "None",
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 日期值 (DateValue)
// ==========================================
// 具体时间 或 哨兵值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateValue<T> {
    Concrete(T),
    Sentinel(Sentinel),
}

impl<T> DateValue<T> {
    pub fn concrete(&self) -> Option<&T> {
        match self {
            DateValue::Concrete(v) => Some(v),
            DateValue::Sentinel(_) => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, DateValue::Sentinel(_))
    }
}

/// 解析截稿时间
///
/// # 规则
/// - 哨兵值 → Sentinel
/// - YYYY-MM-DD HH:mm:ss → Concrete
/// - YYYY-MM-DD → 当天 23:59:00
///
/// # 返回
/// - None: 格式非法
pub fn parse_deadline(value: &str) -> Option<DateValue<NaiveDateTime>> {
    let value = value.trim();
    if let Some(sentinel) = Sentinel::parse(value) {
        return Some(DateValue::Sentinel(sentinel));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, DEADLINE_FORMAT) {
        return Some(DateValue::Concrete(dt));
    }
    // 仅日期的截稿时间按当天 23:59:00 处理
    if value.len() == 10 {
        if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
            let end_of_day = NaiveTime::from_hms_opt(23, 59, 0)?;
            return Some(DateValue::Concrete(date.and_time(end_of_day)));
        }
    }
    None
}

/// 解析会议日期（start / end）
pub fn parse_event_date(value: &str) -> Option<DateValue<NaiveDate>> {
    let value = value.trim();
    if let Some(sentinel) = Sentinel::parse(value) {
        return Some(DateValue::Sentinel(sentinel));
    }
    // chrono 会接受 "2025-6-1"，这里要求严格的 10 位格式
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(DateValue::Concrete)
}

/// 截稿时间的规范写法
pub fn format_deadline(value: &DateValue<NaiveDateTime>) -> String {
    match value {
        DateValue::Concrete(dt) => dt.format(DEADLINE_FORMAT).to_string(),
        DateValue::Sentinel(s) => s.as_str().to_string(),
    }
}

/// 会议日期的规范写法
pub fn format_event_date(value: &DateValue<NaiveDate>) -> String {
    match value {
        DateValue::Concrete(d) => d.format(DATE_FORMAT).to_string(),
        DateValue::Sentinel(s) => s.as_str().to_string(),
    }
}

// ==========================================
// 违规级别 (Severity)
// ==========================================
// Fatal 阻断发布; Warning 仅记录（strict 模式下同样阻断）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Fatal,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

// ==========================================
// 违规类型 (ViolationKind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    // ===== 致命 =====
    MissingField,
    InvalidType,
    OutOfRange,
    InvalidDateFormat,
    DateOrderingViolation,
    InvalidTimezone,
    InvalidUrl,
    InsecureScheme,
    DuplicateConference,

    // ===== 警告 =====
    UnknownField,
    UnknownCategory,
    LocationUnresolved,
    LinkUnreachable,
    LinkCheckSkipped,
}

impl ViolationKind {
    /// 违规类型对应的级别
    pub fn severity(&self) -> Severity {
        match self {
            ViolationKind::MissingField
            | ViolationKind::InvalidType
            | ViolationKind::OutOfRange
            | ViolationKind::InvalidDateFormat
            | ViolationKind::DateOrderingViolation
            | ViolationKind::InvalidTimezone
            | ViolationKind::InvalidUrl
            | ViolationKind::InsecureScheme
            | ViolationKind::DuplicateConference => Severity::Fatal,
            ViolationKind::UnknownField
            | ViolationKind::UnknownCategory
            | ViolationKind::LocationUnresolved
            | ViolationKind::LinkUnreachable
            | ViolationKind::LinkCheckSkipped => Severity::Warning,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug 输出即为变体名
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_parse_case_insensitive() {
        assert_eq!(Sentinel::parse("tba"), Some(Sentinel::Tba));
        assert_eq!(Sentinel::parse(" CANCELLED "), Some(Sentinel::Cancelled));
        assert_eq!(Sentinel::parse("None"), Some(Sentinel::None));
        assert_eq!(Sentinel::parse("soon"), None);
    }

    #[test]
    fn test_parse_deadline_full_and_date_only() {
        let full = parse_deadline("2025-03-01 12:30:00").unwrap();
        assert_eq!(format_deadline(&full), "2025-03-01 12:30:00");

        let date_only = parse_deadline("2025-03-01").unwrap();
        assert_eq!(format_deadline(&date_only), "2025-03-01 23:59:00");

        assert!(parse_deadline("01.03.2025").is_none());
        assert!(parse_deadline("2025-03-01T12:30:00").is_none());
    }

    #[test]
    fn test_parse_event_date_strict() {
        assert!(matches!(
            parse_event_date("2025-06-01"),
            Some(DateValue::Concrete(_))
        ));
        assert!(parse_event_date("2025-6-1").is_none());
        assert!(parse_event_date("2025-06-01 10:00:00").is_none());
        assert_eq!(
            parse_event_date("tba"),
            Some(DateValue::Sentinel(Sentinel::Tba))
        );
    }

    #[test]
    fn test_violation_kind_severity() {
        assert_eq!(ViolationKind::InsecureScheme.severity(), Severity::Fatal);
        assert_eq!(ViolationKind::DuplicateConference.severity(), Severity::Fatal);
        assert_eq!(ViolationKind::LinkUnreachable.severity(), Severity::Warning);
        assert_eq!(ViolationKind::UnknownField.severity(), Severity::Warning);
    }
}
