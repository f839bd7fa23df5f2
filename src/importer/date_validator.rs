// ==========================================
// 会议截稿数据集 - 日期校验器实现
// ==========================================
// 职责: 日期格式校验 + 先后顺序校验 + 规范写法回写
// 规则: cfp <= start <= end；cfp_ext >= cfp；哨兵值跳过顺序校验
// ==========================================

use crate::domain::types::{
    format_deadline, format_event_date, parse_deadline, parse_event_date, DateValue,
};
use crate::domain::{ConferenceRecord, RawConferenceRecord, Violation, ViolationKind};
use crate::importer::pipeline_trait::DateValidator as DateValidatorTrait;
use chrono::{NaiveDate, NaiveDateTime};

pub struct DateValidator;

impl DateValidatorTrait for DateValidator {
    fn validate_dates(&self, entry_number: usize, record: &mut ConferenceRecord) -> Vec<Violation> {
        let identity = record.identity().to_string();
        check_dates(
            entry_number,
            &identity,
            DateFields {
                cfp: Some(&mut record.cfp),
                cfp_ext: record.cfp_ext.as_mut(),
                workshop_deadline: record.workshop_deadline.as_mut(),
                tutorial_deadline: record.tutorial_deadline.as_mut(),
                start: Some(&mut record.start),
                end: Some(&mut record.end),
            },
        )
    }

    fn validate_raw_dates(&self, raw: &RawConferenceRecord) -> Vec<Violation> {
        // 非字符串值已由字段模式报告 InvalidType，这里跳过
        let text = |field: &str| {
            raw.fields
                .get(field)
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let mut cfp = text("cfp");
        let mut cfp_ext = text("cfp_ext");
        let mut workshop_deadline = text("workshop_deadline");
        let mut tutorial_deadline = text("tutorial_deadline");
        let mut start = text("start");
        let mut end = text("end");

        check_dates(
            raw.entry_number,
            &raw.identity_hint(),
            DateFields {
                cfp: cfp.as_mut(),
                cfp_ext: cfp_ext.as_mut(),
                workshop_deadline: workshop_deadline.as_mut(),
                tutorial_deadline: tutorial_deadline.as_mut(),
                start: start.as_mut(),
                end: end.as_mut(),
            },
        )
    }
}

/// 参与校验的日期字段（None 表示缺失）
struct DateFields<'a> {
    cfp: Option<&'a mut String>,
    cfp_ext: Option<&'a mut String>,
    workshop_deadline: Option<&'a mut String>,
    tutorial_deadline: Option<&'a mut String>,
    start: Option<&'a mut String>,
    end: Option<&'a mut String>,
}

fn check_dates(entry_number: usize, identity: &str, fields: DateFields<'_>) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut push = |kind: ViolationKind, field: &str, message: String| {
        violations.push(Violation::new(entry_number, identity, kind, field, message));
    };

    // ===== 格式校验（同时回写规范写法）=====
    let cfp = fields
        .cfp
        .and_then(|value| canonical_deadline(value, "cfp", &mut push));
    let cfp_ext = fields
        .cfp_ext
        .and_then(|value| canonical_deadline(value, "cfp_ext", &mut push));
    if let Some(value) = fields.workshop_deadline {
        canonical_deadline(value, "workshop_deadline", &mut push);
    }
    if let Some(value) = fields.tutorial_deadline {
        canonical_deadline(value, "tutorial_deadline", &mut push);
    }
    let start = fields
        .start
        .and_then(|value| canonical_event_date(value, "start", &mut push));
    let end = fields
        .end
        .and_then(|value| canonical_event_date(value, "end", &mut push));

    // ===== 顺序校验（仅具体日期）=====
    let cfp = concrete(cfp);
    let cfp_ext = concrete(cfp_ext);
    let start = concrete(start);
    let end = concrete(end);

    if let (Some(cfp), Some(start)) = (cfp, start) {
        if cfp.date() > start {
            push(
                ViolationKind::DateOrderingViolation,
                "cfp",
                format!("截稿时间 {} 晚于会议开始日期 {}", cfp, start),
            );
        }
    }

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            push(
                ViolationKind::DateOrderingViolation,
                "end",
                format!("会议结束日期 {} 早于开始日期 {}", end, start),
            );
        }
    }

    if let (Some(cfp), Some(cfp_ext)) = (cfp, cfp_ext) {
        if cfp_ext < cfp {
            push(
                ViolationKind::DateOrderingViolation,
                "cfp_ext",
                format!("延期截稿时间 {} 早于原截稿时间 {}", cfp_ext, cfp),
            );
        }
    }

    violations
}

/// 解析截稿时间并回写规范写法；非法时记录 InvalidDateFormat
fn canonical_deadline<F>(
    value: &mut String,
    field: &str,
    push: &mut F,
) -> Option<DateValue<NaiveDateTime>>
where
    F: FnMut(ViolationKind, &str, String),
{
    match parse_deadline(value) {
        Some(parsed) => {
            *value = format_deadline(&parsed);
            Some(parsed)
        }
        None => {
            push(
                ViolationKind::InvalidDateFormat,
                field,
                format!(
                    "日期格式错误: 期望 YYYY-MM-DD HH:mm:ss 或 TBA/Cancelled/None，实际 {}",
                    value
                ),
            );
            None
        }
    }
}

/// 解析会议日期并回写规范写法
fn canonical_event_date<F>(
    value: &mut String,
    field: &str,
    push: &mut F,
) -> Option<DateValue<NaiveDate>>
where
    F: FnMut(ViolationKind, &str, String),
{
    match parse_event_date(value) {
        Some(parsed) => {
            *value = format_event_date(&parsed);
            Some(parsed)
        }
        None => {
            push(
                ViolationKind::InvalidDateFormat,
                field,
                format!(
                    "日期格式错误: 期望 YYYY-MM-DD 或 TBA/Cancelled/None，实际 {}",
                    value
                ),
            );
            None
        }
    }
}

fn concrete<T: Copy>(value: Option<DateValue<T>>) -> Option<T> {
    value.and_then(|v| v.concrete().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategorySet;
    use indexmap::IndexMap;

    fn create_test_record(cfp: &str, start: &str, end: &str) -> ConferenceRecord {
        ConferenceRecord {
            conference: "PyCon X".to_string(),
            alt_name: None,
            year: 2025,
            link: "https://pyconx.org".to_string(),
            cfp_link: None,
            cfp: cfp.to_string(),
            cfp_ext: None,
            workshop_deadline: None,
            tutorial_deadline: None,
            timezone: None,
            place: "Berlin, Germany".to_string(),
            extra_places: None,
            start: start.to_string(),
            end: end.to_string(),
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
    fn test_valid_dates_pass() {
        let mut record = create_test_record("2025-03-01 23:59:00", "2025-06-01", "2025-06-03");
        let violations = DateValidator.validate_dates(1, &mut record);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_cfp_on_start_day_is_allowed() {
        let mut record = create_test_record("2025-06-01 09:00:00", "2025-06-01", "2025-06-01");
        assert!(DateValidator.validate_dates(1, &mut record).is_empty());
    }

    #[test]
    fn test_cfp_after_start_is_ordering_violation() {
        let mut record = create_test_record("2025-07-01 23:59:00", "2025-06-01", "2025-06-03");
        let violations = DateValidator.validate_dates(1, &mut record);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::DateOrderingViolation);
        assert_eq!(violations[0].field, "cfp");
        assert!(violations[0].is_fatal());
    }

    #[test]
    fn test_start_after_end_is_ordering_violation() {
        let mut record = create_test_record("2025-03-01 23:59:00", "2025-06-05", "2025-06-03");
        let violations = DateValidator.validate_dates(1, &mut record);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "end");
    }

    #[test]
    fn test_extension_before_cfp_is_ordering_violation() {
        let mut record = create_test_record("2025-03-01 23:59:00", "2025-06-01", "2025-06-03");
        record.cfp_ext = Some("2025-02-01 23:59:00".to_string());
        let violations = DateValidator.validate_dates(1, &mut record);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "cfp_ext");
    }

    #[test]
    fn test_invalid_format_reported_per_field() {
        let mut record = create_test_record("March 1st", "2025/06/01", "2025-06-03");
        let violations = DateValidator.validate_dates(1, &mut record);

        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["cfp", "start"]);
        assert!(violations
            .iter()
            .all(|v| v.kind == ViolationKind::InvalidDateFormat));
    }

    #[test]
    fn test_sentinels_bypass_ordering_and_are_canonicalized() {
        let mut record = create_test_record("tba", "2025-06-01", "2025-06-03");
        let violations = DateValidator.validate_dates(1, &mut record);

        assert!(violations.is_empty());
        assert_eq!(record.cfp, "TBA");
    }

    #[test]
    fn test_date_only_deadline_is_canonicalized() {
        let mut record = create_test_record("2025-03-01", "2025-06-01", "2025-06-03");
        DateValidator.validate_dates(1, &mut record);
        assert_eq!(record.cfp, "2025-03-01 23:59:00");

        // 再次校验结果不变
        let before = record.clone();
        DateValidator.validate_dates(1, &mut record);
        assert_eq!(record, before);
    }

    #[test]
    fn test_raw_dates_checked_when_schema_fails() {
        // 缺少 sub/link 等字段，日期仍按相同规则校验
        let fields: IndexMap<String, serde_yaml::Value> = serde_yaml::from_str(
            "conference: PyCon X\nyear: 2025\ncfp: '2025-07-01 23:59:00'\nstart: 2025-06-01\nend: June 3\n",
        )
        .unwrap();
        let raw = RawConferenceRecord::new(4, fields);

        let violations = DateValidator.validate_raw_dates(&raw);

        let kinds: Vec<(&str, ViolationKind)> = violations
            .iter()
            .map(|v| (v.field.as_str(), v.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("end", ViolationKind::InvalidDateFormat),
                ("cfp", ViolationKind::DateOrderingViolation),
            ]
        );
        assert!(violations
            .iter()
            .all(|v| v.entry_number == 4 && v.identity == "PyCon X 2025"));
    }

    #[test]
    fn test_raw_dates_skip_missing_and_non_text_values() {
        let fields: IndexMap<String, serde_yaml::Value> =
            serde_yaml::from_str("cfp: [a, b]\nstart: 2025-06-01\n").unwrap();
        let raw = RawConferenceRecord::new(1, fields);

        assert!(DateValidator.validate_raw_dates(&raw).is_empty());
    }
}
