// ==========================================
// 会议截稿数据集 - 归档器
// ==========================================
// 职责: 将截稿已过宽限期的记录从活动数据集移入归档数据集（单向）
// 判定:
// - 有效截稿时间（cfp_ext 优先）按解析后的时区换算为 UTC
// - 截稿为哨兵值时改用会议结束日（当日 23:59:59）
// - 两者都没有具体值的记录保留在活动数据集
// 合并: 归档已有条目保留；同身份（规范化名称 + 年份）不重复加入
// ==========================================

use crate::domain::{ConferenceRecord, NormalizedRecord, ResolvedTimezone};
use crate::engine::sorter::DeadlineSorter;
use crate::importer::duplicate_detector::normalize_name;
use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use tracing::debug;

pub struct Archiver {
    grace_days: i64,
    sorter: DeadlineSorter,
}

/// 归档拆分结果
#[derive(Debug, Clone)]
pub struct ArchiveSplit {
    pub active: Vec<NormalizedRecord>,
    pub expired: Vec<NormalizedRecord>,
}

impl Archiver {
    pub fn new(grace_days: i64) -> Self {
        Self {
            grace_days,
            sorter: DeadlineSorter::new(),
        }
    }

    /// 按当前时间拆分活动数据集（保持原有顺序）
    pub fn split(&self, records: Vec<NormalizedRecord>, now: DateTime<Utc>) -> ArchiveSplit {
        // 宽限期超出时间范围时视为永不过期
        let grace = Duration::try_days(self.grace_days);
        let (expired, active): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| {
            cutoff_utc(&r.record, &r.resolved_timezone)
                .zip(grace)
                .and_then(|(cutoff, grace)| cutoff.checked_add_signed(grace))
                .is_some_and(|expires| expires < now)
        });

        debug!(
            active = active.len(),
            expired = expired.len(),
            grace_days = self.grace_days,
            "归档拆分完成"
        );
        ArchiveSplit { active, expired }
    }

    /// 合并归档数据集并排序
    pub fn merge(
        &self,
        existing: Vec<ConferenceRecord>,
        moved: Vec<ConferenceRecord>,
    ) -> Vec<ConferenceRecord> {
        let mut seen: HashSet<(String, i32)> = existing.iter().map(identity_key).collect();
        let mut merged = existing;

        for record in moved {
            if seen.insert(identity_key(&record)) {
                merged.push(record);
            }
        }

        self.sorter.sort_records(merged)
    }
}

fn identity_key(record: &ConferenceRecord) -> (String, i32) {
    (normalize_name(&record.conference), record.year)
}

/// 记录的截止时刻（UTC）
pub fn cutoff_utc(record: &ConferenceRecord, timezone: &ResolvedTimezone) -> Option<DateTime<Utc>> {
    let local = record.effective_deadline().or_else(|| {
        record
            .end_date()
            .map(|end| end.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)))
    })?;

    Some(to_utc(local, timezone))
}

/// 本地时间 → UTC（夏令时空档按 UTC 处理）
fn to_utc(local: NaiveDateTime, timezone: &ResolvedTimezone) -> DateTime<Utc> {
    let converted = timezone
        .iana_name()
        .parse::<Tz>()
        .ok()
        .and_then(|tz| tz.from_local_datetime(&local).earliest())
        .map(|dt| dt.with_timezone(&Utc));

    converted.unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategorySet;
    use indexmap::IndexMap;

    fn create_test_record(conference: &str, cfp: &str, end: &str) -> ConferenceRecord {
        ConferenceRecord {
            conference: conference.to_string(),
            alt_name: None,
            year: 2025,
            link: "https://example.org".to_string(),
            cfp_link: None,
            cfp: cfp.to_string(),
            cfp_ext: None,
            workshop_deadline: None,
            tutorial_deadline: None,
            timezone: None,
            place: "Online".to_string(),
            extra_places: None,
            start: "2025-06-01".to_string(),
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

    fn normalized(record: ConferenceRecord, tz: ResolvedTimezone) -> NormalizedRecord {
        NormalizedRecord {
            entry_number: 1,
            record,
            resolved_timezone: tz,
        }
    }

    fn utc(value: &str) -> DateTime<Utc> {
        let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap();
        Utc.from_utc_datetime(&naive)
    }

    #[test]
    fn test_cutoff_respects_timezone() {
        let record = create_test_record("A", "2025-03-01 23:59:00", "2025-06-03");

        let berlin = cutoff_utc(&record, &ResolvedTimezone::Iana("Europe/Berlin".to_string()));
        assert_eq!(berlin, Some(utc("2025-03-01 22:59:00")));

        // AoE = UTC-12
        let aoe = cutoff_utc(&record, &ResolvedTimezone::AnywhereOnEarth);
        assert_eq!(aoe, Some(utc("2025-03-02 11:59:00")));
    }

    #[test]
    fn test_cutoff_prefers_extension_then_end_date() {
        let mut record = create_test_record("A", "2025-03-01 23:59:00", "2025-06-03");
        record.cfp_ext = Some("2025-03-15 23:59:00".to_string());
        let tz = ResolvedTimezone::Iana("UTC".to_string());
        assert_eq!(cutoff_utc(&record, &tz), Some(utc("2025-03-15 23:59:00")));

        let record = create_test_record("B", "TBA", "2025-06-03");
        assert_eq!(cutoff_utc(&record, &tz), Some(utc("2025-06-03 23:59:59")));

        let record = create_test_record("C", "TBA", "TBA");
        assert_eq!(cutoff_utc(&record, &tz), None);
    }

    #[test]
    fn test_split_uses_grace_period() {
        let archiver = Archiver::new(30);
        let tz = ResolvedTimezone::Iana("UTC".to_string());
        let records = vec![
            normalized(create_test_record("Old", "2025-01-01 23:59:00", "2025-06-03"), tz.clone()),
            normalized(create_test_record("Recent", "2025-02-20 23:59:00", "2025-06-03"), tz.clone()),
            normalized(create_test_record("Unknown", "TBA", "None"), tz),
        ];

        let split = archiver.split(records, utc("2025-03-01 00:00:00"));

        let expired: Vec<&str> = split.expired.iter().map(|r| r.record.conference.as_str()).collect();
        let active: Vec<&str> = split.active.iter().map(|r| r.record.conference.as_str()).collect();
        assert_eq!(expired, vec!["Old"]);
        assert_eq!(active, vec!["Recent", "Unknown"]);
    }

    #[test]
    fn test_split_with_out_of_range_grace_keeps_records_active() {
        let tz = ResolvedTimezone::Iana("UTC".to_string());
        let record = || normalized(create_test_record("Old", "2025-01-01 23:59:00", "2025-06-03"), tz.clone());

        // 天数超出 TimeDelta 范围
        let split = Archiver::new(999_999_999_999_999).split(vec![record()], utc("2025-03-01 00:00:00"));
        assert!(split.expired.is_empty());
        assert_eq!(split.active.len(), 1);

        // 截止时刻 + 宽限期溢出 DateTime 范围
        let split = Archiver::new(100_000_000).split(vec![record()], utc("2025-03-01 00:00:00"));
        assert!(split.expired.is_empty());
    }

    #[test]
    fn test_merge_skips_existing_identities() {
        let archiver = Archiver::new(30);
        let existing = vec![create_test_record("PyCon X", "2024-03-01 23:59:00", "2024-06-03")];
        let moved = vec![
            create_test_record("pycon x", "2025-03-01 23:59:00", "2025-06-03"),
            create_test_record("EuroSciPy", "2025-01-01 23:59:00", "2025-06-03"),
        ];

        let merged = archiver.merge(existing, moved);

        // "pycon x" 与已有 "PyCon X" 同年，不重复加入
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].conference, "PyCon X");
        assert_eq!(merged[0].cfp, "2024-03-01 23:59:00");
        assert_eq!(merged[1].conference, "EuroSciPy");
    }
}
