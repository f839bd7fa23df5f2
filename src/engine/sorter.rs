// ==========================================
// 会议截稿数据集 - 截稿排序器
// ==========================================
// 排序键:
// 1) cfp 具体时间升序（按本地时间比较，不换算时区）
// 2) 会议名称升序
// 3) 年份升序
// 哨兵值（TBA/Cancelled/None）或非法 cfp 排在最后
// ==========================================

use crate::domain::{ConferenceRecord, NormalizedRecord};
use chrono::NaiveDateTime;
use std::cmp::Ordering;

// ==========================================
// DeadlineSorter - 截稿排序器
// ==========================================
pub struct DeadlineSorter {
    // 无状态
}

impl DeadlineSorter {
    pub fn new() -> Self {
        Self {}
    }

    /// 排序规范化记录（稳定排序）
    pub fn sort(&self, mut records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
        records.sort_by(|a, b| self.compare(&a.record, &b.record));
        records
    }

    /// 排序数据集记录（归档等无时区信息的场景）
    pub fn sort_records(&self, mut records: Vec<ConferenceRecord>) -> Vec<ConferenceRecord> {
        records.sort_by(|a, b| self.compare(a, b));
        records
    }

    pub fn compare(&self, a: &ConferenceRecord, b: &ConferenceRecord) -> Ordering {
        compare_deadline(concrete_cfp(a), concrete_cfp(b))
            .then_with(|| a.conference.cmp(&b.conference))
            .then_with(|| a.year.cmp(&b.year))
    }
}

impl Default for DeadlineSorter {
    fn default() -> Self {
        Self::new()
    }
}

fn concrete_cfp(record: &ConferenceRecord) -> Option<NaiveDateTime> {
    record.cfp_deadline().and_then(|v| v.concrete().copied())
}

/// 具体时间在前，无具体时间在后
fn compare_deadline(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
