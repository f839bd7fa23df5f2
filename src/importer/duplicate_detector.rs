// ==========================================
// 会议截稿数据集 - 重复检测器实现
// ==========================================
// 职责: 检测数据集内/跨数据集重复会议
// 身份: 规范化名称 + 年份；alt_name 与主名称并入同一等价类
// 策略: 首次出现保留，后续出现报 DuplicateConference，不自动合并
// ==========================================

use crate::domain::{ConferenceRecord, NormalizedRecord, RecordIdentity};
use crate::importer::pipeline_trait::DuplicateDetector as DuplicateDetectorTrait;
use std::collections::{HashMap, HashSet};

pub struct DuplicateDetector;

impl DuplicateDetectorTrait for DuplicateDetector {
    fn detect_duplicates(&self, records: &[NormalizedRecord]) -> Vec<(usize, RecordIdentity)> {
        let classes = NameClasses::from_records(records.iter().map(|r| &r.record));
        let mut first_occurrence: HashMap<(usize, i32), usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for normalized in records {
            let key = classes.key_of(&normalized.record);
            if first_occurrence.contains_key(&key) {
                duplicates.push((normalized.entry_number, normalized.record.identity()));
            } else {
                first_occurrence.insert(key, normalized.entry_number);
            }
        }

        duplicates
    }

    fn detect_cross_dataset_duplicates(
        &self,
        records: &[NormalizedRecord],
        existing: &[ConferenceRecord],
    ) -> Vec<(usize, RecordIdentity)> {
        let classes =
            NameClasses::from_records(records.iter().map(|r| &r.record).chain(existing.iter()));
        let existing_keys: HashSet<(usize, i32)> =
            existing.iter().map(|r| classes.key_of(r)).collect();

        records
            .iter()
            .filter(|r| existing_keys.contains(&classes.key_of(&r.record)))
            .map(|r| (r.entry_number, r.record.identity()))
            .collect()
    }
}

/// 名称规范化: 去首尾空白、合并连续空白、小写
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ==========================================
// NameClasses - 名称等价类（并查集）
// ==========================================
struct NameClasses {
    index: HashMap<String, usize>,
    parent: Vec<usize>,
}

impl NameClasses {
    fn from_records<'a>(records: impl Iterator<Item = &'a ConferenceRecord>) -> Self {
        let mut classes = Self {
            index: HashMap::new(),
            parent: Vec::new(),
        };

        for record in records {
            let primary = classes.insert(&record.conference);
            if let Some(alt_name) = record.alt_name.as_deref() {
                let alt = classes.insert(alt_name);
                classes.union(primary, alt);
            }
        }

        classes
    }

    fn insert(&mut self, name: &str) -> usize {
        let normalized = normalize_name(name);
        if let Some(&id) = self.index.get(&normalized) {
            return id;
        }
        let id = self.parent.len();
        self.parent.push(id);
        self.index.insert(normalized, id);
        id
    }

    fn find(&self, mut id: usize) -> usize {
        while self.parent[id] != id {
            id = self.parent[id];
        }
        id
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            // 较小的根作为代表，保证结果与插入顺序无关
            let (low, high) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[high] = low;
        }
    }

    /// 记录的身份键（等价类代表 + 年份）
    fn key_of(&self, record: &ConferenceRecord) -> (usize, i32) {
        let root = self
            .index
            .get(&normalize_name(&record.conference))
            .map(|&id| self.find(id))
            .unwrap_or(usize::MAX);
        (root, record.year)
    }
}
