// ==========================================
// 会议截稿数据集 - 校验报告模型
// ==========================================
// 职责: 违规记录、按记录分组的汇总报告
// ==========================================

use crate::domain::types::{Severity, ViolationKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// Violation - 违规记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub entry_number: usize,   // 数据集条目序号（0 表示数据集级别）
    pub identity: String,      // 记录身份（"会议名 年份" 或 "#序号"）
    pub severity: Severity,    // 级别，由 kind 决定
    pub kind: ViolationKind,   // 违规类型
    pub field: String,         // 违规字段
    pub message: String,       // 违规描述
}

impl Violation {
    pub fn new(
        entry_number: usize,
        identity: impl Into<String>,
        kind: ViolationKind,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entry_number,
            identity: identity.into(),
            severity: kind.severity(),
            kind,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} [{}] {}",
            self.identity, self.severity, self.kind, self.field, self.message
        )
    }
}

// ==========================================
// ReportSummary - 汇总统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_records: usize, // 输入条目数
    pub valid_records: usize, // 无致命违规的条目数
    pub fatal: usize,         // 致命违规数
    pub warning: usize,       // 警告数
    pub duplicates: usize,    // 重复会议数
    pub archived: usize,      // 本次归档条目数
}

// ==========================================
// ValidationReport - 校验报告
// ==========================================
// records: 记录身份 → 违规列表（按首次出现顺序；同身份的后续条目键为 "身份 (#序号)"）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: String,
    pub summary: ReportSummary,
    pub records: IndexMap<String, Vec<Violation>>,
}

impl ValidationReport {
    /// 按记录身份分组生成报告
    pub fn from_violations(
        run_id: String,
        total_records: usize,
        violations: Vec<Violation>,
    ) -> Self {
        // 同一身份对应多个条目（重复会议）时，非首个条目的分组键附加序号
        let keys: Vec<String> = {
            let mut first_entry: HashMap<&str, usize> = HashMap::new();
            for violation in &violations {
                let first = first_entry
                    .entry(violation.identity.as_str())
                    .or_insert(violation.entry_number);
                *first = (*first).min(violation.entry_number);
            }
            violations
                .iter()
                .map(|v| match first_entry.get(v.identity.as_str()) {
                    Some(first) if *first != v.entry_number => {
                        format!("{} (#{})", v.identity, v.entry_number)
                    }
                    _ => v.identity.clone(),
                })
                .collect()
        };

        let mut records: IndexMap<String, Vec<Violation>> = IndexMap::new();
        for (key, violation) in keys.into_iter().zip(violations) {
            records.entry(key).or_default().push(violation);
        }

        let all = || records.values().flatten();
        let fatal = all().filter(|v| v.is_fatal()).count();
        let warning = all().filter(|v| !v.is_fatal()).count();
        let duplicates = all()
            .filter(|v| v.kind == ViolationKind::DuplicateConference)
            .count();

        let mut fatal_entries: Vec<usize> = all()
            .filter(|v| v.is_fatal() && v.entry_number > 0)
            .map(|v| v.entry_number)
            .collect();
        fatal_entries.sort_unstable();
        fatal_entries.dedup();

        let summary = ReportSummary {
            total_records,
            valid_records: total_records.saturating_sub(fatal_entries.len()),
            fatal,
            warning,
            duplicates,
            archived: 0,
        };

        Self {
            run_id,
            summary,
            records,
        }
    }

    pub fn has_fatal(&self) -> bool {
        self.summary.fatal > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.summary.warning > 0
    }

    /// 发布判定: 无致命违规；strict 模式下同时要求无警告
    pub fn passes(&self, strict: bool) -> bool {
        !self.has_fatal() && !(strict && self.has_warnings())
    }

    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.records.values().flatten()
    }

    /// 人类可读输出（按记录分组，每条违规一行）
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (identity, violations) in &self.records {
            lines.push(format!("{}:", identity));
            for v in violations {
                lines.push(format!(
                    "  {} {} [{}] {}",
                    v.severity, v.kind, v.field, v.message
                ));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_groups_by_identity_in_order() {
        let violations = vec![
            Violation::new(2, "B 2025", ViolationKind::InsecureScheme, "link", "x"),
            Violation::new(1, "A 2025", ViolationKind::UnknownField, "foo", "x"),
            Violation::new(2, "B 2025", ViolationKind::LinkUnreachable, "link", "x"),
        ];
        let report = ValidationReport::from_violations("run".to_string(), 3, violations);

        let keys: Vec<&String> = report.records.keys().collect();
        assert_eq!(keys, vec!["B 2025", "A 2025"]);
        assert_eq!(report.records["B 2025"].len(), 2);
        assert_eq!(report.summary.fatal, 1);
        assert_eq!(report.summary.warning, 2);
        assert_eq!(report.summary.valid_records, 2);
    }

    #[test]
    fn test_colliding_identities_grouped_per_entry() {
        let violations = vec![
            Violation::new(2, "PyCon X 2025", ViolationKind::DuplicateConference, "conference", "x"),
            Violation::new(1, "PyCon X 2025", ViolationKind::UnknownField, "foo", "x"),
            Violation::new(2, "PyCon X 2025", ViolationKind::InsecureScheme, "link", "x"),
        ];
        let report = ValidationReport::from_violations("run".to_string(), 2, violations);

        let keys: Vec<&String> = report.records.keys().collect();
        assert_eq!(keys, vec!["PyCon X 2025 (#2)", "PyCon X 2025"]);
        assert_eq!(report.records["PyCon X 2025 (#2)"].len(), 2);
        assert_eq!(report.records["PyCon X 2025"][0].entry_number, 1);
        // 违规本身的身份不变
        assert!(report.violations().all(|v| v.identity == "PyCon X 2025"));
    }

    #[test]
    fn test_passes_respects_strict_mode() {
        let warnings_only = ValidationReport::from_violations(
            "run".to_string(),
            1,
            vec![Violation::new(1, "A 2025", ViolationKind::LocationUnresolved, "place", "x")],
        );
        assert!(warnings_only.passes(false));
        assert!(!warnings_only.passes(true));

        let with_fatal = ValidationReport::from_violations(
            "run".to_string(),
            1,
            vec![Violation::new(1, "A 2025", ViolationKind::MissingField, "cfp", "x")],
        );
        assert!(!with_fatal.passes(false));
    }

    #[test]
    fn test_render_lines_one_line_per_violation() {
        let report = ValidationReport::from_violations(
            "run".to_string(),
            1,
            vec![
                Violation::new(1, "A 2025", ViolationKind::MissingField, "cfp", "缺少必填字段"),
                Violation::new(1, "A 2025", ViolationKind::InsecureScheme, "link", "非 HTTPS"),
            ],
        );
        let lines = report.render_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "A 2025:");
        assert!(lines[1].contains("FATAL MissingField [cfp]"));
    }
}
