// ==========================================
// 会议截稿数据集 - 领域模型层
// ==========================================
// 职责: 定义会议记录、日期类型、违规与报告
// 红线: 不含文件读写逻辑,不含校验逻辑
// ==========================================

pub mod conference;
pub mod report;
pub mod types;

// 重导出核心类型
pub use conference::{
    CategorySet, ConferenceRecord, Coordinates, GeoLocation, NormalizedRecord, RawConferenceRecord,
    RecordIdentity, ResolvedTimezone,
};
pub use report::{ReportSummary, ValidationReport, Violation};
pub use types::{DateValue, Sentinel, Severity, ViolationKind};
