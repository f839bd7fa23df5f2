// ==========================================
// 会议截稿数据集 - 引擎层
// ==========================================
// 职责: 流水线编排、截稿排序、过期归档
// 红线: 校验未通过不写出任何文件
// ==========================================

pub mod archiver;
pub mod orchestrator;
pub mod sorter;

// 重导出核心引擎
pub use archiver::{cutoff_utc, ArchiveSplit, Archiver};
pub use orchestrator::{PipelineOutcome, SortOutcome, ValidationPipeline};
pub use sorter::DeadlineSorter;
