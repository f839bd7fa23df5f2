// ==========================================
// 会议截稿数据集 - 核心库
// ==========================================
// 职责: 会议截稿 YAML 数据集的校验、规范化、排序与归档
// 发布原则: 全有或全无（任一致命违规即不写出）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录与报告
pub mod domain;

// 校验层 - 各流水线阶段
pub mod importer;

// 引擎层 - 编排/排序/归档
pub mod engine;

// 配置层
pub mod config;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    ConferenceRecord, NormalizedRecord, ResolvedTimezone, Severity, ValidationReport, Violation,
    ViolationKind,
};

// 引擎
pub use engine::{PipelineOutcome, SortOutcome, ValidationPipeline};

// 配置
pub use config::{ConfigManager, PipelineConfig};

// 错误
pub use importer::{ImportError, ImportResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "会议截稿数据集校验工具";
