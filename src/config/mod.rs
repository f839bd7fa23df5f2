// ==========================================
// 会议截稿数据集 - 配置层
// ==========================================
// 职责: 流水线配置管理，支持多级覆写
// 存储: deadlines.toml + DEADLINES_* 环境变量
// ==========================================

pub mod config_manager;
pub mod pipeline_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, DEFAULT_CONFIG_FILE};
pub use pipeline_config::{PipelineConfig, MAX_ARCHIVE_GRACE_DAYS};
