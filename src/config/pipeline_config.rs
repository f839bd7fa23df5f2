// ==========================================
// 会议截稿数据集 - 流水线配置
// ==========================================
// 来源（优先级从低到高）: 默认值 → deadlines.toml → DEADLINES_* 环境变量 → 命令行
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 归档宽限天数上限（约 100 年）
pub const MAX_ARCHIVE_GRACE_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // ===== 校验开关 =====
    pub skip_links: bool, // 跳过链接可达性检查（协议检查仍执行）
    pub strict: bool,     // 警告也判定为失败

    // ===== 数据集路径 =====
    pub data_dir: PathBuf,
    pub active_file: String,
    pub archive_file: String,
    pub legacy_file: String,

    // ===== 链接检查 =====
    pub link_concurrency: usize,
    pub link_request_timeout_secs: u64,
    pub link_phase_timeout_secs: u64,
    pub user_agent: String,

    // ===== 归档 =====
    pub archive_grace_days: i64,

    // ===== 地理编码 =====
    pub online_geocoding: bool, // 离线表未命中时查询 Nominatim
    pub nominatim_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            skip_links: false,
            strict: false,
            data_dir: PathBuf::from("_data"),
            active_file: "conferences.yml".to_string(),
            archive_file: "archive.yml".to_string(),
            legacy_file: "legacy.yml".to_string(),
            link_concurrency: 4,
            link_request_timeout_secs: 10,
            link_phase_timeout_secs: 120,
            user_agent: format!("conf-deadlines/{}", env!("CARGO_PKG_VERSION")),
            archive_grace_days: 30,
            online_geocoding: false,
            nominatim_url: crate::importer::geocoding::DEFAULT_NOMINATIM_URL.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn active_path(&self) -> PathBuf {
        self.data_dir.join(&self.active_file)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join(&self.archive_file)
    }

    pub fn legacy_path(&self) -> PathBuf {
        self.data_dir.join(&self.legacy_file)
    }

    pub fn link_request_timeout(&self) -> Duration {
        Duration::from_secs(self.link_request_timeout_secs)
    }

    pub fn link_phase_timeout(&self) -> Duration {
        Duration::from_secs(self.link_phase_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.active_path(), PathBuf::from("_data/conferences.yml"));
        assert_eq!(config.archive_path(), PathBuf::from("_data/archive.yml"));
        assert_eq!(config.legacy_path(), PathBuf::from("_data/legacy.yml"));
        assert_eq!(config.link_concurrency, 4);
        assert_eq!(config.archive_grace_days, 30);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str("strict = true\nlink_concurrency = 8\n").unwrap();
        assert!(config.strict);
        assert_eq!(config.link_concurrency, 8);
        assert!(!config.skip_links);
        assert_eq!(config.active_file, "conferences.yml");
    }
}
