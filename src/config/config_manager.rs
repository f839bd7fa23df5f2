// ==========================================
// 会议截稿数据集 - 配置管理器
// ==========================================
// 职责: 配置加载、环境变量覆写、取值校验
// 存储: deadlines.toml（可选）+ DEADLINES_* 环境变量
// ==========================================

use crate::config::pipeline_config::{PipelineConfig, MAX_ARCHIVE_GRACE_DAYS};
use crate::importer::error::{ImportError, ImportResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// 默认配置文件名（当前目录）
pub const DEFAULT_CONFIG_FILE: &str = "deadlines.toml";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    config: PipelineConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 加载配置
    ///
    /// # 参数
    /// - config_path: 显式指定的配置文件（必须存在）；None 时尝试 ./deadlines.toml
    ///
    /// # 顺序
    /// 1. 默认值
    /// 2. TOML 文件
    /// 3. DEADLINES_* 环境变量
    pub fn load(config_path: Option<&Path>) -> ImportResult<Self> {
        let mut manager = match config_path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::from_config(PipelineConfig::default()),
        };

        manager.apply_overrides(|key| std::env::var(config_keys::env_var(key)).ok())?;
        manager.validate()?;

        info!(
            source = %manager.source.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<默认值>".to_string()),
            data_dir = %manager.config.data_dir.display(),
            "配置加载完成"
        );
        Ok(manager)
    }

    /// 从 TOML 文件创建（不应用环境变量）
    pub fn from_file(path: &Path) -> ImportResult<Self> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;

        Ok(Self {
            config,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            config,
            source: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn into_config(self) -> PipelineConfig {
        self.config
    }

    /// 应用覆写
    ///
    /// # 参数
    /// - lookup: 配置键 → 覆写值（环境变量或测试注入）
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ImportResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        use config_keys::*;

        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let config = &mut self.config;

        if let Some(v) = get(SKIP_LINKS) {
            config.skip_links = parse_bool(SKIP_LINKS, &v)?;
        }
        if let Some(v) = get(STRICT) {
            config.strict = parse_bool(STRICT, &v)?;
        }
        if let Some(v) = get(DATA_DIR) {
            config.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ACTIVE_FILE) {
            config.active_file = v;
        }
        if let Some(v) = get(ARCHIVE_FILE) {
            config.archive_file = v;
        }
        if let Some(v) = get(LEGACY_FILE) {
            config.legacy_file = v;
        }
        if let Some(v) = get(LINK_CONCURRENCY) {
            config.link_concurrency = parse_value(LINK_CONCURRENCY, &v)?;
        }
        if let Some(v) = get(LINK_REQUEST_TIMEOUT_SECS) {
            config.link_request_timeout_secs = parse_value(LINK_REQUEST_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = get(LINK_PHASE_TIMEOUT_SECS) {
            config.link_phase_timeout_secs = parse_value(LINK_PHASE_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = get(USER_AGENT) {
            config.user_agent = v;
        }
        if let Some(v) = get(ARCHIVE_GRACE_DAYS) {
            config.archive_grace_days = parse_value(ARCHIVE_GRACE_DAYS, &v)?;
        }
        if let Some(v) = get(ONLINE_GEOCODING) {
            config.online_geocoding = parse_bool(ONLINE_GEOCODING, &v)?;
        }
        if let Some(v) = get(NOMINATIM_URL) {
            config.nominatim_url = v;
        }

        debug!(config = ?self.config, "覆写后配置");
        Ok(())
    }

    /// 取值校验
    pub fn validate(&self) -> ImportResult<()> {
        let config = &self.config;

        if config.link_concurrency == 0 {
            return Err(value_error(
                config_keys::LINK_CONCURRENCY,
                "0",
                "并发数必须大于 0",
            ));
        }
        if config.link_request_timeout_secs == 0 {
            return Err(value_error(
                config_keys::LINK_REQUEST_TIMEOUT_SECS,
                "0",
                "超时必须大于 0",
            ));
        }
        if config.link_phase_timeout_secs == 0 {
            return Err(value_error(
                config_keys::LINK_PHASE_TIMEOUT_SECS,
                "0",
                "超时必须大于 0",
            ));
        }
        if config.archive_grace_days < 0 {
            return Err(value_error(
                config_keys::ARCHIVE_GRACE_DAYS,
                &config.archive_grace_days.to_string(),
                "宽限天数不能为负",
            ));
        }
        if config.archive_grace_days > MAX_ARCHIVE_GRACE_DAYS {
            return Err(value_error(
                config_keys::ARCHIVE_GRACE_DAYS,
                &config.archive_grace_days.to_string(),
                &format!("宽限天数不能超过 {}", MAX_ARCHIVE_GRACE_DAYS),
            ));
        }
        for (key, file) in [
            (config_keys::ACTIVE_FILE, &config.active_file),
            (config_keys::ARCHIVE_FILE, &config.archive_file),
            (config_keys::LEGACY_FILE, &config.legacy_file),
        ] {
            if !(file.ends_with(".yml") || file.ends_with(".yaml")) {
                return Err(value_error(key, file, "数据集文件必须是 .yml/.yaml"));
            }
        }
        if url::Url::parse(&config.nominatim_url).is_err() {
            return Err(value_error(
                config_keys::NOMINATIM_URL,
                &config.nominatim_url,
                "URL 无法解析",
            ));
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> ImportResult<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(value_error(key, value, "期望布尔值 (true/false/1/0)")),
    }
}

fn parse_value<T>(key: &str, value: &str) -> ImportResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| value_error(key, value, &e.to_string()))
}

fn value_error(key: &str, value: &str, message: &str) -> ImportError {
    ImportError::ConfigValueError {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    /// 环境变量前缀
    pub const ENV_PREFIX: &str = "DEADLINES_";

    // 校验开关
    pub const SKIP_LINKS: &str = "skip_links";
    pub const STRICT: &str = "strict";

    // 数据集路径
    pub const DATA_DIR: &str = "data_dir";
    pub const ACTIVE_FILE: &str = "active_file";
    pub const ARCHIVE_FILE: &str = "archive_file";
    pub const LEGACY_FILE: &str = "legacy_file";

    // 链接检查
    pub const LINK_CONCURRENCY: &str = "link_concurrency";
    pub const LINK_REQUEST_TIMEOUT_SECS: &str = "link_request_timeout_secs";
    pub const LINK_PHASE_TIMEOUT_SECS: &str = "link_phase_timeout_secs";
    pub const USER_AGENT: &str = "user_agent";

    // 归档
    pub const ARCHIVE_GRACE_DAYS: &str = "archive_grace_days";

    // 地理编码
    pub const ONLINE_GEOCODING: &str = "online_geocoding";
    pub const NOMINATIM_URL: &str = "nominatim_url";

    /// 配置键 → 环境变量名（skip_links → DEADLINES_SKIP_LINKS）
    pub fn env_var(key: &str) -> String {
        format!("{}{}", ENV_PREFIX, key.to_uppercase())
    }
}
