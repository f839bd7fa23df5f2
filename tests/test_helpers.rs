// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据集目录、YAML 条目、外部能力 mock
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use conf_deadlines::config::PipelineConfig;
use conf_deadlines::domain::Coordinates;
use conf_deadlines::engine::ValidationPipeline;
use conf_deadlines::importer::{Gazetteer, Geocoder, ImportResult, LinkProbe, LinkStatus};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// ==========================================
// YAML 条目构造
// ==========================================

/// 构造一条合法的 YAML 条目
///
/// # 参数
/// - conference / year / place: 身份与地点
/// - cfp: 截稿时间
pub fn conference_entry(conference: &str, year: i32, place: &str, cfp: &str) -> String {
    format!(
        r#"- conference: {conference}
  year: {year}
  link: https://{slug}.example.org
  cfp: '{cfp}'
  place: {place}
  start: '{year}-06-01'
  end: '{year}-06-03'
  sub: PY
"#,
        slug = conference.to_lowercase().replace(' ', "-"),
    )
}

/// 在条目末尾追加字段（每行 "key: value"）
pub fn with_fields(entry: &str, fields: &[(&str, &str)]) -> String {
    let mut entry = entry.to_string();
    for (key, value) in fields {
        entry.push_str(&format!("  {}: {}\n", key, value));
    }
    entry
}

// ==========================================
// 数据集目录
// ==========================================

/// 创建临时数据集目录，写入活动数据集
pub fn create_data_dir(active_yaml: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    write_file(dir.path(), "conferences.yml", active_yaml);
    dir
}

pub fn write_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("写入测试文件失败");
}

pub fn read_file(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).expect("读取测试文件失败")
}

/// 指向临时目录的测试配置
pub fn test_config(data_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: data_dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

// ==========================================
// 外部能力 mock
// ==========================================

/// 可达性 mock: 指定 URL 不可达，其余可达；统计调用次数
pub struct MockLinkProbe {
    dead: HashSet<String>,
    calls: AtomicUsize,
}

impl MockLinkProbe {
    pub fn all_reachable() -> Self {
        Self::with_dead(&[])
    }

    pub fn with_dead(urls: &[&str]) -> Self {
        Self {
            dead: urls.iter().map(|u| u.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkProbe for MockLinkProbe {
    async fn probe(&self, url: &str) -> LinkStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.dead.contains(url) {
            LinkStatus::Unreachable(404)
        } else {
            LinkStatus::Reachable(200)
        }
    }
}

/// 地理编码 mock: 总是找不到
pub struct NotFoundGeocoder;

#[async_trait]
impl Geocoder for NotFoundGeocoder {
    async fn locate(&self, _place: &str) -> ImportResult<Option<Coordinates>> {
        Ok(None)
    }
}

/// 使用内置地名表 + 给定链接探测的流水线
pub fn create_test_pipeline(
    config: PipelineConfig,
    probe: Arc<MockLinkProbe>,
) -> ValidationPipeline {
    let gazetteer = Arc::new(Gazetteer::default());
    ValidationPipeline::new(config, gazetteer.clone(), gazetteer, probe)
}
