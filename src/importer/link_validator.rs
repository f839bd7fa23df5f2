// ==========================================
// 会议截稿数据集 - 链接校验器实现
// ==========================================
// 职责:
// - 协议校验（始终执行，离线）: URL 可解析 + 必须 https
// - 可达性校验（可跳过）: 每个唯一 URL 探测一次，结果按 URL 缓存
// 并发: buffer_unordered 限流；整体超时后剩余检查降级为 LinkCheckSkipped
// ==========================================

use crate::domain::{NormalizedRecord, RawConferenceRecord, Violation, ViolationKind};
use crate::importer::error::ImportResult;
use crate::importer::pipeline_trait::{LinkProbe, LinkStatus};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indexmap::IndexSet;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

// ==========================================
// HttpLinkProbe - 基于 reqwest 的链接探测
// ==========================================
pub struct HttpLinkProbe {
    client: reqwest::Client,
}

impl HttpLinkProbe {
    pub fn new(request_timeout: Duration, user_agent: &str) -> ImportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkProbe for HttpLinkProbe {
    /// HEAD 优先；服务端拒绝 HEAD（405/403）或请求失败时回退 GET
    async fn probe(&self, url: &str) -> LinkStatus {
        let head = self.client.head(url).send().await;
        let head_status = head.as_ref().ok().map(|response| response.status());

        let result = if needs_get_fallback(head_status) {
            debug!(url = %url, "HEAD 不可用，回退 GET");
            self.client.get(url).send().await
        } else {
            head
        };

        match result {
            Ok(response) => status_of(response.status()),
            Err(e) => LinkStatus::Failed(e.to_string()),
        }
    }
}

/// HEAD 结果是否需要回退 GET（None 表示 HEAD 请求失败）
fn needs_get_fallback(head_status: Option<StatusCode>) -> bool {
    match head_status {
        Some(status) => matches!(status, StatusCode::METHOD_NOT_ALLOWED | StatusCode::FORBIDDEN),
        None => true,
    }
}

fn status_of(status: StatusCode) -> LinkStatus {
    if status.is_success() || status.is_redirection() {
        LinkStatus::Reachable(status.as_u16())
    } else {
        LinkStatus::Unreachable(status.as_u16())
    }
}

// ==========================================
// LinkValidator
// ==========================================
pub struct LinkValidator {
    probe: Arc<dyn LinkProbe>,
    cache: Arc<Mutex<HashMap<String, LinkStatus>>>,
    concurrency: usize,
    phase_timeout: Duration,
}

/// 单条链接引用（条目序号 / 身份 / 字段 / URL）
#[derive(Debug, Clone)]
struct LinkRef {
    entry_number: usize,
    identity: String,
    field: &'static str,
    url: String,
}

impl LinkValidator {
    pub fn new(probe: Arc<dyn LinkProbe>, concurrency: usize, phase_timeout: Duration) -> Self {
        Self {
            probe,
            cache: Arc::new(Mutex::new(HashMap::new())),
            concurrency: concurrency.max(1),
            phase_timeout,
        }
    }

    /// 校验全部链接
    ///
    /// # 参数
    /// - skip_reachability: true 时只做协议校验
    pub async fn validate(
        &self,
        records: &[NormalizedRecord],
        skip_reachability: bool,
    ) -> Vec<Violation> {
        let mut violations = self.check_schemes(records);

        if skip_reachability {
            debug!("跳过链接可达性检查");
        } else {
            violations.extend(self.check_reachability(records).await);
        }

        violations
    }

    /// 协议校验: URL 必须可解析且为 https
    pub fn check_schemes(&self, records: &[NormalizedRecord]) -> Vec<Violation> {
        scheme_violations(collect_links(records))
    }

    /// 字段模式未通过的条目: 直接检查原始链接字段的协议
    pub fn check_raw_schemes(&self, records: &[&RawConferenceRecord]) -> Vec<Violation> {
        scheme_violations(collect_raw_links(records))
    }

    /// 可达性校验（软校验，只产生警告）
    pub async fn check_reachability(&self, records: &[NormalizedRecord]) -> Vec<Violation> {
        // 只探测协议合法的 https 链接
        let links: Vec<LinkRef> = collect_links(records)
            .into_iter()
            .filter(|l| Url::parse(&l.url).map(|u| u.scheme() == "https").unwrap_or(false))
            .collect();

        let urls: IndexSet<String> = links.iter().map(|l| l.url.clone()).collect();
        info!(unique_urls = urls.len(), concurrency = self.concurrency, "开始链接可达性检查");

        let probing = stream::iter(urls.into_iter().map(|url| {
            let probe = Arc::clone(&self.probe);
            let cache = Arc::clone(&self.cache);
            async move {
                if cache.lock().await.contains_key(&url) {
                    return;
                }
                let status = probe.probe(&url).await;
                debug!(url = %url, status = ?status, "链接探测完成");
                cache.lock().await.insert(url, status);
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect::<Vec<()>>();

        if tokio::time::timeout(self.phase_timeout, probing).await.is_err() {
            warn!(timeout_secs = self.phase_timeout.as_secs(), "链接检查整体超时，剩余链接跳过");
        }

        let cache = self.cache.lock().await;
        let mut violations = Vec::new();
        for link in links {
            match cache.get(&link.url) {
                Some(status) if status.is_reachable() => {}
                Some(status) => {
                    let detail = match status {
                        LinkStatus::Unreachable(code) => format!("HTTP {}", code),
                        LinkStatus::Failed(message) => message.clone(),
                        LinkStatus::Reachable(_) => String::new(),
                    };
                    violations.push(Violation::new(
                        link.entry_number,
                        link.identity,
                        ViolationKind::LinkUnreachable,
                        link.field,
                        format!("链接不可达 ({}): {}", detail, link.url),
                    ));
                }
                None => violations.push(Violation::new(
                    link.entry_number,
                    link.identity,
                    ViolationKind::LinkCheckSkipped,
                    link.field,
                    format!("链接检查超时未完成: {}", link.url),
                )),
            }
        }

        violations
    }
}

fn scheme_violations(links: Vec<LinkRef>) -> Vec<Violation> {
    let mut violations = Vec::new();

    for link in links {
        match Url::parse(&link.url) {
            Ok(parsed) if parsed.scheme() == "https" => {}
            Ok(parsed) => violations.push(Violation::new(
                link.entry_number,
                link.identity,
                ViolationKind::InsecureScheme,
                link.field,
                format!("链接必须使用 https，实际为 {}: {}", parsed.scheme(), link.url),
            )),
            Err(e) => violations.push(Violation::new(
                link.entry_number,
                link.identity,
                ViolationKind::InvalidUrl,
                link.field,
                format!("URL 无法解析 ({}): {}", e, link.url),
            )),
        }
    }

    violations
}

/// 社交账号字段只有值为 URL 时才校验（@pycon 这类账号名跳过）
const SOCIAL_FIELDS: &[&str] = &["twitter", "mastodon", "bluesky"];

/// 收集记录中的全部链接（文件顺序）
fn collect_links(records: &[NormalizedRecord]) -> Vec<LinkRef> {
    records
        .iter()
        .flat_map(|normalized| {
            let record = &normalized.record;
            link_refs(
                normalized.entry_number,
                &record.identity().to_string(),
                [
                    ("link", Some(record.link.as_str())),
                    ("cfp_link", record.cfp_link.as_deref()),
                    ("twitter", record.twitter.as_deref()),
                    ("mastodon", record.mastodon.as_deref()),
                    ("bluesky", record.bluesky.as_deref()),
                ],
            )
        })
        .collect()
}

fn collect_raw_links(records: &[&RawConferenceRecord]) -> Vec<LinkRef> {
    records
        .iter()
        .flat_map(|raw| {
            let text = |field: &str| raw.fields.get(field).and_then(|v| v.as_str());
            link_refs(
                raw.entry_number,
                &raw.identity_hint(),
                [
                    ("link", text("link")),
                    ("cfp_link", text("cfp_link")),
                    ("twitter", text("twitter")),
                    ("mastodon", text("mastodon")),
                    ("bluesky", text("bluesky")),
                ],
            )
        })
        .collect()
}

fn link_refs(
    entry_number: usize,
    identity: &str,
    values: [(&'static str, Option<&str>); 5],
) -> Vec<LinkRef> {
    values
        .into_iter()
        .filter_map(|(field, value)| {
            let url = value?.trim();
            if url.is_empty() || (SOCIAL_FIELDS.contains(&field) && !url.contains("://")) {
                return None;
            }
            Some(LinkRef {
                entry_number,
                identity: identity.to_string(),
                field,
                url: url.to_string(),
            })
        })
        .collect()
}
