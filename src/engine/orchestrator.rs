// ==========================================
// 会议截稿数据集 - 校验流水线编排器
// ==========================================
// 流程: 解析 → 字段模式 → 日期 → 地理/时区 → 重复 → 链接 → 报告 → 排序
// 发布: 全有或全无；任一致命违规（strict 模式下任一警告）即不写出
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::{
    ConferenceRecord, NormalizedRecord, RawConferenceRecord, ValidationReport, Violation,
    ViolationKind,
};
use crate::engine::archiver::Archiver;
use crate::engine::sorter::DeadlineSorter;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::write_datasets;
use crate::importer::pipeline_trait::{
    DatasetParser, DateValidator, DuplicateDetector, FieldSchema, Geocoder, LinkProbe,
    TimezoneLocator,
};
use crate::importer::{
    ChainedGeocoder, DateValidatorImpl, DuplicateDetectorImpl, FieldSchemaImpl, Gazetteer,
    GeoNormalizer, HttpLinkProbe, LinkValidator, NominatimGeocoder, YamlDatasetParser,
};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// PipelineOutcome - 流水线结果
// ==========================================
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub records: Vec<NormalizedRecord>, // 规范化并排序后的活动数据集
    pub report: ValidationReport,
    pub elapsed: Duration,
}

impl PipelineOutcome {
    pub fn passes(&self, strict: bool) -> bool {
        self.report.passes(strict)
    }
}

// ==========================================
// SortOutcome - sort 命令结果
// ==========================================
#[derive(Debug, Clone)]
pub struct SortOutcome {
    pub pipeline: PipelineOutcome,
    pub written: bool,   // 是否写出（未通过时为 false）
    pub archived: usize, // 本次移入归档的条目数
}

// ==========================================
// ValidationPipeline - 校验流水线
// ==========================================
pub struct ValidationPipeline {
    config: PipelineConfig,

    // 流水线组件
    parser: YamlDatasetParser,
    field_schema: Box<dyn FieldSchema>,
    date_validator: Box<dyn DateValidator>,
    geo_normalizer: GeoNormalizer,
    duplicate_detector: Box<dyn DuplicateDetector>,
    link_validator: LinkValidator,

    sorter: DeadlineSorter,
}

impl ValidationPipeline {
    /// 创建流水线（外部能力由调用方注入）
    ///
    /// # 参数
    /// - config: 流水线配置
    /// - geocoder: 地点 → 坐标
    /// - timezone_locator: 坐标 → IANA 时区
    /// - link_probe: URL 可达性探测
    pub fn new(
        config: PipelineConfig,
        geocoder: Arc<dyn Geocoder>,
        timezone_locator: Arc<dyn TimezoneLocator>,
        link_probe: Arc<dyn LinkProbe>,
    ) -> Self {
        let link_validator = LinkValidator::new(
            link_probe,
            config.link_concurrency,
            config.link_phase_timeout(),
        );

        Self {
            parser: YamlDatasetParser,
            field_schema: Box::new(FieldSchemaImpl::new()),
            date_validator: Box::new(DateValidatorImpl),
            geo_normalizer: GeoNormalizer::new(geocoder, timezone_locator),
            duplicate_detector: Box::new(DuplicateDetectorImpl),
            link_validator,
            sorter: DeadlineSorter::new(),
            config,
        }
    }

    /// 按配置装配默认组件
    ///
    /// - 地理编码: 内置地名表；online_geocoding 时追加 Nominatim
    /// - 时区推断: 内置地名表（最近城市）
    /// - 链接探测: reqwest
    pub fn from_config(config: PipelineConfig) -> ImportResult<Self> {
        let gazetteer = Arc::new(Gazetteer::default());

        let geocoder: Arc<dyn Geocoder> = if config.online_geocoding {
            let nominatim = NominatimGeocoder::new(&config.nominatim_url, &config.user_agent)?;
            let chain: Vec<Arc<dyn Geocoder>> = vec![gazetteer.clone(), Arc::new(nominatim)];
            Arc::new(ChainedGeocoder::new(chain))
        } else {
            gazetteer.clone()
        };

        let probe = HttpLinkProbe::new(config.link_request_timeout(), &config.user_agent)?;

        Ok(Self::new(config, geocoder, gazetteer, Arc::new(probe)))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 校验活动数据集（不写出）
    pub async fn validate(&self) -> ImportResult<PipelineOutcome> {
        let raw_records = self.parser.parse_to_raw_records(&self.config.active_path())?;
        let mut existing = self.load_existing(&self.config.archive_path())?;
        existing.extend(self.load_existing(&self.config.legacy_path())?);

        Ok(self.run(raw_records, &existing).await)
    }

    /// 校验 + 排序 + 归档 + 写出
    ///
    /// # 参数
    /// - now: 归档判定基准时间
    /// - archive: 是否执行归档
    pub async fn sort(&self, now: DateTime<Utc>, archive: bool) -> ImportResult<SortOutcome> {
        let archive_path = self.config.archive_path();
        let raw_records = self.parser.parse_to_raw_records(&self.config.active_path())?;
        let archived_records = self.load_existing(&archive_path)?;
        let mut existing = archived_records.clone();
        existing.extend(self.load_existing(&self.config.legacy_path())?);

        let mut pipeline = self.run(raw_records, &existing).await;

        if !pipeline.passes(self.config.strict) {
            warn!(
                run_id = %pipeline.run_id,
                fatal = pipeline.report.summary.fatal,
                warning = pipeline.report.summary.warning,
                "校验未通过，数据集未写出"
            );
            return Ok(SortOutcome {
                pipeline,
                written: false,
                archived: 0,
            });
        }

        // === 归档 ===
        let mut archived = 0;
        let mut merged_archive: Option<Vec<ConferenceRecord>> = None;
        if archive {
            let archiver = Archiver::new(self.config.archive_grace_days);
            let split = archiver.split(std::mem::take(&mut pipeline.records), now);
            archived = split.expired.len();
            pipeline.records = split.active;

            if archived > 0 {
                let moved = split.expired.into_iter().map(|r| r.record).collect();
                merged_archive = Some(archiver.merge(archived_records, moved));
            }
        }
        pipeline.report.summary.archived = archived;

        // === 写出（归档 + 活动数据集一起提交）===
        let active_path = self.config.active_path();
        let active: Vec<ConferenceRecord> =
            pipeline.records.iter().map(|r| r.record.clone()).collect();
        let mut datasets: Vec<(&Path, &[ConferenceRecord])> = Vec::with_capacity(2);
        if let Some(merged) = merged_archive.as_deref() {
            datasets.push((archive_path.as_path(), merged));
        }
        datasets.push((active_path.as_path(), active.as_slice()));
        write_datasets(&datasets)?;

        if archived > 0 {
            info!(archived = archived, path = %archive_path.display(), "归档已写出");
        }
        info!(count = active.len(), "活动数据集已写出");

        Ok(SortOutcome {
            pipeline,
            written: true,
            archived,
        })
    }

    /// 执行校验流水线
    ///
    /// # 参数
    /// - raw_records: 活动数据集原始条目
    /// - existing: 归档/历史数据集（跨数据集重复检测）
    #[instrument(skip(self, raw_records, existing), fields(run_id))]
    pub async fn run(
        &self,
        raw_records: Vec<RawConferenceRecord>,
        existing: &[ConferenceRecord],
    ) -> PipelineOutcome {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let total_records = raw_records.len();
        info!(run_id = %run_id, total_records = total_records, "开始校验数据集");

        let mut violations: Vec<Violation> = Vec::new();

        // === 步骤 1: 字段模式 ===
        debug!("步骤 1: 字段模式校验");
        let mut mapped = Vec::with_capacity(total_records);
        // 字段模式未通过的条目不进入后续阶段，但日期与链接协议仍基于原始值校验
        let mut rejected: Vec<&RawConferenceRecord> = Vec::new();
        for raw in &raw_records {
            let outcome = self.field_schema.map_to_record(raw);
            violations.extend(outcome.violations);
            match outcome.record {
                Some(record) => mapped.push((raw.entry_number, record)),
                None => rejected.push(raw),
            }
        }
        info!(mapped = mapped.len(), rejected = rejected.len(), "字段模式校验完成");

        // === 步骤 2: 日期 ===
        debug!("步骤 2: 日期校验");
        for (entry_number, record) in mapped.iter_mut() {
            violations.extend(self.date_validator.validate_dates(*entry_number, record));
        }
        for raw in &rejected {
            violations.extend(self.date_validator.validate_raw_dates(raw));
        }

        // === 步骤 3: 地理/时区 ===
        debug!("步骤 3: 地理/时区规范化");
        let mut normalized = Vec::with_capacity(mapped.len());
        for (entry_number, record) in mapped {
            let (record, geo_violations) = self.geo_normalizer.normalize(entry_number, record).await;
            violations.extend(geo_violations);
            normalized.push(record);
        }

        // === 步骤 4: 重复 ===
        debug!("步骤 4: 重复检测");
        let duplicates = self.duplicate_detector.detect_duplicates(&normalized);
        for (entry_number, identity) in &duplicates {
            violations.push(Violation::new(
                *entry_number,
                identity.to_string(),
                ViolationKind::DuplicateConference,
                "conference",
                format!("第 {} 条与之前的条目身份重复: {}", entry_number, identity),
            ));
        }
        let cross_duplicates = self
            .duplicate_detector
            .detect_cross_dataset_duplicates(&normalized, existing);
        for (entry_number, identity) in &cross_duplicates {
            violations.push(Violation::new(
                *entry_number,
                identity.to_string(),
                ViolationKind::DuplicateConference,
                "conference",
                format!("已存在于归档/历史数据集: {}", identity),
            ));
        }
        info!(
            duplicates = duplicates.len(),
            cross_dataset = cross_duplicates.len(),
            "重复检测完成"
        );

        // === 步骤 5: 链接 ===
        debug!("步骤 5: 链接校验");
        violations.extend(
            self.link_validator
                .validate(&normalized, self.config.skip_links)
                .await,
        );
        violations.extend(self.link_validator.check_raw_schemes(&rejected));

        // === 步骤 6: 报告 + 排序 ===
        let report = ValidationReport::from_violations(run_id.clone(), total_records, violations);
        let records = self.sorter.sort(normalized);

        let elapsed = start_time.elapsed();
        if report.has_fatal() {
            error!(
                run_id = %run_id,
                fatal = report.summary.fatal,
                warning = report.summary.warning,
                elapsed_ms = elapsed.as_millis() as u64,
                "数据集校验失败"
            );
        } else {
            info!(
                run_id = %run_id,
                valid_records = report.summary.valid_records,
                warning = report.summary.warning,
                elapsed_ms = elapsed.as_millis() as u64,
                "数据集校验完成"
            );
        }

        PipelineOutcome {
            run_id,
            records,
            report,
            elapsed,
        }
    }

    /// 加载归档/历史数据集（文件不存在视为空）
    ///
    /// 这些数据集由本工具写出，字段模式不通过视为数据集结构错误
    pub fn load_existing(&self, path: &Path) -> ImportResult<Vec<ConferenceRecord>> {
        let raw_records = self.parser.parse_optional(path)?;
        let mut records = Vec::with_capacity(raw_records.len());

        for raw in &raw_records {
            let outcome = self.field_schema.map_to_record(raw);
            match outcome.record {
                Some(record) => records.push(record),
                None => {
                    let reasons: Vec<String> = outcome
                        .violations
                        .iter()
                        .filter(|v| v.is_fatal())
                        .map(|v| format!("{} {}", v.field, v.message))
                        .collect();
                    return Err(ImportError::DatasetShapeError {
                        path: path.display().to_string(),
                        message: format!(
                            "第 {} 条 ({}) 无法识别: {}",
                            raw.entry_number,
                            raw.identity_hint(),
                            reasons.join("; ")
                        ),
                    });
                }
            }
        }

        debug!(path = %path.display(), count = records.len(), "已有数据集加载完成");
        Ok(records)
    }
}
