// ==========================================
// 会议截稿数据集 - 校验管道 Trait
// ==========================================
// 职责: 定义各校验阶段接口（不包含实现）
// 说明: 地理编码 / 时区定位 / 链接探测属于外部能力，
//       以 Trait 注入，测试中可替换为 Mock
// ==========================================

use crate::domain::{
    ConferenceRecord, Coordinates, NormalizedRecord, RawConferenceRecord, RecordIdentity,
    Violation,
};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// DatasetParser Trait
// ==========================================
// 用途: 数据集文件解析（阶段 0）
// 实现者: YamlDatasetParser
pub trait DatasetParser: Send + Sync {
    /// 解析数据集文件为原始条目列表（保持文件顺序）
    ///
    /// # 返回
    /// - Ok(Vec<RawConferenceRecord>): 原始条目
    /// - Err: 文件不存在、YAML 语法错误、顶层不是序列
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawConferenceRecord>>;
}

// ==========================================
// SchemaOutcome - 字段模式校验结果
// ==========================================
#[derive(Debug, Clone)]
pub struct SchemaOutcome {
    /// 无致命违规时为 Some
    pub record: Option<ConferenceRecord>,
    /// 致命违规与警告
    pub violations: Vec<Violation>,
}

// ==========================================
// FieldSchema Trait
// ==========================================
// 用途: 字段类型检查与强制转换（阶段 1）
// 实现者: FieldSchemaImpl
pub trait FieldSchema: Send + Sync {
    /// 将原始条目映射为 ConferenceRecord
    ///
    /// # 规则
    /// - 必填字段缺失 → MissingField
    /// - 类型不符 → InvalidType
    /// - year < 1989 → OutOfRange
    /// - 未知字段 → UnknownField（警告，保留原值）
    fn map_to_record(&self, raw: &RawConferenceRecord) -> SchemaOutcome;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 文本/布尔/分类/坐标清洗
// 实现者: DataCleanerImpl
pub trait DataCleaner: Send + Sync {
    /// 清洗文本字段（TRIM）
    fn clean_text(&self, value: &str) -> String;

    /// 标准化 NULL 值（空字符串/空白 → None）
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 布尔类字段解析（"true"/"false"/"yes"/"no"/"1"/"0"）
    ///
    /// # 返回
    /// - None: 无法识别
    fn parse_bool_like(&self, value: &serde_yaml::Value) -> Option<bool>;

    /// 分类标签标准化（拆分逗号、TRIM、UPPER、去重，保持顺序）
    fn normalize_categories(&self, value: &str) -> Vec<String>;

    /// 坐标四舍五入到 5 位小数
    fn round_coordinate(&self, value: f64) -> f64;
}

// ==========================================
// DateValidator Trait
// ==========================================
// 用途: 日期格式与先后顺序校验（阶段 2）
// 实现者: DateValidatorImpl
pub trait DateValidator: Send + Sync {
    /// 校验并规范化记录中的所有日期字段（原地改写为规范写法）
    ///
    /// # 规则
    /// - 非法格式 → InvalidDateFormat
    /// - cfp > start / start > end / cfp_ext < cfp → DateOrderingViolation
    /// - 哨兵值（TBA/Cancelled/None）跳过顺序校验
    fn validate_dates(&self, entry_number: usize, record: &mut ConferenceRecord) -> Vec<Violation>;

    /// 字段模式未通过的条目: 对原始值中可读的日期字段做同样的校验（不回写）
    fn validate_raw_dates(&self, raw: &RawConferenceRecord) -> Vec<Violation>;
}

// ==========================================
// Geocoder Trait
// ==========================================
// 用途: 地名 → 坐标（外部能力）
// 实现者: Gazetteer（离线）, NominatimGeocoder（在线）
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// 解析地名
    ///
    /// # 返回
    /// - Ok(Some): 解析成功
    /// - Ok(None): 未找到
    /// - Err: 服务调用失败（调用方按未找到处理并记录警告）
    async fn locate(&self, place: &str) -> ImportResult<Option<Coordinates>>;
}

// ==========================================
// TimezoneLocator Trait
// ==========================================
// 用途: 坐标 → IANA 时区（外部能力）
// 实现者: Gazetteer
pub trait TimezoneLocator: Send + Sync {
    fn timezone_at(&self, coordinates: Coordinates) -> Option<String>;
}

// ==========================================
// DuplicateDetector Trait
// ==========================================
// 用途: 身份重复检测（阶段 4，需完整数据集）
// 实现者: DuplicateDetectorImpl
pub trait DuplicateDetector: Send + Sync {
    /// 检测活动数据集内的重复会议
    ///
    /// # 返回
    /// - Vec<(条目序号, 身份)>: 重复记录（不包括第一次出现）
    fn detect_duplicates(&self, records: &[NormalizedRecord]) -> Vec<(usize, RecordIdentity)>;

    /// 检测与归档/历史数据集的跨数据集重复
    fn detect_cross_dataset_duplicates(
        &self,
        records: &[NormalizedRecord],
        existing: &[ConferenceRecord],
    ) -> Vec<(usize, RecordIdentity)>;
}

// ==========================================
// LinkStatus - 链接探测结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Reachable(u16),    // 2xx / 3xx
    Unreachable(u16),  // 其他状态码
    Failed(String),    // 网络错误 / 超时
}

impl LinkStatus {
    pub fn is_reachable(&self) -> bool {
        matches!(self, LinkStatus::Reachable(_))
    }
}

// ==========================================
// LinkProbe Trait
// ==========================================
// 用途: 单个 URL 的可达性探测（外部能力）
// 实现者: HttpLinkProbe
#[async_trait]
pub trait LinkProbe: Send + Sync {
    async fn probe(&self, url: &str) -> LinkStatus;
}
