// ==========================================
// 会议截稿数据集 - 校验层
// ==========================================
// 职责: YAML 数据集 → 字段模式 → 日期 → 地理/时区 → 重复 → 链接
// 支持: YAML (.yml/.yaml)
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod date_validator;
pub mod duplicate_detector;
pub mod error;
pub mod field_schema;
pub mod file_parser;
pub mod gazetteer;
pub mod geo_normalizer;
pub mod geocoding;
pub mod link_validator;
pub mod pipeline_trait;

// 重导出核心类型
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use date_validator::DateValidator as DateValidatorImpl;
pub use duplicate_detector::DuplicateDetector as DuplicateDetectorImpl;
pub use error::{ImportError, ImportResult};
pub use field_schema::FieldSchema as FieldSchemaImpl;
pub use file_parser::{write_datasets, YamlDatasetParser};
pub use gazetteer::Gazetteer;
pub use geo_normalizer::GeoNormalizer;
pub use geocoding::{ChainedGeocoder, NominatimGeocoder};
pub use link_validator::{HttpLinkProbe, LinkValidator};

// 重导出 Trait 接口
pub use pipeline_trait::{
    DataCleaner, DatasetParser, DateValidator, DuplicateDetector, FieldSchema, Geocoder,
    LinkProbe, LinkStatus, SchemaOutcome, TimezoneLocator,
};
