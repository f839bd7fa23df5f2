// ==========================================
// 会议截稿数据集 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 布尔类字段 / 分类标签 / 坐标精度
// ==========================================

use crate::importer::pipeline_trait::DataCleaner as DataCleanerTrait;
use serde_yaml::Value;

/// 坐标保留的小数位数
pub const COORDINATE_DECIMALS: i32 = 5;

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn parse_bool_like(&self, value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn normalize_categories(&self, value: &str) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in value.split(',') {
            let tag = tag.trim().to_uppercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    fn round_coordinate(&self, value: f64) -> f64 {
        let factor = 10f64.powi(COORDINATE_DECIMALS);
        (value * factor).round() / factor
    }
}

impl DataCleaner {
    /// 将 YAML 标量转为文本（数字也接受，用于 note 等自由文本）
    pub fn scalar_to_text(&self, value: &Value) -> Option<String> {
        match value {
            Value::String(s) => self.normalize_null(Some(s.clone())),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_basic() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  PyCon US  "), "PyCon US");
    }

    #[test]
    fn test_normalize_null() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.normalize_null(Some("  ".to_string())), None);
        assert_eq!(cleaner.normalize_null(Some("".to_string())), None);
        assert_eq!(
            cleaner.normalize_null(Some("  value  ".to_string())),
            Some("value".to_string())
        );
        assert_eq!(cleaner.normalize_null(None), None);
    }

    #[test]
    fn test_parse_bool_like() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_bool_like(&Value::Bool(true)), Some(true));
        assert_eq!(
            cleaner.parse_bool_like(&Value::String("True".to_string())),
            Some(true)
        );
        assert_eq!(
            cleaner.parse_bool_like(&Value::String(" false ".to_string())),
            Some(false)
        );
        assert_eq!(cleaner.parse_bool_like(&Value::Number(0.into())), Some(false));
        assert_eq!(
            cleaner.parse_bool_like(&Value::String("maybe".to_string())),
            None
        );
    }

    #[test]
    fn test_normalize_categories() {
        let cleaner = DataCleaner;
        assert_eq!(
            cleaner.normalize_categories(" py, data ,PY,,web"),
            vec!["PY".to_string(), "DATA".to_string(), "WEB".to_string()]
        );
        assert!(cleaner.normalize_categories(" , ").is_empty());
    }

    #[test]
    fn test_round_coordinate() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.round_coordinate(52.5200066), 52.52001);
        assert_eq!(cleaner.round_coordinate(-87.6297982), -87.6298);
        // 已规范化的值保持不变
        assert_eq!(cleaner.round_coordinate(13.40495), 13.40495);
    }
}
