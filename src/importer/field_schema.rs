// ==========================================
// 会议截稿数据集 - 字段模式校验器实现
// ==========================================
// 职责: 原始条目 → ConferenceRecord
//       必填检查 + 类型检查 + 强制转换 + 未知字段警告
// 说明: 日期字段在此只检查类型，格式与顺序由 DateValidator 负责
// ==========================================

use crate::domain::types::MIN_YEAR;
use crate::domain::{
    CategorySet, ConferenceRecord, GeoLocation, RawConferenceRecord, Violation, ViolationKind,
};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::pipeline_trait::{
    DataCleaner as DataCleanerTrait, FieldSchema as FieldSchemaTrait, SchemaOutcome,
};
use indexmap::IndexMap;
use serde_yaml::Value;

/// 已知字段（必填 + 可选）
pub const KNOWN_FIELDS: &[&str] = &[
    "conference",
    "alt_name",
    "year",
    "link",
    "cfp_link",
    "cfp",
    "cfp_ext",
    "workshop_deadline",
    "tutorial_deadline",
    "timezone",
    "place",
    "extra_places",
    "start",
    "end",
    "sub",
    "sponsor",
    "finaid",
    "twitter",
    "mastodon",
    "bluesky",
    "note",
    "location",
];

/// 已知分类标签
pub const KNOWN_CATEGORIES: &[&str] = &["PY", "SCIPY", "DATA", "WEB", "BIZ", "GEO", "CAMP", "DAY"];

/// 布尔类字段前缀
const BOOL_FIELD_PREFIX: &str = "has_";

pub struct FieldSchema {
    cleaner: DataCleaner,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSchemaTrait for FieldSchema {
    fn map_to_record(&self, raw: &RawConferenceRecord) -> SchemaOutcome {
        let mut ctx = FieldContext::new(raw, &self.cleaner);

        // 身份
        let conference = ctx.required_text("conference");
        let alt_name = ctx.optional_text("alt_name");
        let year = ctx.required_year();

        // 链接（协议检查由 LinkValidator 负责）
        let link = ctx.required_text("link");
        let cfp_link = ctx.optional_text("cfp_link");

        // 截稿时间
        let cfp = ctx.required_text("cfp");
        let cfp_ext = ctx.optional_text("cfp_ext");
        let workshop_deadline = ctx.optional_text("workshop_deadline");
        let tutorial_deadline = ctx.optional_text("tutorial_deadline");
        let timezone = ctx.optional_text("timezone");

        // 地点与日期
        let place = ctx.required_text("place");
        let extra_places = ctx.optional_text_list("extra_places");
        let start = ctx.required_text("start");
        let end = ctx.required_text("end");

        // 分类与附加信息
        let sub = ctx.required_categories();
        let sponsor = ctx.optional_text("sponsor");
        let finaid = ctx.optional_bool("finaid");
        let twitter = ctx.optional_text("twitter");
        let mastodon = ctx.optional_text("mastodon");
        let bluesky = ctx.optional_text("bluesky");
        let note = ctx.optional_free_text("note");
        let location = ctx.optional_locations();

        let extra = ctx.extra_fields();

        let record = match (conference, year, link, cfp, place, start, end, sub) {
            (
                Some(conference),
                Some(year),
                Some(link),
                Some(cfp),
                Some(place),
                Some(start),
                Some(end),
                Some(sub),
            ) if !ctx.has_fatal() => Some(ConferenceRecord {
                conference,
                alt_name,
                year,
                link,
                cfp_link,
                cfp,
                cfp_ext,
                workshop_deadline,
                tutorial_deadline,
                timezone,
                place,
                extra_places,
                start,
                end,
                sub,
                sponsor,
                finaid,
                twitter,
                mastodon,
                bluesky,
                note,
                location,
                extra,
            }),
            _ => None,
        };

        SchemaOutcome {
            record,
            violations: ctx.violations,
        }
    }
}

// ==========================================
// FieldContext - 单条记录的字段读取上下文
// ==========================================
// 逐字段读取并累积违规，不在第一个错误处中断
struct FieldContext<'a> {
    raw: &'a RawConferenceRecord,
    cleaner: &'a DataCleaner,
    identity: String,
    violations: Vec<Violation>,
}

impl<'a> FieldContext<'a> {
    fn new(raw: &'a RawConferenceRecord, cleaner: &'a DataCleaner) -> Self {
        Self {
            raw,
            cleaner,
            identity: raw.identity_hint(),
            violations: Vec::new(),
        }
    }

    fn push(&mut self, kind: ViolationKind, field: &str, message: String) {
        self.violations.push(Violation::new(
            self.raw.entry_number,
            self.identity.clone(),
            kind,
            field,
            message,
        ));
    }

    fn has_fatal(&self) -> bool {
        self.violations.iter().any(|v| v.is_fatal())
    }

    /// 取非空值（null 视为缺失）
    fn value(&self, field: &str) -> Option<&'a Value> {
        match self.raw.fields.get(field) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    fn missing(&mut self, field: &str) {
        self.push(
            ViolationKind::MissingField,
            field,
            format!("缺少必填字段: {}", field),
        );
    }

    fn wrong_type(&mut self, field: &str, expected: &str, value: &Value) {
        self.push(
            ViolationKind::InvalidType,
            field,
            format!("类型错误: 期望 {}，实际 {}", expected, describe(value)),
        );
    }

    fn text(&mut self, field: &str) -> Option<String> {
        match self.value(field)? {
            Value::String(s) => self.cleaner.normalize_null(Some(s.clone())),
            other => {
                self.wrong_type(field, "字符串", other);
                None
            }
        }
    }

    fn required_text(&mut self, field: &str) -> Option<String> {
        let present = self.value(field).is_some();
        let text = self.text(field);
        if text.is_none() && (!present || !self.has_type_error(field)) {
            self.missing(field);
        }
        text
    }

    fn optional_text(&mut self, field: &str) -> Option<String> {
        self.text(field)
    }

    /// 自由文本: 数字/布尔也按文本接受
    fn optional_free_text(&mut self, field: &str) -> Option<String> {
        let value = self.value(field)?;
        match self.cleaner.scalar_to_text(value) {
            Some(text) => Some(text),
            None if matches!(value, Value::String(_)) => None,
            None => {
                self.wrong_type(field, "文本", value);
                None
            }
        }
    }

    fn has_type_error(&self, field: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.kind == ViolationKind::InvalidType)
    }

    fn required_year(&mut self) -> Option<i32> {
        let field = "year";
        let Some(value) = self.value(field) else {
            self.missing(field);
            return None;
        };

        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        let Some(year) = parsed else {
            self.wrong_type(field, "整数", value);
            return None;
        };

        match i32::try_from(year) {
            Ok(year) if year >= MIN_YEAR => Some(year),
            _ => {
                self.push(
                    ViolationKind::OutOfRange,
                    field,
                    format!("年份 {} 超出范围（需 >= {}）", year, MIN_YEAR),
                );
                None
            }
        }
    }

    fn optional_text_list(&mut self, field: &str) -> Option<Vec<String>> {
        let value = self.value(field)?;
        let Value::Sequence(items) = value else {
            self.wrong_type(field, "字符串列表", value);
            return None;
        };

        let mut list = Vec::new();
        for item in items {
            match item {
                Value::String(s) => {
                    if let Some(s) = self.cleaner.normalize_null(Some(s.clone())) {
                        list.push(s);
                    }
                }
                other => {
                    self.wrong_type(field, "字符串", other);
                    return None;
                }
            }
        }

        if list.is_empty() {
            None
        } else {
            Some(list)
        }
    }

    fn required_categories(&mut self) -> Option<CategorySet> {
        let field = "sub";
        let raw = self.required_text(field)?;
        let tags = self.cleaner.normalize_categories(&raw);
        if tags.is_empty() {
            self.missing(field);
            return None;
        }

        for tag in &tags {
            if !KNOWN_CATEGORIES.contains(&tag.as_str()) {
                self.push(
                    ViolationKind::UnknownCategory,
                    field,
                    format!("未知分类标签: {}", tag),
                );
            }
        }

        Some(CategorySet(tags))
    }

    fn optional_bool(&mut self, field: &str) -> Option<bool> {
        let value = self.value(field)?;
        match self.cleaner.parse_bool_like(value) {
            Some(b) => Some(b),
            None => {
                self.wrong_type(field, "布尔值（true/false）", value);
                None
            }
        }
    }

    fn optional_locations(&mut self) -> Option<Vec<GeoLocation>> {
        let field = "location";
        let value = self.value(field)?;
        let Value::Sequence(items) = value else {
            self.wrong_type(field, "坐标列表", value);
            return None;
        };

        let mut locations = Vec::new();
        for item in items {
            let Value::Mapping(map) = item else {
                self.wrong_type(field, "坐标映射", item);
                return None;
            };

            let title = map
                .get("title")
                .and_then(|v| self.cleaner.scalar_to_text(v))
                .unwrap_or_default();
            let latitude = map.get("latitude").and_then(as_f64);
            let longitude = map.get("longitude").and_then(as_f64);

            match (latitude, longitude) {
                (Some(latitude), Some(longitude)) => locations.push(GeoLocation {
                    title,
                    latitude,
                    longitude,
                }),
                _ => {
                    self.wrong_type(field, "latitude/longitude 数值", item);
                    return None;
                }
            }
        }

        if locations.is_empty() {
            None
        } else {
            Some(locations)
        }
    }

    /// 未知字段与 has_* 布尔标志
    fn extra_fields(&mut self) -> IndexMap<String, Value> {
        let mut extra = IndexMap::new();
        let raw = self.raw;

        for (key, value) in &raw.fields {
            if KNOWN_FIELDS.contains(&key.as_str()) {
                continue;
            }

            if key.starts_with(BOOL_FIELD_PREFIX) {
                if matches!(value, Value::Null) {
                    continue;
                }
                match self.cleaner.parse_bool_like(value) {
                    Some(b) => {
                        extra.insert(key.clone(), Value::Bool(b));
                    }
                    None => self.wrong_type(key, "布尔值（true/false）", value),
                }
                continue;
            }

            self.push(
                ViolationKind::UnknownField,
                key,
                format!("未知字段: {}（已保留）", key),
            );
            extra.insert(key.clone(), value.clone());
        }

        extra
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "布尔值",
        Value::Number(_) => "数值",
        Value::String(_) => "字符串",
        Value::Sequence(_) => "列表",
        Value::Mapping(_) => "映射",
        Value::Tagged(_) => "标签值",
    }
}
