// ==========================================
// 会议截稿数据集 - 地理/时区规范化
// ==========================================
// 职责: 地点 → 坐标 → IANA 时区；无法解析时回退 AoE（UTC-12）
// 规则:
// - 显式 timezone 必须是合法 IANA 名称
// - Online 不做地理编码，时区取显式值或 AoE
// - 已有 location 只做范围检查与 5 位小数取整
// - 缺 location 时地理编码 place 与 extra_places
// - 缺 timezone 时按首个坐标推断并回写
// - AoE 不回写（缺省即 AoE）
// ==========================================

use crate::domain::{
    ConferenceRecord, Coordinates, GeoLocation, NormalizedRecord, ResolvedTimezone, Violation,
    ViolationKind,
};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::pipeline_trait::{DataCleaner as DataCleanerTrait, Geocoder, TimezoneLocator};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct GeoNormalizer {
    geocoder: Arc<dyn Geocoder>,
    timezone_locator: Arc<dyn TimezoneLocator>,
    cleaner: DataCleaner,
}

impl GeoNormalizer {
    pub fn new(geocoder: Arc<dyn Geocoder>, timezone_locator: Arc<dyn TimezoneLocator>) -> Self {
        Self {
            geocoder,
            timezone_locator,
            cleaner: DataCleaner,
        }
    }

    /// 规范化单条记录的地理与时区信息
    ///
    /// # 返回
    /// - NormalizedRecord: 规范化后的记录 + 解析后的时区
    /// - Vec<Violation>: InvalidTimezone / OutOfRange（致命），LocationUnresolved（警告）
    pub async fn normalize(
        &self,
        entry_number: usize,
        mut record: ConferenceRecord,
    ) -> (NormalizedRecord, Vec<Violation>) {
        let identity = record.identity().to_string();
        let mut violations = Vec::new();
        let mut push = |kind: ViolationKind, field: &str, message: String| {
            violations.push(Violation::new(entry_number, identity.clone(), kind, field, message));
        };

        // ===== 显式时区 =====
        let mut resolved = None;
        if let Some(tz) = record.timezone.as_deref() {
            if tz.parse::<Tz>().is_ok() {
                resolved = Some(ResolvedTimezone::Iana(tz.to_string()));
            } else {
                push(
                    ViolationKind::InvalidTimezone,
                    "timezone",
                    format!("非法 IANA 时区: {}", tz),
                );
            }
        }
        let explicit_timezone = record.timezone.is_some();

        // ===== 已有坐标: 范围检查 + 取整 =====
        if let Some(locations) = record.location.as_mut() {
            for location in locations.iter_mut() {
                let coordinates = Coordinates::new(location.latitude, location.longitude);
                if !coordinates.is_in_range() {
                    push(
                        ViolationKind::OutOfRange,
                        "location",
                        format!(
                            "坐标超出范围: ({}, {})",
                            location.latitude, location.longitude
                        ),
                    );
                    continue;
                }
                location.latitude = self.cleaner.round_coordinate(location.latitude);
                location.longitude = self.cleaner.round_coordinate(location.longitude);
            }
        }

        // ===== Online: 不做地理编码 =====
        if record.is_online() {
            let resolved_timezone = resolved.unwrap_or(ResolvedTimezone::AnywhereOnEarth);
            return (
                NormalizedRecord {
                    entry_number,
                    record,
                    resolved_timezone,
                },
                violations,
            );
        }

        // ===== 缺坐标: 地理编码 =====
        if record.location.is_none() {
            let title = format!("{} {}", record.conference, record.year);
            let mut locations = Vec::new();

            match self.locate(&record.place).await {
                Some(coordinates) => locations.push(self.to_location(title.clone(), coordinates)),
                None => push(
                    ViolationKind::LocationUnresolved,
                    "place",
                    format!("无法解析地点: {}", record.place),
                ),
            }

            let extra_places: Vec<String> = record
                .extra_places
                .iter()
                .flatten()
                .filter(|p| !p.trim().eq_ignore_ascii_case("online"))
                .cloned()
                .collect();
            for place in extra_places {
                match self.locate(&place).await {
                    Some(coordinates) => locations
                        .push(self.to_location(format!("{} ({})", title, place), coordinates)),
                    None => push(
                        ViolationKind::LocationUnresolved,
                        "extra_places",
                        format!("无法解析地点: {}", place),
                    ),
                }
            }

            if !locations.is_empty() {
                record.location = Some(locations);
            }
        }

        // ===== 缺时区: 按坐标推断 =====
        if !explicit_timezone {
            let first = record
                .location
                .as_ref()
                .and_then(|l| l.first())
                .map(|l| Coordinates::new(l.latitude, l.longitude))
                .filter(Coordinates::is_in_range);

            if let Some(coordinates) = first {
                match self
                    .timezone_locator
                    .timezone_at(coordinates)
                    .filter(|tz| tz.parse::<Tz>().is_ok())
                {
                    Some(tz) => {
                        debug!(identity = %identity, timezone = %tz, "时区已推断");
                        record.timezone = Some(tz.clone());
                        resolved = Some(ResolvedTimezone::Iana(tz));
                    }
                    None => push(
                        ViolationKind::LocationUnresolved,
                        "timezone",
                        format!(
                            "无法根据坐标 ({}, {}) 推断时区，按 AoE 处理",
                            coordinates.latitude, coordinates.longitude
                        ),
                    ),
                }
            }
        }

        let resolved_timezone = resolved.unwrap_or(ResolvedTimezone::AnywhereOnEarth);
        (
            NormalizedRecord {
                entry_number,
                record,
                resolved_timezone,
            },
            violations,
        )
    }

    /// 地理编码（服务错误按未找到处理）
    async fn locate(&self, place: &str) -> Option<Coordinates> {
        match self.geocoder.locate(place).await {
            Ok(found) => found.filter(Coordinates::is_in_range),
            Err(e) => {
                warn!(place = %place, error = %e, "地理编码失败");
                None
            }
        }
    }

    fn to_location(&self, title: String, coordinates: Coordinates) -> GeoLocation {
        GeoLocation {
            title,
            latitude: self.cleaner.round_coordinate(coordinates.latitude),
            longitude: self.cleaner.round_coordinate(coordinates.longitude),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategorySet;
    use crate::importer::error::{ImportError, ImportResult};
    use crate::importer::gazetteer::Gazetteer;
    use async_trait::async_trait;
    use indexmap::IndexMap;

    fn create_test_record(place: &str) -> ConferenceRecord {
        ConferenceRecord {
            conference: "PyCon X".to_string(),
            alt_name: None,
            year: 2025,
            link: "https://pyconx.org".to_string(),
            cfp_link: None,
            cfp: "2025-03-01 23:59:00".to_string(),
            cfp_ext: None,
            workshop_deadline: None,
            tutorial_deadline: None,
            timezone: None,
            place: place.to_string(),
            extra_places: None,
            start: "2025-06-01".to_string(),
            end: "2025-06-03".to_string(),
            sub: CategorySet(vec!["PY".to_string()]),
            sponsor: None,
            finaid: None,
            twitter: None,
            mastodon: None,
            bluesky: None,
            note: None,
            location: None,
            extra: IndexMap::new(),
        }
    }

    fn gazetteer_normalizer() -> GeoNormalizer {
        let gazetteer = Arc::new(Gazetteer::default());
        GeoNormalizer::new(gazetteer.clone(), gazetteer)
    }

    struct BrokenGeocoder;

    #[async_trait]
    impl Geocoder for BrokenGeocoder {
        async fn locate(&self, place: &str) -> ImportResult<Option<Coordinates>> {
            Err(ImportError::GeocodingError {
                place: place.to_string(),
                message: "timeout".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_online_without_timezone_resolves_to_aoe() {
        let normalizer = gazetteer_normalizer();
        let (normalized, violations) = normalizer.normalize(1, create_test_record("Online")).await;

        assert!(violations.is_empty());
        assert_eq!(normalized.resolved_timezone.to_string(), "UTC-12");
        assert_eq!(normalized.record.timezone, None);
        assert_eq!(normalized.record.location, None);
    }

    #[tokio::test]
    async fn test_online_with_explicit_timezone() {
        let normalizer = gazetteer_normalizer();
        let mut record = create_test_record("online");
        record.timezone = Some("America/New_York".to_string());
        let (normalized, violations) = normalizer.normalize(1, record).await;

        assert!(violations.is_empty());
        assert_eq!(
            normalized.resolved_timezone,
            ResolvedTimezone::Iana("America/New_York".to_string())
        );
    }

    #[tokio::test]
    async fn test_berlin_gets_coordinates_and_timezone() {
        let normalizer = gazetteer_normalizer();
        let (normalized, violations) = normalizer
            .normalize(1, create_test_record("Berlin, Germany"))
            .await;

        assert!(violations.is_empty());
        assert_eq!(normalized.record.timezone.as_deref(), Some("Europe/Berlin"));
        let location = normalized.record.location.unwrap();
        assert_eq!(location[0].title, "PyCon X 2025");
        assert_eq!(location[0].latitude, 52.52);
    }

    #[tokio::test]
    async fn test_invalid_timezone_is_fatal() {
        let normalizer = gazetteer_normalizer();
        let mut record = create_test_record("Berlin, Germany");
        record.timezone = Some("Mars/Olympus_Mons".to_string());
        let (_, violations) = normalizer.normalize(1, record).await;

        assert!(violations
            .iter()
            .any(|v| v.kind == ViolationKind::InvalidTimezone && v.is_fatal()));
    }

    #[tokio::test]
    async fn test_unresolved_place_falls_back_to_aoe_with_warning() {
        let normalizer = gazetteer_normalizer();
        let (normalized, violations) = normalizer
            .normalize(1, create_test_record("Atlantis"))
            .await;

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::LocationUnresolved);
        assert!(!violations[0].is_fatal());
        assert_eq!(normalized.resolved_timezone, ResolvedTimezone::AnywhereOnEarth);
    }

    #[tokio::test]
    async fn test_geocoder_error_is_warning() {
        let normalizer = GeoNormalizer::new(Arc::new(BrokenGeocoder), Arc::new(Gazetteer::default()));
        let (normalized, violations) = normalizer
            .normalize(1, create_test_record("Berlin, Germany"))
            .await;

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::LocationUnresolved);
        assert_eq!(normalized.resolved_timezone, ResolvedTimezone::AnywhereOnEarth);
    }

    #[tokio::test]
    async fn test_existing_location_rounded_and_range_checked() {
        let normalizer = gazetteer_normalizer();
        let mut record = create_test_record("Berlin, Germany");
        record.location = Some(vec![GeoLocation {
            title: "PyCon X 2025".to_string(),
            latitude: 52.5200066,
            longitude: 13.404954,
        }]);
        let (normalized, violations) = normalizer.normalize(1, record).await;
        assert!(violations.is_empty());
        let location = normalized.record.location.unwrap();
        assert_eq!(location[0].latitude, 52.52001);
        assert_eq!(location[0].longitude, 13.40495);

        let mut record = create_test_record("Berlin, Germany");
        record.location = Some(vec![GeoLocation {
            title: "bad".to_string(),
            latitude: 123.0,
            longitude: 13.4,
        }]);
        let (_, violations) = normalizer.normalize(1, record).await;
        assert!(violations
            .iter()
            .any(|v| v.kind == ViolationKind::OutOfRange));
    }

    #[tokio::test]
    async fn test_extra_places_geocoded() {
        let normalizer = gazetteer_normalizer();
        let mut record = create_test_record("Berlin, Germany");
        record.extra_places = Some(vec!["Online".to_string(), "Prague, Czechia".to_string()]);
        let (normalized, violations) = normalizer.normalize(1, record).await;

        assert!(violations.is_empty());
        let location = normalized.record.location.unwrap();
        assert_eq!(location.len(), 2);
        assert_eq!(location[1].title, "PyCon X 2025 (Prague, Czechia)");
        // 时区取首个坐标
        assert_eq!(normalized.record.timezone.as_deref(), Some("Europe/Berlin"));
    }

    #[tokio::test]
    async fn test_normalize_is_idempotent() {
        let normalizer = gazetteer_normalizer();
        let (first, _) = normalizer
            .normalize(1, create_test_record("Berlin, Germany"))
            .await;
        let (second, violations) = normalizer.normalize(1, first.record.clone()).await;

        assert!(violations.is_empty());
        assert_eq!(first, second);
    }
}
