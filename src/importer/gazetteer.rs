// ==========================================
// 会议截稿数据集 - 离线地名表
// ==========================================
// 职责: 常见会议城市 → 坐标 / IANA 时区
// 实现: Geocoder（地名匹配）+ TimezoneLocator（最近城市）
// 时区推断: 近邻城市 UTC 偏移不一致（边境地带）时拒绝推断
// 说明: 表外地点由 NominatimGeocoder 补充（需开启 online_geocoding）
// ==========================================

use crate::domain::Coordinates;
use crate::importer::error::ImportResult;
use crate::importer::pipeline_trait::{Geocoder, TimezoneLocator};
use async_trait::async_trait;
use chrono::{NaiveDate, Offset, TimeZone};
use chrono_tz::Tz;
use tracing::debug;

/// 最近城市匹配的最大距离（公里）
pub const MAX_TIMEZONE_DISTANCE_KM: f64 = 500.0;

/// 此距离内直接采用最近城市的时区
pub const SAME_CITY_DISTANCE_KM: f64 = 50.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

// ==========================================
// GazetteerEntry - 地名表条目
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct GazetteerEntry {
    pub names: &'static [&'static str], // 小写名称与别名
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: &'static str,
}

const fn entry(
    names: &'static [&'static str],
    latitude: f64,
    longitude: f64,
    timezone: &'static str,
) -> GazetteerEntry {
    GazetteerEntry {
        names,
        latitude,
        longitude,
        timezone,
    }
}

/// 内置城市表
pub const DEFAULT_ENTRIES: &[GazetteerEntry] = &[
    // ===== 欧洲 =====
    entry(&["berlin"], 52.52000, 13.40495, "Europe/Berlin"),
    entry(&["munich", "münchen", "muenchen"], 48.13743, 11.57549, "Europe/Berlin"),
    entry(&["karlsruhe"], 49.00937, 8.40444, "Europe/Berlin"),
    entry(&["darmstadt"], 49.87167, 8.65027, "Europe/Berlin"),
    entry(&["prague", "praha"], 50.07554, 14.43780, "Europe/Prague"),
    entry(&["dublin"], 53.34981, -6.26031, "Europe/Dublin"),
    entry(&["london"], 51.50735, -0.12776, "Europe/London"),
    entry(&["edinburgh"], 55.95325, -3.18827, "Europe/London"),
    entry(&["manchester"], 53.48076, -2.24263, "Europe/London"),
    entry(&["cardiff"], 51.48158, -3.17909, "Europe/London"),
    entry(&["paris"], 48.85661, 2.35222, "Europe/Paris"),
    entry(&["lyon"], 45.76404, 4.83566, "Europe/Paris"),
    entry(&["bordeaux"], 44.83779, -0.57918, "Europe/Paris"),
    entry(&["amsterdam"], 52.36757, 4.90414, "Europe/Amsterdam"),
    entry(&["brussels", "bruxelles"], 50.85034, 4.35171, "Europe/Brussels"),
    entry(&["florence", "firenze"], 43.76956, 11.25581, "Europe/Rome"),
    entry(&["bologna"], 44.49489, 11.34262, "Europe/Rome"),
    entry(&["madrid"], 40.41678, -3.70379, "Europe/Madrid"),
    entry(&["barcelona"], 41.38788, 2.16992, "Europe/Madrid"),
    entry(&["valencia"], 39.46991, -0.37629, "Europe/Madrid"),
    entry(&["lisbon", "lisboa"], 38.72225, -9.13934, "Europe/Lisbon"),
    entry(&["porto"], 41.15794, -8.62911, "Europe/Lisbon"),
    entry(&["vienna", "wien"], 48.20817, 16.37382, "Europe/Vienna"),
    entry(&["zurich", "zürich"], 47.37689, 8.54169, "Europe/Zurich"),
    entry(&["basel"], 47.55960, 7.58858, "Europe/Zurich"),
    entry(&["warsaw", "warszawa"], 52.22968, 21.01223, "Europe/Warsaw"),
    entry(&["krakow", "kraków"], 50.06465, 19.94498, "Europe/Warsaw"),
    entry(&["stockholm"], 59.32932, 18.06858, "Europe/Stockholm"),
    entry(&["oslo"], 59.91387, 10.75225, "Europe/Oslo"),
    entry(&["copenhagen", "københavn"], 55.67610, 12.56834, "Europe/Copenhagen"),
    entry(&["helsinki"], 60.16985, 24.93838, "Europe/Helsinki"),
    entry(&["vilnius"], 54.68717, 25.27965, "Europe/Vilnius"),
    entry(&["kyiv", "kiev"], 50.45010, 30.52340, "Europe/Kyiv"),
    entry(&["athens"], 37.98381, 23.72754, "Europe/Athens"),
    entry(&["istanbul"], 41.00824, 28.97836, "Europe/Istanbul"),
    entry(&["bratislava"], 48.14860, 17.10774, "Europe/Bratislava"),
    entry(&["budapest"], 47.49791, 19.04023, "Europe/Budapest"),
    entry(&["ljubljana"], 46.05695, 14.50575, "Europe/Ljubljana"),
    // ===== 北美 =====
    entry(&["pittsburgh"], 40.44062, -79.99589, "America/New_York"),
    entry(&["salt lake city"], 40.76078, -111.89105, "America/Denver"),
    entry(&["long beach"], 33.77005, -118.19374, "America/Los_Angeles"),
    entry(&["portland"], 45.51520, -122.67838, "America/Los_Angeles"),
    entry(&["seattle"], 47.60621, -122.33207, "America/Los_Angeles"),
    entry(&["tacoma"], 47.25288, -122.44429, "America/Los_Angeles"),
    entry(&["san francisco"], 37.77493, -122.41942, "America/Los_Angeles"),
    entry(&["austin"], 30.26715, -97.74306, "America/Chicago"),
    entry(&["chicago"], 41.87811, -87.62980, "America/Chicago"),
    entry(&["new york", "new york city", "nyc"], 40.71278, -74.00597, "America/New_York"),
    entry(&["boston"], 42.36008, -71.05888, "America/New_York"),
    entry(&["washington", "washington dc", "washington d.c."], 38.90719, -77.03687, "America/New_York"),
    entry(&["toronto"], 43.65323, -79.38318, "America/Toronto"),
    entry(&["montreal", "montréal"], 45.50169, -73.56726, "America/Toronto"),
    entry(&["vancouver"], 49.28273, -123.12074, "America/Vancouver"),
    entry(&["mexico city", "ciudad de méxico", "cdmx"], 19.43261, -99.13321, "America/Mexico_City"),
    // ===== 南美 =====
    entry(&["bogota", "bogotá"], 4.71110, -74.07209, "America/Bogota"),
    entry(&["medellin", "medellín"], 6.24421, -75.58121, "America/Bogota"),
    entry(&["lima"], -12.04637, -77.04279, "America/Lima"),
    entry(&["sao paulo", "são paulo"], -23.55052, -46.63331, "America/Sao_Paulo"),
    entry(&["buenos aires"], -34.60372, -58.38159, "America/Argentina/Buenos_Aires"),
    entry(&["santiago"], -33.44889, -70.66927, "America/Santiago"),
    // ===== 亚洲 =====
    entry(&["tokyo"], 35.67620, 139.65031, "Asia/Tokyo"),
    entry(&["seoul"], 37.56654, 126.97797, "Asia/Seoul"),
    entry(&["taipei"], 25.03297, 121.56542, "Asia/Taipei"),
    entry(&["hong kong"], 22.31930, 114.16936, "Asia/Hong_Kong"),
    entry(&["shanghai"], 31.23039, 121.47370, "Asia/Shanghai"),
    entry(&["singapore"], 1.35208, 103.81984, "Asia/Singapore"),
    entry(&["kuala lumpur"], 3.13900, 101.68685, "Asia/Kuala_Lumpur"),
    entry(&["jakarta"], -6.20876, 106.84560, "Asia/Jakarta"),
    entry(&["manila"], 14.59951, 120.98422, "Asia/Manila"),
    entry(&["bangkok"], 13.75633, 100.50177, "Asia/Bangkok"),
    entry(&["ho chi minh city", "saigon"], 10.82302, 106.62965, "Asia/Ho_Chi_Minh"),
    entry(&["bengaluru", "bangalore"], 12.97160, 77.59456, "Asia/Kolkata"),
    entry(&["hyderabad"], 17.38504, 78.48667, "Asia/Kolkata"),
    entry(&["colombo"], 6.92708, 79.86124, "Asia/Colombo"),
    entry(&["dubai"], 25.20485, 55.27078, "Asia/Dubai"),
    entry(&["tel aviv"], 32.08530, 34.78177, "Asia/Jerusalem"),
    // ===== 非洲 =====
    entry(&["lagos"], 6.52438, 3.37921, "Africa/Lagos"),
    entry(&["accra"], 5.60372, -0.18700, "Africa/Accra"),
    entry(&["nairobi"], -1.29207, 36.82195, "Africa/Nairobi"),
    entry(&["kampala"], 0.34760, 32.58252, "Africa/Kampala"),
    entry(&["kigali"], -1.94407, 30.06188, "Africa/Kigali"),
    entry(&["johannesburg"], -26.20410, 28.04731, "Africa/Johannesburg"),
    entry(&["cape town"], -33.92487, 18.42406, "Africa/Johannesburg"),
    entry(&["cairo"], 30.04442, 31.23571, "Africa/Cairo"),
    // ===== 大洋洲 =====
    entry(&["sydney"], -33.86882, 151.20929, "Australia/Sydney"),
    entry(&["melbourne"], -37.81363, 144.96306, "Australia/Melbourne"),
    entry(&["brisbane"], -27.46977, 153.02513, "Australia/Brisbane"),
    entry(&["adelaide"], -34.92850, 138.60074, "Australia/Adelaide"),
    entry(&["perth"], -31.95051, 115.86045, "Australia/Perth"),
    entry(&["wellington"], -41.28646, 174.77624, "Pacific/Auckland"),
    entry(&["auckland"], -36.84846, 174.76333, "Pacific/Auckland"),
];

// ==========================================
// Gazetteer - 离线地名表
// ==========================================
pub struct Gazetteer {
    entries: Vec<GazetteerEntry>,
}

impl Gazetteer {
    pub fn new(entries: Vec<GazetteerEntry>) -> Self {
        Self { entries }
    }

    /// 按地名查找
    ///
    /// # 规则
    /// - 地名按逗号拆分，依次尝试每一段（"Berlin, Germany" 先试 "berlin"）
    /// - 名称比较大小写不敏感
    pub fn lookup(&self, place: &str) -> Option<&GazetteerEntry> {
        let place = place.to_lowercase();
        place
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .find_map(|segment| {
                self.entries
                    .iter()
                    .find(|entry| entry.names.contains(&segment))
            })
    }

    /// 坐标所在时区
    ///
    /// # 规则
    /// - 最近城市在 SAME_CITY_DISTANCE_KM 内: 直接采用
    /// - 否则要求半径内所有城市的 UTC 偏移（冬令时与夏令时）一致，
    ///   不一致时返回 None（由调用方报告 LocationUnresolved）
    pub fn resolve_timezone(&self, coordinates: Coordinates) -> Option<&'static str> {
        let mut candidates: Vec<(&GazetteerEntry, f64)> = self.within(coordinates).collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        let (nearest, distance) = *candidates.first()?;
        if distance <= SAME_CITY_DISTANCE_KM {
            return Some(nearest.timezone);
        }

        let offsets = utc_offsets(nearest.timezone)?;
        let consistent = candidates
            .iter()
            .all(|(entry, _)| utc_offsets(entry.timezone) == Some(offsets));
        if consistent {
            Some(nearest.timezone)
        } else {
            debug!(
                latitude = coordinates.latitude,
                longitude = coordinates.longitude,
                nearest = nearest.timezone,
                "近邻城市时区偏移不一致，不推断时区"
            );
            None
        }
    }

    /// 距离不超过 MAX_TIMEZONE_DISTANCE_KM 的城市
    fn within(&self, coordinates: Coordinates) -> impl Iterator<Item = (&GazetteerEntry, f64)> {
        self.entries
            .iter()
            .map(move |entry| {
                let distance = haversine_km(
                    coordinates,
                    Coordinates::new(entry.latitude, entry.longitude),
                );
                (entry, distance)
            })
            .filter(|(_, distance)| *distance <= MAX_TIMEZONE_DISTANCE_KM)
    }
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRIES.to_vec())
    }
}

#[async_trait]
impl Geocoder for Gazetteer {
    async fn locate(&self, place: &str) -> ImportResult<Option<Coordinates>> {
        Ok(self
            .lookup(place)
            .map(|entry| Coordinates::new(entry.latitude, entry.longitude)))
    }
}

impl TimezoneLocator for Gazetteer {
    fn timezone_at(&self, coordinates: Coordinates) -> Option<String> {
        self.resolve_timezone(coordinates).map(str::to_string)
    }
}

/// 时区在一月与七月的 UTC 偏移（秒）
fn utc_offsets(timezone: &str) -> Option<(i32, i32)> {
    let tz: Tz = timezone.parse().ok()?;
    let offset_in = |month: u32| {
        NaiveDate::from_ymd_opt(2025, month, 15)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .map(|noon| tz.offset_from_utc_datetime(&noon).fix().local_minus_utc())
    };
    Some((offset_in(1)?, offset_in(7)?))
}

/// 大圆距离（公里）
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
