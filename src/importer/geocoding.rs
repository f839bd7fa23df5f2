// ==========================================
// 会议截稿数据集 - 在线地理编码
// ==========================================
// 职责: Nominatim 查询 + 多级地理编码（离线表优先）
// ==========================================

use crate::domain::Coordinates;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::pipeline_trait::Geocoder;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 默认 Nominatim 服务地址
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// 单次查询超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

// ==========================================
// NominatimGeocoder - OpenStreetMap 地理编码
// ==========================================
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> ImportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn locate(&self, place: &str) -> ImportResult<Option<Coordinates>> {
        let url = format!("{}/search", self.base_url);
        debug!(place = %place, "Nominatim 查询");

        let response = self
            .client
            .get(&url)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| geocoding_error(place, e))?;

        if !response.status().is_success() {
            return Err(ImportError::GeocodingError {
                place: place.to_string(),
                message: format!("HTTP {}", response.status().as_u16()),
            });
        }

        let places: Vec<NominatimPlace> =
            response.json().await.map_err(|e| geocoding_error(place, e))?;

        let Some(first) = places.into_iter().next() else {
            return Ok(None);
        };

        match (first.lat.parse::<f64>(), first.lon.parse::<f64>()) {
            (Ok(latitude), Ok(longitude)) => Ok(Some(Coordinates::new(latitude, longitude))),
            _ => Err(ImportError::GeocodingError {
                place: place.to_string(),
                message: format!("坐标无法解析: {}, {}", first.lat, first.lon),
            }),
        }
    }
}

fn geocoding_error(place: &str, err: reqwest::Error) -> ImportError {
    ImportError::GeocodingError {
        place: place.to_string(),
        message: err.to_string(),
    }
}

// ==========================================
// ChainedGeocoder - 多级地理编码
// ==========================================
// 依次尝试，返回第一个命中结果；全部失败时返回最后一个错误
pub struct ChainedGeocoder {
    geocoders: Vec<Arc<dyn Geocoder>>,
}

impl ChainedGeocoder {
    pub fn new(geocoders: Vec<Arc<dyn Geocoder>>) -> Self {
        Self { geocoders }
    }
}

#[async_trait]
impl Geocoder for ChainedGeocoder {
    async fn locate(&self, place: &str) -> ImportResult<Option<Coordinates>> {
        let mut last_error = None;

        for geocoder in &self.geocoders {
            match geocoder.locate(place).await {
                Ok(Some(coordinates)) => return Ok(Some(coordinates)),
                Ok(None) => {}
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}
