//! Google Maps 客户端
//!
//! 逆地理编码与距离矩阵查询。两类调用都是尽力而为：
//! 未配置 API Key、网络异常、响应不合法时一律返回 None，
//! 由上层降级为占位值。

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use lifeline_core::config::MapsConfig;
use lifeline_domain::entities::Coordinates;
use lifeline_domain::ports::{GeocodingService, RouteEstimate, RouteService};

pub struct GoogleMapsClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl GoogleMapsClient {
    pub fn new(config: &MapsConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    #[serde(default)]
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixElement {
    status: String,
    distance: Option<TextValue>,
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
}

#[async_trait]
impl GeocodingService for GoogleMapsClient {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Option<String> {
        let Some(api_key) = &self.api_key else {
            debug!("未配置地图API Key，跳过地址解析");
            return None;
        };

        let url = format!("{}/geocode/json", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("latlng", format!("{lat},{lng}")), ("key", api_key.clone())])
            .send()
            .await;

        let body: GeocodeResponse = match response {
            Ok(resp) => match resp.json().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("地址解析响应解析失败: {}", e);
                    return None;
                }
            },
            Err(e) => {
                warn!("地址解析请求失败: {}", e);
                return None;
            }
        };

        if body.status != "OK" {
            debug!("坐标 {}, {} 无地址结果: {}", lat, lng, body.status);
            return None;
        }
        body.results
            .into_iter()
            .next()
            .map(|r| r.formatted_address)
    }
}

#[async_trait]
impl RouteService for GoogleMapsClient {
    async fn distance_and_eta(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Option<RouteEstimate> {
        let Some(api_key) = &self.api_key else {
            debug!("未配置地图API Key，跳过距离估算");
            return None;
        };

        let url = format!("{}/distancematrix/json", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("origins", format!("{},{}", origin.lat, origin.lng)),
                (
                    "destinations",
                    format!("{},{}", destination.lat, destination.lng),
                ),
                ("key", api_key.clone()),
            ])
            .send()
            .await;

        let body: DistanceMatrixResponse = match response {
            Ok(resp) => match resp.json().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("距离估算响应解析失败: {}", e);
                    return None;
                }
            },
            Err(e) => {
                warn!("距离估算请求失败: {}", e);
                return None;
            }
        };

        if body.status != "OK" {
            debug!("距离估算无结果: {}", body.status);
            return None;
        }

        let element = body.rows.into_iter().next()?.elements.into_iter().next()?;
        if element.status != "OK" {
            return None;
        }
        Some(RouteEstimate {
            distance_text: element.distance?.text,
            duration_text: element.duration?.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_without_key() -> GoogleMapsClient {
        GoogleMapsClient::new(&MapsConfig {
            api_key: None,
            base_url: "https://maps.googleapis.com/maps/api".to_string(),
            request_timeout_seconds: 1,
        })
    }

    #[tokio::test]
    async fn test_missing_api_key_degrades_to_none() {
        let client = client_without_key();
        assert_eq!(client.reverse_geocode(12.34, 56.78).await, None);
        assert_eq!(
            client
                .distance_and_eta(&Coordinates::new(0.0, 0.0), &Coordinates::new(1.0, 1.0))
                .await,
            None
        );
    }

    #[test]
    fn test_geocode_response_shape() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{"status": "OK", "results": [{"formatted_address": "MG Road, Bengaluru"}]}"#,
        )
        .unwrap();
        assert_eq!(body.status, "OK");
        assert_eq!(body.results[0].formatted_address, "MG Road, Bengaluru");
    }

    #[test]
    fn test_zero_results_response_shape() {
        let body: GeocodeResponse = serde_json::from_str(r#"{"status": "ZERO_RESULTS"}"#).unwrap();
        assert_eq!(body.status, "ZERO_RESULTS");
        assert!(body.results.is_empty());
    }

    #[test]
    fn test_distance_matrix_response_shape() {
        let body: DistanceMatrixResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "rows": [{"elements": [{
                    "status": "OK",
                    "distance": {"text": "4.2 km"},
                    "duration": {"text": "11 mins"}
                }]}]
            }"#,
        )
        .unwrap();
        let element = &body.rows[0].elements[0];
        assert_eq!(element.distance.as_ref().unwrap().text, "4.2 km");
        assert_eq!(element.duration.as_ref().unwrap().text, "11 mins");
    }
}
