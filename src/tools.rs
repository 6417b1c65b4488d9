//! MCP tool endpoints over stdio.

use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use log::info;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{crs_geo::GeoPoint, service::LandUseService};

pub const SERVER_NAME: &str = "landuse_mcp";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to start MCP server: {0}")]
    Initialize(String),
    #[error("MCP server stopped abnormally: {0}")]
    Stopped(String),
}

#[derive(Debug, Clone, Copy, Deserialize, schemars::JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct PointParams {
    /// Latitude in decimal degrees (WGS84).
    pub latitude: f64,
    /// Longitude in decimal degrees (WGS84).
    pub longitude: f64,
}

impl PointParams {
    fn point(&self) -> Result<GeoPoint, McpError> {
        GeoPoint::new(self.latitude, self.longitude)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))
    }
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct HistoryParams {
    #[serde(flatten)]
    pub point: PointParams,
    /// Inclusive lower bound, YYYY-MM-DD.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive upper bound, YYYY-MM-DD.
    #[serde(default)]
    pub end_date: Option<String>,
}

pub fn parse_date(date: Option<&str>) -> Result<Option<NaiveDate>, McpError> {
    date.map(|date| {
        NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|e| {
            McpError::invalid_params(format!("`{date}` is not a YYYY-MM-DD date: {e}"), None)
        })
    })
    .transpose()
}

pub fn format_dates(dates: &[NaiveDate]) -> Vec<String> {
    dates
        .iter()
        .map(|date| date.format(DATE_FORMAT).to_string())
        .collect()
}

pub fn format_history(history: BTreeMap<NaiveDate, Option<i64>>) -> BTreeMap<String, Option<i64>> {
    history
        .into_iter()
        .map(|(date, code)| (date.format(DATE_FORMAT).to_string(), code))
        .collect()
}

fn json_result<T: Serialize>(value: T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::json(value)?]))
}

/// Tool registry exposing [`LandUseService`] lookups.
#[derive(Clone)]
pub struct LandUseServer {
    service: Arc<LandUseService>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl LandUseServer {
    pub fn new(service: Arc<LandUseService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    /// Raster reads block, so they run off the async workers.
    async fn with_service<T, F>(&self, f: F) -> Result<T, McpError>
    where
        T: Send + 'static,
        F: FnOnce(&LandUseService) -> T + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || f(&service))
            .await
            .map_err(|e| McpError::internal_error(format!("lookup task failed: {e}"), None))
    }

    #[tool(
        description = "NLCD land cover class code (integer) at a WGS84 latitude/longitude, or null when the point has no data."
    )]
    async fn get_land_cover(
        &self,
        Parameters(params): Parameters<PointParams>,
    ) -> Result<CallToolResult, McpError> {
        let point = params.point()?;
        json_result(self.with_service(move |service| service.land_cover(point)).await?)
    }

    #[tool(
        description = "Soil classification label at a WGS84 latitude/longitude, or null when the point has no data."
    )]
    async fn get_soil_type(
        &self,
        Parameters(params): Parameters<PointParams>,
    ) -> Result<CallToolResult, McpError> {
        let point = params.point()?;
        json_result(self.with_service(move |service| service.soil_type(point)).await?)
    }

    #[tool(
        description = "Ascending YYYY-MM-DD dates of land cover observations available at a WGS84 latitude/longitude."
    )]
    async fn get_landuse_dates(
        &self,
        Parameters(params): Parameters<PointParams>,
    ) -> Result<CallToolResult, McpError> {
        let point = params.point()?;
        let dates = self
            .with_service(move |service| service.landuse_dates(point))
            .await?;
        json_result(format_dates(&dates))
    }

    #[tool(
        description = "Land cover class code per observation date (YYYY-MM-DD keys) at a WGS84 latitude/longitude, optionally limited to an inclusive date range."
    )]
    async fn get_land_cover_history(
        &self,
        Parameters(params): Parameters<HistoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let point = params.point.point()?;
        let start = parse_date(params.start_date.as_deref())?;
        let end = parse_date(params.end_date.as_deref())?;
        let history = self
            .with_service(move |service| service.land_cover_history(point, start, end))
            .await?;
        json_result(format_history(history))
    }
}

#[tool_handler]
impl ServerHandler for LandUseServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "landuse_mcp: US land cover, soil type and land cover history lookups by WGS84 latitude/longitude."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::default()
            },
            ..Default::default()
        }
    }
}

/// Serve until the client disconnects.
pub async fn serve_stdio(service: Arc<LandUseService>) -> Result<(), ServeError> {
    info!("serving {SERVER_NAME} over stdio");
    let running = LandUseServer::new(service)
        .serve(stdio())
        .await
        .map_err(|e| ServeError::Initialize(e.to_string()))?;
    let reason = running
        .waiting()
        .await
        .map_err(|e| ServeError::Stopped(e.to_string()))?;
    info!("{SERVER_NAME} stopped: {reason:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Config, LandCoverSettings},
        test_utils::{write_geotiff, TestGrid, DEATH_VALLEY},
    };
    use rstest::rstest;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn server() -> (TempDir, LandUseServer) {
        let dir = tempfile::tempdir().unwrap();
        write_geotiff(dir.path(), "nlcd.tif", &TestGrid::wgs84_ramp());
        let config = Config {
            land_cover: LandCoverSettings {
                file: PathBuf::from("nlcd.tif"),
                ..LandCoverSettings::default()
            },
            ..Config::default()
        }
        .with_data_dir(Some(dir.path().to_path_buf()));
        let service = LandUseService::init(&config).unwrap();
        (dir, LandUseServer::new(Arc::new(service)))
    }

    fn death_valley() -> PointParams {
        PointParams {
            latitude: DEATH_VALLEY.0,
            longitude: DEATH_VALLEY.1,
        }
    }

    #[rstest]
    #[case(Some("2001-01-01"), Some(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap()))]
    #[case(None, None)]
    fn parses_dates(#[case] text: Option<&str>, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_date(text).unwrap(), expected);
    }

    #[rstest]
    #[case("2001-13-01")]
    #[case("01/01/2001")]
    fn rejects_bad_dates(#[case] text: &str) {
        assert!(parse_date(Some(text)).is_err());
    }

    #[rstest]
    fn history_keys_are_iso_dates() {
        let history = BTreeMap::from([
            (NaiveDate::from_ymd_opt(2011, 1, 1).unwrap(), None),
            (NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(), Some(52)),
        ]);
        assert_eq!(
            serde_json::to_string(&format_history(history)).unwrap(),
            r#"{"2001-01-01":52,"2011-01-01":null}"#
        );
    }

    #[rstest]
    fn advertises_tools() {
        let (_dir, server) = server();
        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.name, SERVER_NAME);
    }

    #[tokio::test]
    async fn land_cover_tool_succeeds() {
        let (_dir, server) = server();
        let result = server
            .get_land_cover(Parameters(death_valley()))
            .await
            .unwrap();
        assert_eq!(result.content.len(), 1);
        assert_ne!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn ocean_is_not_an_error() {
        let (_dir, server) = server();
        let ocean = PointParams {
            latitude: 0.,
            longitude: 0.,
        };
        assert!(server.get_land_cover(Parameters(ocean)).await.is_ok());
        assert!(server.get_soil_type(Parameters(ocean)).await.is_ok());
        assert!(server.get_landuse_dates(Parameters(ocean)).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected() {
        let (_dir, server) = server();
        let params = PointParams {
            latitude: 123.,
            longitude: 0.,
        };
        assert!(server.get_land_cover(Parameters(params)).await.is_err());
        let params = HistoryParams {
            point: death_valley(),
            start_date: Some("yesterday".to_string()),
            end_date: None,
        };
        assert!(server
            .get_land_cover_history(Parameters(params))
            .await
            .is_err());
    }

    fn json_payload(result: &CallToolResult) -> serde_json::Value {
        let result = serde_json::to_value(result).unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[rstest]
    fn history_params_are_flat() {
        let params: HistoryParams = serde_json::from_value(serde_json::json!({
            "latitude": DEATH_VALLEY.0,
            "longitude": DEATH_VALLEY.1,
            "end_date": "2020-01-01",
        }))
        .unwrap();
        assert_eq!(params.point.latitude, DEATH_VALLEY.0);
        assert_eq!(params.point.longitude, DEATH_VALLEY.1);
        assert!(params.start_date.is_none());
        assert_eq!(params.end_date.as_deref(), Some("2020-01-01"));
    }

    #[tokio::test]
    async fn history_rejects_invalid_latitude() {
        let (_dir, server) = server();
        let params = HistoryParams {
            point: PointParams {
                latitude: -91.,
                longitude: DEATH_VALLEY.1,
            },
            start_date: None,
            end_date: None,
        };
        assert!(server
            .get_land_cover_history(Parameters(params))
            .await
            .is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_lookups_agree() {
        let (_dir, server) = server();
        let calls = (0..8).map(|_| {
            let server = server.clone();
            tokio::spawn(async move { server.get_land_cover(Parameters(death_valley())).await })
        });
        for call in calls.collect::<Vec<_>>() {
            let result = call.await.unwrap().unwrap();
            assert_eq!(json_payload(&result), serde_json::json!(55));
        }

        let history = server
            .get_land_cover_history(Parameters(HistoryParams {
                point: death_valley(),
                start_date: None,
                end_date: None,
            }))
            .await
            .unwrap();
        assert_eq!(
            json_payload(&history),
            serde_json::json!({"2024-01-01": 55})
        );
    }
}
