use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use std::time::Duration;

use crate::readings::{self, SensorReading};
use crate::timestream::QueryService;

#[derive(Debug, Clone)]
pub struct AppState<S> {
    pub service: S,
    pub query_timeout: Duration,
}

/// One table row, every cell already formatted for display.
struct TableRow {
    device_id: String,
    measure_name: String,
    time: String,
    temperature: String,
    humidity: String,
    air_quality: String,
}

fn number_cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}

impl From<&SensorReading> for TableRow {
    fn from(reading: &SensorReading) -> Self {
        Self {
            device_id: reading.device_id.clone().unwrap_or_default(),
            measure_name: reading.measure_name.clone().unwrap_or_default(),
            time: reading.time.clone().unwrap_or_default(),
            temperature: number_cell(reading.temperature),
            humidity: number_cell(reading.humidity),
            air_quality: number_cell(reading.air_quality),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    rows: Vec<TableRow>,
}

pub fn router<S>(state: AppState<S>) -> Router
where
    S: QueryService + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(index::<S>))
        .with_state(state)
}

/// Renders the latest readings. Failures are reported in the body with a 200 status.
pub async fn index<S>(State(state): State<AppState<S>>) -> Response
where
    S: QueryService + Clone + Send + Sync + 'static,
{
    let rendered = match readings::fetch_latest_readings(&state.service, state.query_timeout).await {
        Ok(readings) => IndexTemplate {
            rows: readings.iter().map(TableRow::from).collect(),
        }
        .render()
        .map_err(|e| format!("template rendering failed: {e}")),
        Err(e) => Err(e.to_string()),
    };

    match rendered {
        Ok(body) => Html(body).into_response(),
        Err(message) => {
            log::error!("An error occurred: {message}");
            format!("An error occurred: {message}").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readings::tests::{row, FakeService};

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    async fn get_index(service: FakeService) -> (StatusCode, String, String) {
        let app = router(AppState {
            service,
            query_timeout: Duration::from_secs(5),
        });

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn formats_cells() {
        let cells = TableRow::from(&SensorReading {
            device_id: Some("sensor-1".to_owned()),
            temperature: Some(5.0),
            humidity: Some(21.457),
            ..Default::default()
        });

        assert_eq!(cells.device_id, "sensor-1");
        assert_eq!(cells.measure_name, "");
        assert_eq!(cells.temperature, "5.000");
        assert_eq!(cells.humidity, "21.457");
        assert_eq!(cells.air_quality, "");
    }

    #[tokio::test]
    async fn renders_table() {
        let service = FakeService::with_rows(vec![row([
            Some("sensor-<1>"),
            Some("Env"),
            Some("2024-01-01 10:00:00.123000000"),
            Some("21.4567"),
            None,
            Some("5"),
        ])]);

        let (status, content_type, body) = get_index(service).await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/html"), "{content_type}");
        assert!(body.contains("<table"));
        assert!(body.contains("sensor-&lt;1&gt;"));
        assert!(body.contains("2024-01-01 10:00:00</td>"));
        assert!(body.contains("21.457"));
        assert!(body.contains("5.000"));
    }

    #[tokio::test]
    async fn failure_is_plain_text_with_ok_status() {
        let (status, content_type, body) = get_index(FakeService::default()).await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"), "{content_type}");
        assert_eq!(
            body,
            "An error occurred: endpoint discovery failed: service returned no endpoints"
        );
    }

    #[tokio::test]
    async fn shape_failure_is_reported() {
        let service = FakeService::with_rows(vec![row([None, None, Some("soon"), None, None, None])]);

        let (_, _, body) = get_index(service).await;

        assert!(body.starts_with("An error occurred: row 0 could not be shaped"), "{body}");
    }
}
