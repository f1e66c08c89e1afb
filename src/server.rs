//! HTTP boundary: the aggregation endpoint plus directory pass-throughs.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::{StatusCode, header};
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::aggregator::FleetAggregator;
use crate::error::FleetError;
use crate::models::CODE_OK;
use crate::services::transit_api::TransitApi;

#[derive(Clone)]
pub struct AppState {
    api: Arc<dyn TransitApi>,
    aggregator: Arc<FleetAggregator>,
}

impl AppState {
    pub fn new(api: Arc<dyn TransitApi>) -> Self {
        Self {
            aggregator: Arc::new(FleetAggregator::new(api.clone())),
            api,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i64>,
}

fn error_response(summary: &str, err: &FleetError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(ErrorBody {
        error: summary,
        message: Some(err.to_string()),
        code: None,
    })
}

/// Any origin, `GET` only, `Content-Type` allowed.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(vec!["GET"])
        .allowed_header(header::CONTENT_TYPE)
        .max_age(3600)
}

async fn get_vehicles(state: web::Data<AppState>) -> HttpResponse {
    match state.aggregator.run().await {
        Ok(feed) => {
            info!(vehicles = feed.vehicles.len(), "Vehicles served");
            HttpResponse::Ok().json(feed.into_response())
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch vehicle data");
            error_response("Failed to fetch vehicle data", &e)
        }
    }
}

async fn get_agencies(state: web::Data<AppState>) -> HttpResponse {
    match state.aggregator.directory().list_agencies().await {
        Ok(agencies) => HttpResponse::Ok().json(agencies),
        Err(e) => {
            error!(error = %e, "Failed to fetch agencies");
            error_response("Failed to fetch agencies", &e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct AgencyQuery {
    id: Option<String>,
}

async fn get_agency(state: web::Data<AppState>, query: web::Query<AgencyQuery>) -> HttpResponse {
    let Some(agency_id) = query.into_inner().id.filter(|id| !id.is_empty()) else {
        return HttpResponse::BadRequest().json(ErrorBody {
            error: "Agency ID is required. Use ?id=AGENCY_ID parameter.",
            message: None,
            code: None,
        });
    };

    let resp = match state.api.agency(&agency_id).await {
        Ok(resp) => resp,
        Err(e) => {
            error!(agency_id = %agency_id, error = %e, "Error fetching agency data");
            return error_response("Internal server error", &e);
        }
    };

    if resp.code != CODE_OK {
        warn!(agency_id = %agency_id, code = resp.code, "Agency lookup rejected upstream");
        let message = if resp.text.is_empty() {
            "Unknown error".to_string()
        } else {
            resp.text
        };
        return HttpResponse::BadRequest().json(ErrorBody {
            error: "Failed to fetch agency data",
            message: Some(message),
            code: Some(resp.code),
        });
    }

    match resp.data {
        Some(data) => HttpResponse::Ok().json(json!({
            "agency": data.entry,
            "meta": {
                "currentTime": resp.current_time,
                "version": resp.version,
            }
        })),
        None => error_response(
            "Internal server error",
            &FleetError::UpstreamMalformed("agency response has no entry".into()),
        ),
    }
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Registers every route; shared by the server and the tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/api")
            .route("/vehicles", web::get().to(get_vehicles))
            .route("/agencies", web::get().to(get_agencies))
            .route("/agency", web::get().to(get_agency)),
    );
}

pub async fn run_server(state: AppState, bind: &str, port: u16) -> std::io::Result<()> {
    info!(bind, port, "HTTP server listening");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors())
            .wrap(middleware::Logger::default())
            .configure(routes)
    })
    .bind((bind, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::testing::{FakeTransit, directory, roster};
    use crate::config::Config;
    use crate::directory::testing::agency;
    use crate::fetch::testing::CannedClient;
    use crate::infra::onebusaway::OneBusAwayClient;
    use crate::models::{EntryData, EntryResponse};
    use actix_web::test;

    fn app_state(api: impl TransitApi + 'static) -> web::Data<AppState> {
        web::Data::new(AppState::new(Arc::new(api)))
    }

    #[actix_web::test]
    async fn test_vehicles_endpoint_merges_and_allows_any_origin() {
        let mut fake = FakeTransit {
            directory: Some(directory(vec![agency("1", "Metro"), agency("95", "Ferries")])),
            ..FakeTransit::default()
        };
        fake.rosters.insert("1".into(), Ok(roster(1000, &["1_a", "1_b", "1_c"])));
        fake.rosters.insert("95".into(), Err("status 503".into()));

        let app = test::init_service(
            App::new()
                .app_data(app_state(fake))
                .wrap(cors())
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/vehicles")
            .insert_header((header::ORIGIN, "https://example.org"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 200);
        assert_eq!(body["currentTime"], 1000);
        assert_eq!(body["text"], "OK");
        assert_eq!(body["version"], 2);
        assert_eq!(body["data"]["limitExceeded"], false);
        let list = body["data"]["list"].as_array().unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.iter().all(|v| v["agencyId"] == "1"));
        assert_eq!(list[0]["agencyInfo"]["name"], "Metro");
    }

    #[actix_web::test]
    async fn test_preflight_allows_get_only() {
        let app = test::init_service(
            App::new()
                .app_data(app_state(FakeTransit::default()))
                .wrap(cors())
                .configure(routes),
        )
        .await;

        let preflight = |method: &'static str| {
            test::TestRequest::default()
                .method(actix_web::http::Method::OPTIONS)
                .uri("/api/vehicles")
                .insert_header((header::ORIGIN, "https://example.org"))
                .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, method))
                .to_request()
        };

        let resp = test::call_service(&app, preflight("GET")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        let methods = resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(methods, "GET");

        let resp = test::call_service(&app, preflight("POST")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_vehicles_directory_failure() {
        let app = test::init_service(
            App::new()
                .app_data(app_state(FakeTransit::default()))
                .configure(routes),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/vehicles").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Failed to fetch vehicle data");
        assert!(body["message"].as_str().unwrap().contains("status 500"));
    }

    #[actix_web::test]
    async fn test_missing_credential_is_config_error() {
        let client = OneBusAwayClient::with_client(
            &Config::default(),
            CannedClient::new(|_| (200, "{}".to_string())),
        );
        let app = test::init_service(App::new().app_data(app_state(client)).configure(routes)).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/vehicles").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("ONEBUSAWAY_API_KEY"));
    }

    #[actix_web::test]
    async fn test_agency_lookup() {
        let fake = FakeTransit {
            entry: Some(EntryResponse {
                code: 200,
                current_time: 77,
                data: Some(EntryData {
                    entry: agency("40", "Sound Transit"),
                }),
                text: "OK".into(),
                version: 2,
            }),
            ..FakeTransit::default()
        };
        let app = test::init_service(App::new().app_data(app_state(fake)).configure(routes)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/agency").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/agency?id=40").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["agency"]["name"], "Sound Transit");
        assert_eq!(body["meta"]["currentTime"], 77);
    }

    #[actix_web::test]
    async fn test_agency_upstream_rejection() {
        let fake = FakeTransit {
            entry: Some(EntryResponse {
                code: 404,
                current_time: 0,
                data: None,
                text: "resource not found".into(),
                version: 2,
            }),
            ..FakeTransit::default()
        };
        let app = test::init_service(App::new().app_data(app_state(fake)).configure(routes)).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/agency?id=x").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 404);
        assert_eq!(body["message"], "resource not found");
    }

    #[actix_web::test]
    async fn test_agencies_listing() {
        let fake = FakeTransit {
            directory: Some(directory(vec![agency("40", "Sound Transit"), agency("1", "Metro")])),
            ..FakeTransit::default()
        };
        let app = test::init_service(App::new().app_data(app_state(fake)).configure(routes)).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/agencies").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body[0]["id"], "40");
        assert_eq!(body[1]["id"], "1");
    }
}
