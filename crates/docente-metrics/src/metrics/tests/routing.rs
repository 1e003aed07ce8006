use super::common::*;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use std::sync::Arc;
use tower::ServiceExt;

use crate::metrics::memory::{InMemoryEnrollmentSource, InMemoryEvaluationStore};
use crate::metrics::ranking::RankingSettings;
use crate::metrics::router::{self, metrics_router};
use crate::metrics::service::MetricsService;

async fn get(path: &str) -> axum::response::Response {
    let fixture = campaign();
    metrics_router(fixture.service)
        .oneshot(Request::get(path).body(Body::empty()).expect("request"))
        .await
        .expect("route executes")
}

#[tokio::test]
async fn summary_route_requires_configuration() {
    let response = get("/api/v1/metric/evaluations/summary").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "cfg_t is required");
}

#[tokio::test]
async fn summary_route_rejects_non_numeric_configuration() {
    let response = get("/api/v1/metric/evaluations/summary?cfg_t=abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn summary_route_returns_general_totals() {
    let response = get("/api/v1/metric/evaluations/summary?cfg_t=1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json_body(response).await;
    let totals = &payload["generales"];
    assert_eq!(totals["total_evaluaciones"], 6);
    assert_eq!(totals["total_realizadas"], 3);
    assert_eq!(totals["total_docentes_pendientes"], 2);
}

#[tokio::test]
async fn ranking_route_lists_every_docente() {
    let response = get("/api/v1/metric/evaluations/ranking?cfg_t=1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json_body(response).await;
    let ranking = payload["ranking"].as_array().expect("ranking array");
    assert_eq!(ranking.len(), 3);
    assert_eq!(ranking[0]["docente"], "D2");
    assert!(ranking[0].get("adjusted").is_some());
    assert!(ranking[0].get("realizados").is_some());
    assert!(ranking[0].get("universo").is_some());
}

#[tokio::test]
async fn path_segments_override_the_query_bag() {
    let response =
        get("/api/v1/metric/evaluations/docente/D2/materias/0303/completion?cfg_t=1&docente=D1")
            .await;
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json_body(response).await;
    assert_eq!(payload["docente"], "D2");
    assert_eq!(payload["codigo_materia"], "0303");
    assert_eq!(payload["pendientes"][0]["id"], "S1");
    assert_eq!(payload["pendientes"][0]["nombre"], "Gomez Ana");
}

#[tokio::test]
async fn docente_routes_share_the_parameter_bag() {
    let stats = read_json_body(get("/api/v1/metric/evaluations/docente/D1?cfg_t=1").await).await;
    assert_eq!(stats["total_evaluaciones"], 2);
    assert_eq!(stats["porcentaje_cumplimiento"], 100.0);

    let aspects =
        read_json_body(get("/api/v1/metric/evaluations/docente/D1/aspectos?cfg_t=1").await).await;
    assert_eq!(aspects["aspectos"].as_array().map(Vec::len), Some(3));
    assert!(aspects.get("codigo_materia").is_none());

    let subjects =
        read_json_body(get("/api/v1/metric/evaluations/docente/D2/materias?cfg_t=1").await).await;
    assert_eq!(subjects["materias"][0]["codigo_materia"], "202");

    let scoped = read_json_body(
        get("/api/v1/metric/evaluations/docente/D2/materias/202/aspectos?cfg_t=1").await,
    )
    .await;
    assert_eq!(scoped["codigo_materia"], "202");

    let comments = read_json_body(
        get("/api/v1/metric/evaluations/docente/D1/comments?cfg_t=1").await,
    )
    .await;
    assert_eq!(comments["docente_nombre"], "Luis Perez");
    assert_eq!(comments["fortalezas"][1], "dominio");
}

#[tokio::test]
async fn filters_route_does_not_need_a_configuration() {
    let response = get("/api/v1/metric/filters?sede=Norte").await;
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json_body(response).await;
    assert_eq!(payload["periodos"], serde_json::json!(["2025-1"]));
    assert_eq!(payload["sedes"], serde_json::json!(["Norte", "Sur"]));
}

#[tokio::test]
async fn completion_handler_reports_store_failures() {
    let service = Arc::new(MetricsService::new(
        Arc::new(InMemoryEnrollmentSource::new(campaign_rows())),
        Arc::new(UnavailableStore),
        RankingSettings::default(),
    ));

    let response = router::docente_completion_handler::<InMemoryEnrollmentSource, UnavailableStore>(
        State(service),
        Path("D1".to_string()),
        Query(cfg("1")),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("connection refused"));
}

#[tokio::test]
async fn summary_handler_accepts_direct_calls() {
    let service = Arc::new(MetricsService::new(
        Arc::new(InMemoryEnrollmentSource::new(campaign_rows())),
        Arc::new(InMemoryEvaluationStore::new(campaign_tables())),
        RankingSettings::default(),
    ));

    let response = router::summary_handler::<InMemoryEnrollmentSource, InMemoryEvaluationStore>(
        State(service),
        Query(cfg("1")),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);
}
