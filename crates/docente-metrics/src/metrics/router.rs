use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use super::params::MetricsParams;
use super::service::MetricsService;
use super::store::{EnrollmentSource, EvaluationStore};
use super::views::{
    AspectMetricsView, DocenteCommentsView, DocenteCompletionView, DocenteStatsView,
    FilterOptionsView, RankingView, SubjectCompletionView, SubjectMetricsView, SummaryView,
};
use crate::error::AppError;

/// Router builder exposing the metrics endpoints. Query strings carry the parameter bag; path
/// segments override the matching keys.
pub fn metrics_router<U, S>(service: Arc<MetricsService<U, S>>) -> Router
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    Router::new()
        .route(
            "/api/v1/metric/evaluations/summary",
            get(summary_handler::<U, S>),
        )
        .route(
            "/api/v1/metric/evaluations/ranking",
            get(ranking_handler::<U, S>),
        )
        .route(
            "/api/v1/metric/evaluations/docente/:docente",
            get(docente_stats_handler::<U, S>),
        )
        .route(
            "/api/v1/metric/evaluations/docente/:docente/completion",
            get(docente_completion_handler::<U, S>),
        )
        .route(
            "/api/v1/metric/evaluations/docente/:docente/aspectos",
            get(docente_aspects_handler::<U, S>),
        )
        .route(
            "/api/v1/metric/evaluations/docente/:docente/materias",
            get(docente_subjects_handler::<U, S>),
        )
        .route(
            "/api/v1/metric/evaluations/docente/:docente/materias/:codigo_materia/completion",
            get(subject_completion_handler::<U, S>),
        )
        .route(
            "/api/v1/metric/evaluations/docente/:docente/materias/:codigo_materia/aspectos",
            get(subject_aspects_handler::<U, S>),
        )
        .route(
            "/api/v1/metric/evaluations/docente/:docente/comments",
            get(docente_comments_handler::<U, S>),
        )
        .route("/api/v1/metric/filters", get(filters_handler::<U, S>))
        .with_state(service)
}

pub(crate) async fn summary_handler<U, S>(
    State(service): State<Arc<MetricsService<U, S>>>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<SummaryView>, AppError>
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    Ok(Json(service.summary(&params).await?))
}

pub(crate) async fn ranking_handler<U, S>(
    State(service): State<Arc<MetricsService<U, S>>>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<RankingView>, AppError>
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    Ok(Json(service.ranking(&params).await?))
}

pub(crate) async fn docente_stats_handler<U, S>(
    State(service): State<Arc<MetricsService<U, S>>>,
    Path(docente): Path<String>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<DocenteStatsView>, AppError>
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    let params = params.with_docente(docente);
    Ok(Json(service.docente_stats(&params).await?))
}

pub(crate) async fn docente_completion_handler<U, S>(
    State(service): State<Arc<MetricsService<U, S>>>,
    Path(docente): Path<String>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<DocenteCompletionView>, AppError>
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    let params = params.with_docente(docente);
    Ok(Json(service.docente_completion(&params).await?))
}

pub(crate) async fn docente_aspects_handler<U, S>(
    State(service): State<Arc<MetricsService<U, S>>>,
    Path(docente): Path<String>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<AspectMetricsView>, AppError>
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    let params = params.with_docente(docente);
    Ok(Json(service.docente_aspects(&params).await?))
}

pub(crate) async fn docente_subjects_handler<U, S>(
    State(service): State<Arc<MetricsService<U, S>>>,
    Path(docente): Path<String>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<SubjectMetricsView>, AppError>
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    let params = params.with_docente(docente);
    Ok(Json(service.docente_subjects(&params).await?))
}

pub(crate) async fn subject_completion_handler<U, S>(
    State(service): State<Arc<MetricsService<U, S>>>,
    Path((docente, codigo_materia)): Path<(String, String)>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<SubjectCompletionView>, AppError>
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    let params = params.with_docente(docente).with_subject(codigo_materia);
    Ok(Json(service.subject_completion(&params).await?))
}

pub(crate) async fn subject_aspects_handler<U, S>(
    State(service): State<Arc<MetricsService<U, S>>>,
    Path((docente, codigo_materia)): Path<(String, String)>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<AspectMetricsView>, AppError>
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    let params = params.with_docente(docente).with_subject(codigo_materia);
    Ok(Json(service.subject_aspects(&params).await?))
}

pub(crate) async fn docente_comments_handler<U, S>(
    State(service): State<Arc<MetricsService<U, S>>>,
    Path(docente): Path<String>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<DocenteCommentsView>, AppError>
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    let params = params.with_docente(docente);
    Ok(Json(service.docente_comments(&params).await?))
}

pub(crate) async fn filters_handler<U, S>(
    State(service): State<Arc<MetricsService<U, S>>>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<FilterOptionsView>, AppError>
where
    U: EnrollmentSource + ?Sized + 'static,
    S: EvaluationStore + ?Sized + 'static,
{
    Ok(Json(service.filter_options(&params).await?))
}
