use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use docente_metrics::config::AppConfig;
use docente_metrics::error::AppError;
use docente_metrics::metrics::snapshot::{self, Snapshot};
use docente_metrics::metrics::{
    EnrollmentSource, EvaluationStore, MetricsService, PostgresEnrollmentSource,
    PostgresEvaluationStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Service over whichever stores were selected at startup.
pub(crate) type DynMetricsService = MetricsService<dyn EnrollmentSource, dyn EvaluationStore>;

/// Snapshot stores when a directory is given, the configured Postgres databases otherwise.
pub(crate) async fn metrics_service(
    config: &AppConfig,
    snapshot_dir: Option<&Path>,
) -> Result<Arc<DynMetricsService>, AppError> {
    let (universe, store): (Arc<dyn EnrollmentSource>, Arc<dyn EvaluationStore>) =
        match snapshot_dir {
            Some(dir) => {
                let Snapshot {
                    enrollments,
                    evaluations,
                } = snapshot::load_dir(dir)?;
                (Arc::new(enrollments), Arc::new(evaluations))
            }
            None => {
                let database = &config.database;
                let universe = PostgresEnrollmentSource::connect(
                    database.universe_url()?,
                    database.max_connections,
                )
                .await?;
                let store =
                    PostgresEvaluationStore::connect(database.local_url()?, database.max_connections)
                        .await?;
                info!(
                    max_connections = database.max_connections,
                    "connected to enrollment universe and evaluation store"
                );
                (Arc::new(universe), Arc::new(store))
            }
        };

    Ok(Arc::new(MetricsService::new(universe, store, config.ranking)))
}
