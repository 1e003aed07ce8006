//! Evaluation completion and performance metrics for docentes.
//!
//! Expected work comes from a read-only enrollment universe and realized work from the locally
//! owned evaluation tables. The pipeline per request is: resolve the universe, fetch records and
//! their details, resolve scores, then reconcile completion, aggregate aspects or rank.

pub mod aspects;
pub mod completion;
pub mod domain;
pub mod filter;
pub mod memory;
pub mod params;
pub mod postgres;
pub mod ranking;
pub mod responses;
pub mod router;
pub mod scoring;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod universe;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    AspectId, AspectInfo, AspectScaleLink, CommentAnalysis, ConfigId, DocenteId, EnrollmentRow,
    EvaluationId, EvaluationRecord, LinkId, PersonName, ResponseDetail, ScaleId, ScaleScore,
    StudentId, SubjectCode,
};
pub use filter::{DimensionFilter, FilterDimension, UniverseQuery};
pub use memory::{EvaluationTables, InMemoryEnrollmentSource, InMemoryEvaluationStore};
pub use params::{MetricsParams, ParameterError};
pub use postgres::{PostgresEnrollmentSource, PostgresEvaluationStore};
pub use ranking::{BaselinePolicy, RankingSettings, DEFAULT_SMOOTHING};
pub use router::metrics_router;
pub use service::{MetricsError, MetricsService};
pub use snapshot::{Snapshot, SnapshotError};
pub use store::{BaselineScope, EnrollmentSource, EvaluationStore, RecordScope, StoreError};
pub use views::{
    AspectMetricsView, DocenteCommentsView, DocenteCompletionView, DocenteStatsView,
    FilterOptionsView, RankingView, SubjectCompletionView, SubjectMetricsView, SummaryView,
};
