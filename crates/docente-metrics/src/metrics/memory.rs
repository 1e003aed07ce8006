use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{
    AspectId, AspectInfo, AspectScaleLink, CommentAnalysis, ConfigId, EnrollmentRow,
    EvaluationId, EvaluationRecord, LinkId, ResponseDetail, ScaleId, ScaleScore,
};
use super::filter::{DimensionFilter, FilterDimension, UniverseQuery};
use super::store::{
    BaselineScope, EnrollmentSource, EvaluationStore, RecordScope, ScoreTotals, StoreError,
};

/// Enrollment universe held in memory. Every trait call counts as one query.
#[derive(Debug, Default)]
pub struct InMemoryEnrollmentSource {
    rows: Vec<EnrollmentRow>,
    queries: AtomicUsize,
}

impl InMemoryEnrollmentSource {
    pub fn new(rows: Vec<EnrollmentRow>) -> Self {
        Self {
            rows,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl EnrollmentSource for InMemoryEnrollmentSource {
    async fn enrollments(&self, query: &UniverseQuery) -> Result<Vec<EnrollmentRow>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .iter()
            .filter(|row| query.matches(row))
            .cloned()
            .collect())
    }

    async fn distinct_values(
        &self,
        dimension: FilterDimension,
        filter: &DimensionFilter,
    ) -> Result<Vec<String>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let values: BTreeSet<&str> = self
            .rows
            .iter()
            .filter(|row| filter.matches(row))
            .filter_map(|row| dimension.of(row))
            .collect();

        Ok(dimension.arrange(values.into_iter().map(str::to_string).collect()))
    }
}

/// Contents of the local evaluation tables.
///
/// Field names follow the snapshot document layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationTables {
    #[serde(rename = "evaluaciones", default)]
    pub records: Vec<EvaluationRecord>,
    #[serde(rename = "respuestas", default)]
    pub details: Vec<ResponseDetail>,
    #[serde(rename = "aspecto_escala", default)]
    pub links: Vec<AspectScaleLink>,
    #[serde(rename = "puntajes", default)]
    pub scores: Vec<ScaleScore>,
    #[serde(rename = "aspectos", default)]
    pub aspects: Vec<AspectInfo>,
    #[serde(rename = "analisis", default)]
    pub analyses: Vec<CommentAnalysis>,
}

/// Local evaluation store held in memory. Every trait call counts as one query.
#[derive(Debug, Default)]
pub struct InMemoryEvaluationStore {
    tables: EvaluationTables,
    queries: AtomicUsize,
}

impl InMemoryEvaluationStore {
    pub fn new(tables: EvaluationTables) -> Self {
        Self {
            tables,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn tables(&self) -> &EvaluationTables {
        &self.tables
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn count_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EvaluationStore for InMemoryEvaluationStore {
    async fn evaluations(
        &self,
        scope: &RecordScope,
    ) -> Result<Vec<EvaluationRecord>, StoreError> {
        self.count_query();
        Ok(self
            .tables
            .records
            .iter()
            .filter(|record| scope.matches(record))
            .cloned()
            .collect())
    }

    async fn details(
        &self,
        evaluations: &[EvaluationId],
    ) -> Result<Vec<ResponseDetail>, StoreError> {
        self.count_query();
        let wanted: HashSet<&EvaluationId> = evaluations.iter().collect();
        Ok(self
            .tables
            .details
            .iter()
            .filter(|detail| wanted.contains(&detail.evaluation))
            .cloned()
            .collect())
    }

    async fn links(&self, ids: &[LinkId]) -> Result<Vec<AspectScaleLink>, StoreError> {
        self.count_query();
        let wanted: HashSet<&LinkId> = ids.iter().collect();
        Ok(self
            .tables
            .links
            .iter()
            .filter(|link| wanted.contains(&link.id))
            .cloned()
            .collect())
    }

    async fn scale_scores(
        &self,
        configuration: ConfigId,
        scales: &[ScaleId],
    ) -> Result<Vec<ScaleScore>, StoreError> {
        self.count_query();
        let wanted: HashSet<&ScaleId> = scales.iter().collect();
        Ok(self
            .tables
            .scores
            .iter()
            .filter(|score| score.configuration == configuration && wanted.contains(&score.scale))
            .cloned()
            .collect())
    }

    async fn aspects(&self, ids: &[AspectId]) -> Result<Vec<AspectInfo>, StoreError> {
        self.count_query();
        let wanted: HashSet<&AspectId> = ids.iter().collect();
        Ok(self
            .tables
            .aspects
            .iter()
            .filter(|aspect| wanted.contains(&aspect.id))
            .cloned()
            .collect())
    }

    async fn comment_analyses(
        &self,
        evaluations: &[EvaluationId],
    ) -> Result<Vec<CommentAnalysis>, StoreError> {
        self.count_query();
        let wanted: HashSet<&EvaluationId> = evaluations.iter().collect();
        Ok(self
            .tables
            .analyses
            .iter()
            .filter(|analysis| wanted.contains(&analysis.evaluation))
            .cloned()
            .collect())
    }

    async fn baseline_totals(&self, scope: BaselineScope) -> Result<ScoreTotals, StoreError> {
        self.count_query();
        let configuration_of: HashMap<EvaluationId, ConfigId> = self
            .tables
            .records
            .iter()
            .map(|record| (record.id, record.configuration))
            .collect();
        let scale_of: HashMap<LinkId, ScaleId> = self
            .tables
            .links
            .iter()
            .filter_map(|link| Some((link.id, link.scale?)))
            .collect();
        let points: HashMap<(ConfigId, ScaleId), f64> = self
            .tables
            .scores
            .iter()
            .filter(|score| score.points.is_finite())
            .map(|score| ((score.configuration, score.scale), score.points))
            .collect();

        let mut totals = ScoreTotals::default();
        for detail in &self.tables.details {
            let Some(configuration) = configuration_of.get(&detail.evaluation).copied() else {
                continue;
            };
            if let BaselineScope::Configuration(only) = scope {
                if configuration != only {
                    continue;
                }
            }
            let value = scale_of
                .get(&detail.link)
                .and_then(|scale| points.get(&(configuration, *scale)));
            if let Some(value) = value {
                totals.record(*value);
            }
        }
        Ok(totals)
    }
}
