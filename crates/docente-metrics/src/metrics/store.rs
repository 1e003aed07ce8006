use std::collections::BTreeSet;

use async_trait::async_trait;

use super::domain::{
    AspectId, AspectInfo, AspectScaleLink, CommentAnalysis, ConfigId, DocenteId, EnrollmentRow,
    EvaluationId, EvaluationRecord, LinkId, ResponseDetail, ScaleId, ScaleScore, StudentId,
    SubjectCode,
};
use super::filter::{DimensionFilter, FilterDimension, UniverseQuery};

/// Read-only view over the enrollment universe.
///
/// The trait has no mutating operations; adapters backed by a database additionally open
/// read-only sessions.
#[async_trait]
pub trait EnrollmentSource: Send + Sync {
    async fn enrollments(&self, query: &UniverseQuery) -> Result<Vec<EnrollmentRow>, StoreError>;

    /// Distinct non-null values of `dimension` among rows matching `filter`, in display order.
    async fn distinct_values(
        &self,
        dimension: FilterDimension,
        filter: &DimensionFilter,
    ) -> Result<Vec<String>, StoreError>;
}

/// Query interface over the locally owned evaluation tables. The engine only reads.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn evaluations(&self, scope: &RecordScope)
        -> Result<Vec<EvaluationRecord>, StoreError>;

    /// Response details owned by any of `evaluations`.
    async fn details(&self, evaluations: &[EvaluationId])
        -> Result<Vec<ResponseDetail>, StoreError>;

    async fn links(&self, ids: &[LinkId]) -> Result<Vec<AspectScaleLink>, StoreError>;

    async fn scale_scores(
        &self,
        configuration: ConfigId,
        scales: &[ScaleId],
    ) -> Result<Vec<ScaleScore>, StoreError>;

    async fn aspects(&self, ids: &[AspectId]) -> Result<Vec<AspectInfo>, StoreError>;

    async fn comment_analyses(
        &self,
        evaluations: &[EvaluationId],
    ) -> Result<Vec<CommentAnalysis>, StoreError>;

    /// Sum and count of scale-resolved points over every response detail in `scope`.
    ///
    /// Each response resolves through the points table of its own evaluation's configuration.
    async fn baseline_totals(&self, scope: BaselineScope) -> Result<ScoreTotals, StoreError>;
}

/// Selection of evaluation records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordScope {
    pub configuration: ConfigId,
    pub docente: Option<DocenteId>,
    pub subject: Option<SubjectCode>,
    pub students: Option<BTreeSet<StudentId>>,
    pub docentes: Option<BTreeSet<DocenteId>>,
}

impl RecordScope {
    pub fn configuration(configuration: ConfigId) -> Self {
        Self {
            configuration,
            docente: None,
            subject: None,
            students: None,
            docentes: None,
        }
    }

    pub fn for_docente(mut self, docente: DocenteId) -> Self {
        self.docente = Some(docente);
        self
    }

    pub fn for_subject(mut self, subject: SubjectCode) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Restrict to records whose student belongs to `students`. An empty set selects nothing.
    pub fn within_students(mut self, students: BTreeSet<StudentId>) -> Self {
        self.students = Some(students);
        self
    }

    /// Restrict to records whose docente belongs to `docentes`. An empty set selects nothing.
    pub fn within_docentes(mut self, docentes: BTreeSet<DocenteId>) -> Self {
        self.docentes = Some(docentes);
        self
    }

    pub fn matches(&self, record: &EvaluationRecord) -> bool {
        if record.configuration != self.configuration {
            return false;
        }
        if let Some(docente) = &self.docente {
            if record.docente.as_ref() != Some(docente) {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if record.subject.as_ref() != Some(subject) {
                return false;
            }
        }
        if let Some(students) = &self.students {
            if !record
                .student
                .as_ref()
                .is_some_and(|student| students.contains(student))
            {
                return false;
            }
        }
        if let Some(docentes) = &self.docentes {
            if !record
                .docente
                .as_ref()
                .is_some_and(|docente| docentes.contains(docente))
            {
                return false;
            }
        }
        true
    }
}

/// Portion of the local store feeding the ranking baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineScope {
    /// Every response in the store regardless of campaign.
    Store,
    Configuration(ConfigId),
}

/// Running sum and count of scored values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreTotals {
    pub sum: f64,
    pub count: u64,
}

impl ScoreTotals {
    pub fn record(&mut self, points: f64) {
        self.sum += points;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Error enumeration for data-access failures. These are never retried.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed {table} row: {detail}")]
    Malformed { table: &'static str, detail: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(student: &str, docente: &str, subject: &str) -> EvaluationRecord {
        EvaluationRecord {
            id: EvaluationId(1),
            configuration: ConfigId(1),
            student: Some(StudentId(student.to_string())),
            docente: Some(DocenteId(docente.to_string())),
            subject: SubjectCode::parse(subject),
            general_comment: None,
        }
    }

    #[test]
    fn scope_filters_by_configuration_and_people() {
        let candidate = record("S1", "D1", "10");
        assert!(RecordScope::configuration(ConfigId(1)).matches(&candidate));
        assert!(!RecordScope::configuration(ConfigId(2)).matches(&candidate));

        let students = BTreeSet::from([StudentId("S1".to_string())]);
        let docentes = BTreeSet::from([DocenteId("D2".to_string())]);
        let scope = RecordScope::configuration(ConfigId(1)).within_students(students);
        assert!(scope.matches(&candidate));
        assert!(!scope.within_docentes(docentes).matches(&candidate));
    }

    #[test]
    fn empty_people_sets_select_nothing() {
        let candidate = record("S1", "D1", "10");
        let scope = RecordScope::configuration(ConfigId(1)).within_students(BTreeSet::new());
        assert!(!scope.matches(&candidate));
    }

    #[test]
    fn score_totals_mean_is_absent_without_samples() {
        let mut totals = ScoreTotals::default();
        assert_eq!(totals.mean(), None);
        totals.record(1.0);
        totals.record(3.0);
        assert_eq!(totals.mean(), Some(2.0));
    }
}
