use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::metrics::domain::{
    AspectId, AspectInfo, AspectScaleLink, CommentAnalysis, ConfigId, DocenteId, EnrollmentRow,
    EvaluationId, EvaluationRecord, LinkId, PersonName, ResponseDetail, ScaleId, ScaleScore,
    StudentId, SubjectCode,
};
use crate::metrics::memory::{EvaluationTables, InMemoryEnrollmentSource, InMemoryEvaluationStore};
use crate::metrics::params::MetricsParams;
use crate::metrics::ranking::RankingSettings;
use crate::metrics::service::MetricsService;
use crate::metrics::store::{
    BaselineScope, EvaluationStore, RecordScope, ScoreTotals, StoreError,
};

pub(super) const TOLERANCE: f64 = 1e-6;

pub(super) type MemoryService = MetricsService<InMemoryEnrollmentSource, InMemoryEvaluationStore>;

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

pub(super) fn assert_close_opt(actual: Option<f64>, expected: f64) {
    match actual {
        Some(value) => assert_close(value, expected),
        None => panic!("expected {expected}, got null"),
    }
}

pub(super) struct EnrollmentBuilder {
    row: EnrollmentRow,
}

impl EnrollmentBuilder {
    pub(super) fn site(mut self, site: &str, period: &str) -> Self {
        self.row.site = Some(site.to_string());
        self.row.period = Some(period.to_string());
        self
    }

    pub(super) fn semester(mut self, semester: &str) -> Self {
        self.row.semester = Some(semester.to_string());
        self
    }

    pub(super) fn student_name(mut self, surname: &str, name: &str) -> Self {
        self.row.student_name = PersonName {
            first_surname: Some(surname.to_string()),
            first_name: Some(name.to_string()),
            ..PersonName::default()
        };
        self
    }

    pub(super) fn docente_name(mut self, name: &str) -> Self {
        self.row.docente_name = Some(name.to_string());
        self
    }

    pub(super) fn build(self) -> EnrollmentRow {
        self.row
    }
}

/// Enrollment of `student` with `docente` in `subject`, Norte 2025-1, Ingenieria, semester 1.
pub(super) fn enrollment(
    student: &str,
    docente: &str,
    subject: &str,
    group: &str,
) -> EnrollmentBuilder {
    EnrollmentBuilder {
        row: EnrollmentRow {
            student: Some(StudentId(student.to_string())),
            docente: Some(DocenteId(docente.to_string())),
            subject_code: SubjectCode::parse(subject),
            subject_name: Some(format!("Materia {}", subject.trim_start_matches('0'))),
            group: Some(group.to_string()),
            site: Some("Norte".to_string()),
            period: Some("2025-1".to_string()),
            program: Some("Ingenieria".to_string()),
            semester: Some("1".to_string()),
            student_name: PersonName::default(),
            docente_name: None,
        },
    }
}

pub(super) fn record(
    id: i64,
    configuration: i64,
    student: &str,
    docente: &str,
    subject: &str,
) -> EvaluationRecord {
    EvaluationRecord {
        id: EvaluationId(id),
        configuration: ConfigId(configuration),
        student: Some(StudentId(student.to_string())),
        docente: Some(DocenteId(docente.to_string())),
        subject: SubjectCode::parse(subject),
        general_comment: None,
    }
}

pub(super) fn detail(evaluation: i64, link: i64, comment: Option<&str>) -> ResponseDetail {
    ResponseDetail {
        evaluation: EvaluationId(evaluation),
        link: LinkId(link),
        comment: comment.map(str::to_string),
    }
}

pub(super) fn link(id: i64, aspect: i64, scale: Option<i64>) -> AspectScaleLink {
    AspectScaleLink {
        id: LinkId(id),
        aspect: AspectId(aspect),
        scale: scale.map(ScaleId),
        allows_comment: scale.is_none(),
        requires_comment: false,
    }
}

pub(super) fn points(configuration: i64, scale: i64, value: f64) -> ScaleScore {
    ScaleScore {
        configuration: ConfigId(configuration),
        scale: ScaleId(scale),
        points: value,
    }
}

/// Universe of the reference campaign.
///
/// | student | docente | subject | group | site  | period |
/// |---------|---------|---------|-------|-------|--------|
/// | S1      | D1      | 101     | A     | Norte | 2025-1 |
/// | S1      | D2      | 202     | A     | Norte | 2025-1 |
/// | S1      | D2      | 303     | B     | Norte | 2025-1 |
/// | S2      | D1      | 101     | A     | Norte | 2025-1 |
/// | S3      | D2      | 202     | A     | Sur   | 2024-2 |
/// | S4      | D3      | 404     | A     | Norte | 2025-1 |
pub(super) fn campaign_rows() -> Vec<EnrollmentRow> {
    vec![
        enrollment("S1", "D1", "0101", "A")
            .student_name("Gomez", "Ana")
            .docente_name("Luis Perez")
            .build(),
        enrollment("S1", "D2", "202", "A")
            .student_name("Gomez", "Ana")
            .docente_name("Marta Ruiz")
            .build(),
        enrollment("S1", "D2", "303", "B")
            .student_name("Gomez", "Ana")
            .build(),
        enrollment("S2", "D1", "101", "A")
            .student_name("Rojas", "Carlos")
            .build(),
        enrollment("S3", "D2", "202", "A")
            .site("Sur", "2024-2")
            .build(),
        enrollment("S4", "D3", "404", "A").semester("2").build(),
    ]
}

/// Local tables of the reference campaign.
///
/// Configuration 1 holds five records: S1/D1/101 and S2/D1/101 and S1/D2/202 are answered,
/// S1/D2/303 and S3/D2/202 are empty. Configuration 2 holds one answered S1/D1/101 record.
/// Link 1 scores 5 (1 under configuration 2), link 2 scores 3, link 3 is open-ended.
pub(super) fn campaign_tables() -> EvaluationTables {
    let mut commented = record(4, 1, "S2", "D1", "101");
    commented.general_comment = Some("  Excelente docente ".to_string());

    EvaluationTables {
        records: vec![
            record(1, 1, "S1", "D1", "101"),
            record(2, 1, "S1", "D2", "202"),
            record(3, 1, "S1", "D2", "303"),
            commented,
            record(5, 1, "S3", "D2", "202"),
            record(6, 2, "S1", "D1", "101"),
        ],
        details: vec![
            detail(1, 1, None),
            detail(1, 2, Some("   ")),
            detail(2, 1, Some("")),
            detail(4, 1, None),
            detail(4, 3, Some("Muy claro")),
            detail(6, 1, None),
        ],
        links: vec![link(1, 1, Some(1)), link(2, 2, Some(2)), link(3, 3, None)],
        scores: vec![points(1, 1, 5.0), points(1, 2, 3.0), points(2, 1, 1.0)],
        aspects: vec![
            AspectInfo {
                id: AspectId(1),
                name: Some("Dominio del tema".to_string()),
            },
            AspectInfo {
                id: AspectId(2),
                name: Some("Puntualidad".to_string()),
            },
            AspectInfo {
                id: AspectId(3),
                name: Some("Comentarios".to_string()),
            },
        ],
        analyses: vec![
            CommentAnalysis {
                evaluation: EvaluationId(1),
                aspect: Some(AspectId(1)),
                conclusion: Some("Explica con claridad".to_string()),
                general_conclusion: Some("Buen desempeno".to_string()),
                strengths: Some(r#"["claridad"]"#.to_string()),
                weaknesses: Some(r#"["puntualidad"]"#.to_string()),
            },
            CommentAnalysis {
                evaluation: EvaluationId(4),
                aspect: None,
                conclusion: None,
                general_conclusion: None,
                strengths: Some(r#"["claridad", "dominio"]"#.to_string()),
                weaknesses: None,
            },
        ],
    }
}

pub(super) struct Fixture {
    pub(super) universe: Arc<InMemoryEnrollmentSource>,
    pub(super) store: Arc<InMemoryEvaluationStore>,
    pub(super) service: Arc<MemoryService>,
}

impl Fixture {
    pub(super) fn new(rows: Vec<EnrollmentRow>, tables: EvaluationTables) -> Self {
        let universe = Arc::new(InMemoryEnrollmentSource::new(rows));
        let store = Arc::new(InMemoryEvaluationStore::new(tables));
        let service = Arc::new(MetricsService::new(
            universe.clone(),
            store.clone(),
            RankingSettings::default(),
        ));
        Self {
            universe,
            store,
            service,
        }
    }

    pub(super) fn query_counts(&self) -> (usize, usize) {
        (self.universe.query_count(), self.store.query_count())
    }
}

pub(super) fn campaign() -> Fixture {
    Fixture::new(campaign_rows(), campaign_tables())
}

pub(super) fn cfg(configuration: &str) -> MetricsParams {
    MetricsParams::for_configuration(configuration)
}

/// Store whose every lookup fails.
pub(super) struct UnavailableStore;

#[async_trait]
impl EvaluationStore for UnavailableStore {
    async fn evaluations(
        &self,
        _scope: &RecordScope,
    ) -> Result<Vec<EvaluationRecord>, StoreError> {
        Err(unavailable())
    }

    async fn details(
        &self,
        _evaluations: &[EvaluationId],
    ) -> Result<Vec<ResponseDetail>, StoreError> {
        Err(unavailable())
    }

    async fn links(&self, _ids: &[LinkId]) -> Result<Vec<AspectScaleLink>, StoreError> {
        Err(unavailable())
    }

    async fn scale_scores(
        &self,
        _configuration: ConfigId,
        _scales: &[ScaleId],
    ) -> Result<Vec<ScaleScore>, StoreError> {
        Err(unavailable())
    }

    async fn aspects(&self, _ids: &[AspectId]) -> Result<Vec<AspectInfo>, StoreError> {
        Err(unavailable())
    }

    async fn comment_analyses(
        &self,
        _evaluations: &[EvaluationId],
    ) -> Result<Vec<CommentAnalysis>, StoreError> {
        Err(unavailable())
    }

    async fn baseline_totals(&self, _scope: BaselineScope) -> Result<ScoreTotals, StoreError> {
        Err(unavailable())
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
