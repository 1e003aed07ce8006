use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::debug;

use super::domain::{
    AspectId, AspectInfo, AspectScaleLink, CommentAnalysis, ConfigId, DocenteId, EnrollmentRow,
    EvaluationId, EvaluationRecord, LinkId, PersonName, ResponseDetail, ScaleId, ScaleScore,
    StudentId, SubjectCode,
};
use super::filter::{DimensionFilter, FilterDimension, UniverseQuery};
use super::store::{
    BaselineScope, EnrollmentSource, EvaluationStore, RecordScope, ScoreTotals, StoreError,
};

const UNIVERSE_VIEW: &str = "vista_academica_insitus";

/// Enrollment universe backed by the academic view. Sessions are opened read-only so the
/// database rejects any write issued through this pool.
#[derive(Debug, Clone)]
pub struct PostgresEnrollmentSource {
    pool: PgPool,
}

impl PostgresEnrollmentSource {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = PgConnectOptions::from_str(url)?
            .options([("default_transaction_read_only", "on")]);
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_dimensions(builder: &mut QueryBuilder<'_, Postgres>, filter: &DimensionFilter) {
    for dimension in FilterDimension::ordered() {
        if let Some(value) = filter.value(dimension) {
            builder
                .push(format!(" AND \"{}\"::text = ", dimension.column()))
                .push_bind(value.to_string());
        }
    }
}

fn enrollment_from_row(row: &PgRow) -> Result<EnrollmentRow, sqlx::Error> {
    let subject_code: Option<String> = row.try_get("subject_code")?;
    Ok(EnrollmentRow {
        student: row.try_get::<Option<String>, _>("student")?.map(StudentId),
        docente: row.try_get::<Option<String>, _>("docente")?.map(DocenteId),
        subject_code: subject_code.as_deref().and_then(SubjectCode::parse),
        subject_name: row.try_get("subject_name")?,
        group: row.try_get("grp")?,
        site: row.try_get("site")?,
        period: row.try_get("period")?,
        program: row.try_get("program")?,
        semester: row.try_get("semester")?,
        student_name: PersonName {
            first_surname: row.try_get("first_surname")?,
            second_surname: row.try_get("second_surname")?,
            first_name: row.try_get("first_name")?,
            second_name: row.try_get("second_name")?,
        },
        docente_name: row.try_get("docente_name")?,
    })
}

#[async_trait]
impl EnrollmentSource for PostgresEnrollmentSource {
    async fn enrollments(&self, query: &UniverseQuery) -> Result<Vec<EnrollmentRow>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT \"ID_ESTUDIANTE\"::text AS student, \"ID_DOCENTE\"::text AS docente, \
             \"COD_ASIGNATURA\"::text AS subject_code, \"ASIGNATURA\"::text AS subject_name, \
             \"GRUPO\"::text AS grp, \"NOMBRE_SEDE\"::text AS site, \"PERIODO\"::text AS period, \
             \"NOM_PROGRAMA\"::text AS program, \"SEMESTRE\"::text AS semester, \
             \"PRIMER_APELLIDO\"::text AS first_surname, \"SEGUNDO_APELLIDO\"::text AS second_surname, \
             \"PRIMER_NOMBRE\"::text AS first_name, \"SEGUNDO_NOMBRE\"::text AS second_name, \
             \"DOCENTE\"::text AS docente_name FROM ",
        );
        builder.push(UNIVERSE_VIEW).push(" WHERE TRUE");
        push_dimensions(&mut builder, &query.dimensions);
        if let Some(docente) = &query.docente {
            builder
                .push(" AND \"ID_DOCENTE\"::text = ")
                .push_bind(docente.0.clone());
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut enrollments = Vec::with_capacity(rows.len());
        for row in &rows {
            let enrollment = enrollment_from_row(row)?;
            // subject codes compare in canonical form, which SQL cannot express portably
            if query.matches(&enrollment) {
                enrollments.push(enrollment);
            }
        }

        debug!(rows = enrollments.len(), "queried enrollment view");
        Ok(enrollments)
    }

    async fn distinct_values(
        &self,
        dimension: FilterDimension,
        filter: &DimensionFilter,
    ) -> Result<Vec<String>, StoreError> {
        let column = dimension.column();
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT DISTINCT \"{column}\"::text AS value FROM {UNIVERSE_VIEW} \
             WHERE \"{column}\" IS NOT NULL"
        ));
        push_dimensions(&mut builder, filter);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let values = rows
            .iter()
            .map(|row| row.try_get::<String, _>("value"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dimension.arrange(values))
    }
}

/// Local evaluation tables. Every lookup takes a batched id list.
#[derive(Debug, Clone)]
pub struct PostgresEvaluationStore {
    pool: PgPool,
}

impl PostgresEvaluationStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ids<T>(values: &[T], raw: impl Fn(&T) -> i64) -> Vec<i64> {
    values.iter().map(raw).collect()
}

#[async_trait]
impl EvaluationStore for PostgresEvaluationStore {
    async fn evaluations(
        &self,
        scope: &RecordScope,
    ) -> Result<Vec<EvaluationRecord>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id::bigint AS id, id_configuracion::bigint AS id_configuracion, \
             estudiante::text AS estudiante, docente::text AS docente, \
             codigo_materia::text AS codigo_materia, cmt_gen FROM eval WHERE id_configuracion = ",
        );
        builder.push_bind(scope.configuration.0);
        if let Some(docente) = &scope.docente {
            builder.push(" AND docente = ").push_bind(docente.0.clone());
        }
        if let Some(students) = &scope.students {
            let students: Vec<String> = students.iter().map(|student| student.0.clone()).collect();
            builder.push(" AND estudiante = ANY(").push_bind(students).push(")");
        }
        if let Some(docentes) = &scope.docentes {
            let docentes: Vec<String> = docentes.iter().map(|docente| docente.0.clone()).collect();
            builder.push(" AND docente = ANY(").push_bind(docentes).push(")");
        }
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let subject: Option<String> = row.try_get("codigo_materia")?;
            let record = EvaluationRecord {
                id: EvaluationId(row.try_get("id")?),
                configuration: ConfigId(row.try_get("id_configuracion")?),
                student: row.try_get::<Option<String>, _>("estudiante")?.map(StudentId),
                docente: row.try_get::<Option<String>, _>("docente")?.map(DocenteId),
                subject: subject.as_deref().and_then(SubjectCode::parse),
                general_comment: row.try_get("cmt_gen")?,
            };
            // subject filtering happens on the canonical code
            if scope.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn details(
        &self,
        evaluations: &[EvaluationId],
    ) -> Result<Vec<ResponseDetail>, StoreError> {
        let rows = sqlx::query(
            "SELECT eval_id::bigint AS eval_id, a_e_id::bigint AS a_e_id, cmt \
             FROM eval_det WHERE eval_id = ANY($1) ORDER BY id",
        )
        .bind(ids(evaluations, |id| id.0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ResponseDetail, StoreError> {
                Ok(ResponseDetail {
                    evaluation: EvaluationId(row.try_get("eval_id")?),
                    link: LinkId(row.try_get("a_e_id")?),
                    comment: row.try_get("cmt")?,
                })
            })
            .collect()
    }

    async fn links(&self, link_ids: &[LinkId]) -> Result<Vec<AspectScaleLink>, StoreError> {
        let rows = sqlx::query(
            "SELECT id::bigint AS id, aspecto_id::bigint AS aspecto_id, \
             escala_id::bigint AS escala_id, COALESCE(es_cmt, false) AS es_cmt, \
             COALESCE(es_cmt_oblig, false) AS es_cmt_oblig FROM a_e WHERE id = ANY($1)",
        )
        .bind(ids(link_ids, |id| id.0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AspectScaleLink, StoreError> {
                Ok(AspectScaleLink {
                    id: LinkId(row.try_get("id")?),
                    aspect: AspectId(row.try_get("aspecto_id")?),
                    scale: row.try_get::<Option<i64>, _>("escala_id")?.map(ScaleId),
                    allows_comment: row.try_get("es_cmt")?,
                    requires_comment: row.try_get("es_cmt_oblig")?,
                })
            })
            .collect()
    }

    async fn scale_scores(
        &self,
        configuration: ConfigId,
        scales: &[ScaleId],
    ) -> Result<Vec<ScaleScore>, StoreError> {
        let rows = sqlx::query(
            "SELECT cfg_t_id::bigint AS cfg_t_id, escala_id::bigint AS escala_id, \
             puntaje::float8 AS puntaje FROM cfg_e \
             WHERE cfg_t_id = $1 AND escala_id = ANY($2) AND puntaje IS NOT NULL",
        )
        .bind(configuration.0)
        .bind(ids(scales, |id| id.0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ScaleScore, StoreError> {
                Ok(ScaleScore {
                    configuration: ConfigId(row.try_get("cfg_t_id")?),
                    scale: ScaleId(row.try_get("escala_id")?),
                    points: row.try_get("puntaje")?,
                })
            })
            .collect()
    }

    async fn aspects(&self, aspect_ids: &[AspectId]) -> Result<Vec<AspectInfo>, StoreError> {
        let rows = sqlx::query("SELECT id::bigint AS id, nombre FROM aspecto WHERE id = ANY($1)")
            .bind(ids(aspect_ids, |id| id.0))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<AspectInfo, StoreError> {
                Ok(AspectInfo {
                    id: AspectId(row.try_get("id")?),
                    name: row.try_get("nombre")?,
                })
            })
            .collect()
    }

    async fn comment_analyses(
        &self,
        evaluations: &[EvaluationId],
    ) -> Result<Vec<CommentAnalysis>, StoreError> {
        let rows = sqlx::query(
            "SELECT eval_id::bigint AS eval_id, aspecto_id::bigint AS aspecto_id, conclusion, \
             conclusion_gen, fortaleza::text AS fortaleza, debilidad::text AS debilidad \
             FROM cmt_ai WHERE eval_id = ANY($1) ORDER BY eval_id",
        )
        .bind(ids(evaluations, |id| id.0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<CommentAnalysis, StoreError> {
                Ok(CommentAnalysis {
                    evaluation: EvaluationId(row.try_get("eval_id")?),
                    aspect: row.try_get::<Option<i64>, _>("aspecto_id")?.map(AspectId),
                    conclusion: row.try_get("conclusion")?,
                    general_conclusion: row.try_get("conclusion_gen")?,
                    strengths: row.try_get("fortaleza")?,
                    weaknesses: row.try_get("debilidad")?,
                })
            })
            .collect()
    }

    async fn baseline_totals(&self, scope: BaselineScope) -> Result<ScoreTotals, StoreError> {
        let configuration = match scope {
            BaselineScope::Store => None,
            BaselineScope::Configuration(configuration) => Some(configuration.0),
        };
        let row = sqlx::query(
            "SELECT COALESCE(SUM(c.puntaje), 0)::float8 AS total, COUNT(c.puntaje)::bigint AS samples \
             FROM eval_det d \
             JOIN eval e ON e.id = d.eval_id \
             JOIN a_e ae ON ae.id = d.a_e_id \
             JOIN cfg_e c ON c.cfg_t_id = e.id_configuracion AND c.escala_id = ae.escala_id \
             WHERE ($1::bigint IS NULL OR e.id_configuracion = $1)",
        )
        .bind(configuration)
        .fetch_one(&self.pool)
        .await?;

        let samples: i64 = row.try_get("samples")?;
        Ok(ScoreTotals {
            sum: row.try_get("total")?,
            count: u64::try_from(samples).map_err(|_| StoreError::Malformed {
                table: "eval_det",
                detail: format!("negative sample count {samples}"),
            })?,
        })
    }
}
