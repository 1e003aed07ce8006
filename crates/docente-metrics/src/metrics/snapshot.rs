use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::info;

use super::domain::{DocenteId, EnrollmentRow, PersonName, StudentId, SubjectCode};
use super::memory::{EvaluationTables, InMemoryEnrollmentSource, InMemoryEvaluationStore};

pub const ENROLLMENTS_FILE: &str = "enrollments.csv";
pub const EVALUATIONS_FILE: &str = "evaluations.json";

/// Both stores loaded from a snapshot directory.
#[derive(Debug)]
pub struct Snapshot {
    pub enrollments: InMemoryEnrollmentSource,
    pub evaluations: InMemoryEvaluationStore,
}

#[derive(Debug)]
pub enum SnapshotError {
    Io {
        file: String,
        source: std::io::Error,
    },
    Csv(csv::Error),
    Json(serde_json::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Io { file, source } => {
                write!(f, "failed to read snapshot file {}: {}", file, source)
            }
            SnapshotError::Csv(err) => write!(f, "invalid enrollment CSV data: {}", err),
            SnapshotError::Json(err) => write!(f, "invalid evaluation JSON data: {}", err),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Io { source, .. } => Some(source),
            SnapshotError::Csv(err) => Some(err),
            SnapshotError::Json(err) => Some(err),
        }
    }
}

impl From<csv::Error> for SnapshotError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Load `enrollments.csv` and `evaluations.json` from `dir`.
pub fn load_dir(dir: &Path) -> Result<Snapshot, SnapshotError> {
    let rows = parse_enrollments(open(&dir.join(ENROLLMENTS_FILE))?)?;
    let tables = parse_evaluations(open(&dir.join(EVALUATIONS_FILE))?)?;

    info!(
        snapshot = %dir.display(),
        enrollments = rows.len(),
        evaluations = tables.records.len(),
        responses = tables.details.len(),
        "loaded snapshot"
    );
    Ok(Snapshot {
        enrollments: InMemoryEnrollmentSource::new(rows),
        evaluations: InMemoryEvaluationStore::new(tables),
    })
}

fn open(path: &Path) -> Result<BufReader<File>, SnapshotError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| SnapshotError::Io {
            file: path.display().to_string(),
            source,
        })
}

/// Parse an export of the academic view. Empty cells become absent values.
pub fn parse_enrollments<R: Read>(reader: R) -> Result<Vec<EnrollmentRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<EnrollmentCsvRow>() {
        rows.push(record?.into_row());
    }

    Ok(rows)
}

pub fn parse_evaluations<R: Read>(reader: R) -> Result<EvaluationTables, serde_json::Error> {
    serde_json::from_reader(reader)
}

#[derive(Debug, Deserialize)]
struct EnrollmentCsvRow {
    #[serde(rename = "ID_ESTUDIANTE", default, deserialize_with = "empty_string_as_none")]
    student: Option<String>,
    #[serde(rename = "ID_DOCENTE", default, deserialize_with = "empty_string_as_none")]
    docente: Option<String>,
    #[serde(rename = "COD_ASIGNATURA", default, deserialize_with = "empty_string_as_none")]
    subject_code: Option<String>,
    #[serde(rename = "ASIGNATURA", default, deserialize_with = "empty_string_as_none")]
    subject_name: Option<String>,
    #[serde(rename = "GRUPO", default, deserialize_with = "empty_string_as_none")]
    group: Option<String>,
    #[serde(rename = "NOMBRE_SEDE", default, deserialize_with = "empty_string_as_none")]
    site: Option<String>,
    #[serde(rename = "PERIODO", default, deserialize_with = "empty_string_as_none")]
    period: Option<String>,
    #[serde(rename = "NOM_PROGRAMA", default, deserialize_with = "empty_string_as_none")]
    program: Option<String>,
    #[serde(rename = "SEMESTRE", default, deserialize_with = "empty_string_as_none")]
    semester: Option<String>,
    #[serde(rename = "PRIMER_APELLIDO", default, deserialize_with = "empty_string_as_none")]
    first_surname: Option<String>,
    #[serde(rename = "SEGUNDO_APELLIDO", default, deserialize_with = "empty_string_as_none")]
    second_surname: Option<String>,
    #[serde(rename = "PRIMER_NOMBRE", default, deserialize_with = "empty_string_as_none")]
    first_name: Option<String>,
    #[serde(rename = "SEGUNDO_NOMBRE", default, deserialize_with = "empty_string_as_none")]
    second_name: Option<String>,
    #[serde(rename = "DOCENTE", default, deserialize_with = "empty_string_as_none")]
    docente_name: Option<String>,
}

impl EnrollmentCsvRow {
    fn into_row(self) -> EnrollmentRow {
        EnrollmentRow {
            student: self.student.map(StudentId),
            docente: self.docente.map(DocenteId),
            subject_code: self.subject_code.as_deref().and_then(SubjectCode::parse),
            subject_name: self.subject_name,
            group: self.group,
            site: self.site,
            period: self.period,
            program: self.program,
            semester: self.semester,
            student_name: PersonName {
                first_surname: self.first_surname,
                second_surname: self.second_surname,
                first_name: self.first_name,
                second_name: self.second_name,
            },
            docente_name: self.docente_name,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
