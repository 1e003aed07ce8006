use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of an enrolled student as published by the academic view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

/// Identifier of an evaluated instructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocenteId(pub String);

/// Evaluation campaign (`cfg_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationId(pub i64);

/// Aspect/scale pairing referenced by every response detail (`a_e`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AspectId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaleId(pub i64);

/// Subject code in canonical form.
///
/// The universe publishes codes as numbers while local records store them as text, so numeric
/// codes are normalized to their decimal representation (`"007"` and `7` compare equal).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubjectCode(String);

impl SubjectCode {
    /// Canonicalize a raw code, returning `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        match trimmed.parse::<u64>() {
            Ok(number) => Some(Self(number.to_string())),
            Err(_) => Some(Self(trimmed.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SubjectCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawCode {
            Text(String),
            Number(i64),
        }

        let raw = match RawCode::deserialize(deserializer)? {
            RawCode::Text(text) => text,
            RawCode::Number(number) => number.to_string(),
        };

        SubjectCode::parse(&raw).ok_or_else(|| serde::de::Error::custom("empty subject code"))
    }
}

/// Name parts of an enrolled student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first_surname: Option<String>,
    pub second_surname: Option<String>,
    pub first_name: Option<String>,
    pub second_name: Option<String>,
}

impl PersonName {
    /// Surnames first, blanks skipped, whitespace collapsed. `None` when nothing remains.
    pub fn display(&self) -> Option<String> {
        let joined = [
            &self.first_surname,
            &self.second_surname,
            &self.first_name,
            &self.second_name,
        ]
        .into_iter()
        .flatten()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");

        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

/// One row of the read-only enrollment universe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentRow {
    pub student: Option<StudentId>,
    pub docente: Option<DocenteId>,
    pub subject_code: Option<SubjectCode>,
    pub subject_name: Option<String>,
    pub group: Option<String>,
    pub site: Option<String>,
    pub period: Option<String>,
    pub program: Option<String>,
    pub semester: Option<String>,
    pub student_name: PersonName,
    pub docente_name: Option<String>,
}

/// Locally owned evaluation instance (`eval`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: EvaluationId,
    #[serde(rename = "id_configuracion")]
    pub configuration: ConfigId,
    #[serde(rename = "estudiante", default)]
    pub student: Option<StudentId>,
    #[serde(default)]
    pub docente: Option<DocenteId>,
    #[serde(rename = "codigo_materia", default)]
    pub subject: Option<SubjectCode>,
    #[serde(rename = "cmt_gen", default)]
    pub general_comment: Option<String>,
}

/// Submitted answer for one aspect of an evaluation (`eval_det`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDetail {
    #[serde(rename = "eval_id")]
    pub evaluation: EvaluationId,
    #[serde(rename = "a_e_id")]
    pub link: LinkId,
    #[serde(rename = "cmt", default)]
    pub comment: Option<String>,
}

/// Aspect paired with an optional scale. A missing scale marks an open-ended aspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectScaleLink {
    pub id: LinkId,
    #[serde(rename = "aspecto_id")]
    pub aspect: AspectId,
    #[serde(rename = "escala_id", default)]
    pub scale: Option<ScaleId>,
    #[serde(rename = "es_cmt", default)]
    pub allows_comment: bool,
    #[serde(rename = "es_cmt_oblig", default)]
    pub requires_comment: bool,
}

/// Configuration-scoped point value of a scale option (`cfg_e`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleScore {
    #[serde(rename = "cfg_t_id")]
    pub configuration: ConfigId,
    #[serde(rename = "escala_id")]
    pub scale: ScaleId,
    #[serde(rename = "puntaje")]
    pub points: f64,
}

/// Aspect metadata used for display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectInfo {
    pub id: AspectId,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
}

/// Output of the external comment summarizer persisted per evaluation (`cmt_ai`).
///
/// `strengths` and `weaknesses` hold the raw JSON text written by the summarizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAnalysis {
    #[serde(rename = "eval_id")]
    pub evaluation: EvaluationId,
    #[serde(rename = "aspecto_id", default)]
    pub aspect: Option<AspectId>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(rename = "conclusion_gen", default)]
    pub general_conclusion: Option<String>,
    #[serde(rename = "fortaleza", default)]
    pub strengths: Option<String>,
    #[serde(rename = "debilidad", default)]
    pub weaknesses: Option<String>,
}
