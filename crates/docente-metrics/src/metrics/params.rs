use serde::{Deserialize, Serialize};

use super::domain::{ConfigId, DocenteId, SubjectCode};
use super::filter::DimensionFilter;

/// Flat parameter bag accepted by every metrics operation.
///
/// Field names follow the public query-string contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsParams {
    #[serde(default)]
    pub cfg_t: Option<String>,
    #[serde(default)]
    pub docente: Option<String>,
    #[serde(default)]
    pub codigo_materia: Option<String>,
    #[serde(default)]
    pub sede: Option<String>,
    #[serde(default)]
    pub periodo: Option<String>,
    #[serde(default)]
    pub programa: Option<String>,
    #[serde(default)]
    pub semestre: Option<String>,
    #[serde(default)]
    pub grupo: Option<String>,
}

impl MetricsParams {
    pub fn for_configuration(cfg_t: impl Into<String>) -> Self {
        Self {
            cfg_t: Some(cfg_t.into()),
            ..Self::default()
        }
    }

    pub fn with_docente(mut self, docente: impl Into<String>) -> Self {
        self.docente = Some(docente.into());
        self
    }

    pub fn with_subject(mut self, codigo_materia: impl Into<String>) -> Self {
        self.codigo_materia = Some(codigo_materia.into());
        self
    }

    pub fn configuration(&self) -> Result<ConfigId, ParameterError> {
        let raw = self
            .cfg_t
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ParameterError::MissingConfiguration)?;

        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Ok(ConfigId(id)),
            _ => Err(ParameterError::InvalidConfiguration(raw.to_string())),
        }
    }

    pub fn docente(&self) -> Result<DocenteId, ParameterError> {
        self.docente
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(|value| DocenteId(value.to_string()))
            .ok_or(ParameterError::MissingDocente)
    }

    pub fn subject(&self) -> Result<SubjectCode, ParameterError> {
        self.optional_subject().ok_or(ParameterError::MissingSubject)
    }

    pub fn optional_subject(&self) -> Option<SubjectCode> {
        self.codigo_materia.as_deref().and_then(SubjectCode::parse)
    }

    /// Subject code exactly as the caller sent it, when it names a subject.
    pub fn requested_subject(&self) -> Option<String> {
        self.optional_subject().and(self.codigo_materia.clone())
    }

    pub fn dimensions(&self) -> DimensionFilter {
        DimensionFilter::normalized(
            self.sede.as_deref(),
            self.periodo.as_deref(),
            self.programa.as_deref(),
            self.semestre.as_deref(),
            self.grupo.as_deref(),
        )
    }
}

/// Invalid or missing request parameters, raised before any query executes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    #[error("cfg_t is required")]
    MissingConfiguration,
    #[error("cfg_t must be a positive integer, got '{0}'")]
    InvalidConfiguration(String),
    #[error("docente is required")]
    MissingDocente,
    #[error("codigo_materia is required")]
    MissingSubject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_is_required_and_numeric() {
        assert_eq!(
            MetricsParams::default().configuration(),
            Err(ParameterError::MissingConfiguration)
        );
        assert_eq!(
            MetricsParams::for_configuration(" ").configuration(),
            Err(ParameterError::MissingConfiguration)
        );
        assert_eq!(
            MetricsParams::for_configuration("abc").configuration(),
            Err(ParameterError::InvalidConfiguration("abc".to_string()))
        );
        assert_eq!(
            MetricsParams::for_configuration("0").configuration(),
            Err(ParameterError::InvalidConfiguration("0".to_string()))
        );
        assert_eq!(
            MetricsParams::for_configuration("12").configuration(),
            Ok(ConfigId(12))
        );
    }

    #[test]
    fn docente_and_subject_must_be_present() {
        let params = MetricsParams::for_configuration("1");
        assert_eq!(params.docente(), Err(ParameterError::MissingDocente));
        assert_eq!(params.subject(), Err(ParameterError::MissingSubject));

        let params = params.with_docente(" D1 ").with_subject("0042");
        assert_eq!(params.docente(), Ok(DocenteId(" D1 ".to_string())));
        assert_eq!(params.subject().map(|code| code.to_string()), Ok("42".to_string()));
        assert_eq!(params.requested_subject().as_deref(), Some("0042"));

        let empty = MetricsParams::for_configuration("1").with_docente("");
        assert_eq!(empty.docente(), Err(ParameterError::MissingDocente));
        assert_eq!(empty.with_subject(" ").requested_subject(), None);
    }

    #[test]
    fn dimension_values_pass_through_untouched() {
        let params = MetricsParams {
            sede: Some(" Sur ".to_string()),
            grupo: Some(String::new()),
            ..MetricsParams::for_configuration("1")
        };
        let dimensions = params.dimensions();
        assert_eq!(dimensions.site.as_deref(), Some(" Sur "));
        assert_eq!(dimensions.group, None);
    }

    #[test]
    fn query_strings_deserialize_into_the_bag() {
        let params: MetricsParams =
            serde_json::from_value(serde_json::json!({ "cfg_t": "3", "sede": "Norte" }))
                .expect("params deserialize");
        assert_eq!(params.configuration(), Ok(ConfigId(3)));
        assert_eq!(params.dimensions().site.as_deref(), Some("Norte"));
    }
}
