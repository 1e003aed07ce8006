use serde::Serialize;

use super::domain::{DocenteId, EnrollmentRow, SubjectCode};

/// Optional equality constraints over the universe dimensions.
///
/// Only provided keys constrain the universe. Values are opaque and compared verbatim; an empty
/// value is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DimensionFilter {
    pub site: Option<String>,
    pub period: Option<String>,
    pub program: Option<String>,
    pub semester: Option<String>,
    pub group: Option<String>,
}

impl DimensionFilter {
    pub fn normalized(
        site: Option<&str>,
        period: Option<&str>,
        program: Option<&str>,
        semester: Option<&str>,
        group: Option<&str>,
    ) -> Self {
        Self {
            site: present(site),
            period: present(period),
            program: present(program),
            semester: present(semester),
            group: present(group),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        FilterDimension::ordered()
            .into_iter()
            .all(|dimension| self.value(dimension).is_none())
    }

    pub fn value(&self, dimension: FilterDimension) -> Option<&str> {
        match dimension {
            FilterDimension::Site => self.site.as_deref(),
            FilterDimension::Period => self.period.as_deref(),
            FilterDimension::Program => self.program.as_deref(),
            FilterDimension::Semester => self.semester.as_deref(),
            FilterDimension::Group => self.group.as_deref(),
        }
    }

    pub fn matches(&self, row: &EnrollmentRow) -> bool {
        FilterDimension::ordered()
            .into_iter()
            .all(|dimension| match self.value(dimension) {
                Some(expected) => dimension.of(row) == Some(expected),
                None => true,
            })
    }

    /// Keep only the dimensions that precede `dimension` in the cascade.
    pub fn cascade_for(&self, dimension: FilterDimension) -> Self {
        let mut narrowed = Self::default();
        for earlier in FilterDimension::ordered()
            .into_iter()
            .take_while(|candidate| *candidate != dimension)
        {
            let value = self.value(earlier).map(str::to_string);
            match earlier {
                FilterDimension::Site => narrowed.site = value,
                FilterDimension::Period => narrowed.period = value,
                FilterDimension::Program => narrowed.program = value,
                FilterDimension::Semester => narrowed.semester = value,
                FilterDimension::Group => narrowed.group = value,
            }
        }
        narrowed
    }
}

fn present(value: Option<&str>) -> Option<String> {
    value
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Filterable universe dimensions in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    Site,
    Period,
    Program,
    Semester,
    Group,
}

impl FilterDimension {
    pub const fn ordered() -> [FilterDimension; 5] {
        [
            FilterDimension::Site,
            FilterDimension::Period,
            FilterDimension::Program,
            FilterDimension::Semester,
            FilterDimension::Group,
        ]
    }

    /// Column name in the upstream academic view.
    pub const fn column(self) -> &'static str {
        match self {
            FilterDimension::Site => "NOMBRE_SEDE",
            FilterDimension::Period => "PERIODO",
            FilterDimension::Program => "NOM_PROGRAMA",
            FilterDimension::Semester => "SEMESTRE",
            FilterDimension::Group => "GRUPO",
        }
    }

    /// Periods are listed newest first; every other dimension ascends.
    pub const fn descending(self) -> bool {
        matches!(self, FilterDimension::Period)
    }

    /// Order distinct values for display. Purely numeric lists sort by value, so semester
    /// `"10"` follows `"2"`.
    pub fn arrange(self, mut values: Vec<String>) -> Vec<String> {
        let numeric: Option<Vec<i64>> = values.iter().map(|value| value.parse().ok()).collect();
        match numeric {
            Some(numbers) if !values.is_empty() => {
                let mut keyed: Vec<(i64, String)> = numbers.into_iter().zip(values).collect();
                keyed.sort();
                values = keyed.into_iter().map(|(_, value)| value).collect();
            }
            _ => values.sort(),
        }
        if self.descending() {
            values.reverse();
        }
        values
    }

    pub fn of(self, row: &EnrollmentRow) -> Option<&str> {
        match self {
            FilterDimension::Site => row.site.as_deref(),
            FilterDimension::Period => row.period.as_deref(),
            FilterDimension::Program => row.program.as_deref(),
            FilterDimension::Semester => row.semester.as_deref(),
            FilterDimension::Group => row.group.as_deref(),
        }
    }
}

/// Predicate handed to an [`EnrollmentSource`](super::store::EnrollmentSource).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniverseQuery {
    pub dimensions: DimensionFilter,
    pub docente: Option<DocenteId>,
    pub subject: Option<SubjectCode>,
}

impl UniverseQuery {
    pub fn new(dimensions: DimensionFilter) -> Self {
        Self {
            dimensions,
            docente: None,
            subject: None,
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

    pub fn matches(&self, row: &EnrollmentRow) -> bool {
        if let Some(docente) = &self.docente {
            if row.docente.as_ref() != Some(docente) {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if row.subject_code.as_ref() != Some(subject) {
                return false;
            }
        }
        self.dimensions.matches(row)
    }
}
