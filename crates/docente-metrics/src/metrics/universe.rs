use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use super::domain::{DocenteId, EnrollmentRow, EvaluationRecord, StudentId, SubjectCode};
use super::filter::UniverseQuery;
use super::store::{EnrollmentSource, StoreError};

/// One expected evaluation: a universe row carrying both a student and a docente.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub student: StudentId,
    pub docente: DocenteId,
    pub subject: Option<SubjectCode>,
    pub group: Option<String>,
}

impl SlotKey {
    /// Project onto the fields local records carry.
    pub fn match_key(&self) -> MatchKey {
        MatchKey {
            student: self.student.clone(),
            docente: self.docente.clone(),
            subject: self.subject.clone(),
        }
    }
}

/// Key pairing a universe slot with a local evaluation record.
///
/// Records do not store the enrollment group, so `group` is not part of the key: two slots of
/// the same student, docente and subject under different groups are satisfied by one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchKey {
    pub student: StudentId,
    pub docente: DocenteId,
    pub subject: Option<SubjectCode>,
}

impl MatchKey {
    pub fn of_record(record: &EvaluationRecord) -> Option<Self> {
        Some(Self {
            student: record.student.clone()?,
            docente: record.docente.clone()?,
            subject: record.subject.clone(),
        })
    }
}

/// Student listed in a completion roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub student: StudentId,
    pub name: Option<String>,
}

/// Students expected to evaluate a docente within one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGroup {
    pub code: Option<SubjectCode>,
    pub name: Option<String>,
    pub students: BTreeSet<StudentId>,
}

/// Expected-work set derived from the enrollment universe under one predicate.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    rows: Vec<EnrollmentRow>,
    students: BTreeSet<StudentId>,
    docentes: Vec<DocenteId>,
    slots: Vec<SlotKey>,
    slots_by_student: HashMap<StudentId, Vec<SlotKey>>,
    students_by_docente: HashMap<DocenteId, BTreeSet<StudentId>>,
}

impl Universe {
    pub fn from_rows(rows: Vec<EnrollmentRow>) -> Self {
        let mut students = BTreeSet::new();
        let mut docentes = Vec::new();
        let mut seen_docentes = HashSet::new();
        let mut slots = Vec::new();
        let mut slots_by_student: HashMap<StudentId, Vec<SlotKey>> = HashMap::new();
        let mut students_by_docente: HashMap<DocenteId, BTreeSet<StudentId>> = HashMap::new();

        for row in &rows {
            if let Some(student) = &row.student {
                students.insert(student.clone());
            }
            if let Some(docente) = &row.docente {
                if seen_docentes.insert(docente.clone()) {
                    docentes.push(docente.clone());
                }
            }

            let (Some(student), Some(docente)) = (&row.student, &row.docente) else {
                continue;
            };

            let slot = SlotKey {
                student: student.clone(),
                docente: docente.clone(),
                subject: row.subject_code.clone(),
                group: row.group.clone(),
            };
            slots_by_student
                .entry(student.clone())
                .or_default()
                .push(slot.clone());
            students_by_docente
                .entry(docente.clone())
                .or_default()
                .insert(student.clone());
            slots.push(slot);
        }

        Self {
            rows,
            students,
            docentes,
            slots,
            slots_by_student,
            students_by_docente,
        }
    }

    /// Number of raw universe rows, including rows missing a student or docente.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn students(&self) -> &BTreeSet<StudentId> {
        &self.students
    }

    /// Distinct docentes in discovery order.
    pub fn docentes(&self) -> &[DocenteId] {
        &self.docentes
    }

    pub fn docente_set(&self) -> BTreeSet<DocenteId> {
        self.docentes.iter().cloned().collect()
    }

    /// Expected evaluations; its length is the completion denominator.
    pub fn slots(&self) -> &[SlotKey] {
        &self.slots
    }

    pub fn slots_by_student(&self) -> &HashMap<StudentId, Vec<SlotKey>> {
        &self.slots_by_student
    }

    pub fn slots_of(&self, student: &StudentId) -> &[SlotKey] {
        self.slots_by_student
            .get(student)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn students_by_docente(&self) -> &HashMap<DocenteId, BTreeSet<StudentId>> {
        &self.students_by_docente
    }

    pub fn students_of(&self, docente: &DocenteId) -> usize {
        self.students_by_docente
            .get(docente)
            .map(BTreeSet::len)
            .unwrap_or(0)
    }

    /// First non-empty docente display name in the universe.
    pub fn docente_name(&self) -> Option<String> {
        self.rows
            .iter()
            .filter_map(|row| row.docente_name.as_deref())
            .map(str::trim)
            .find(|name| !name.is_empty())
            .map(str::to_string)
    }

    /// Distinct students in discovery order; the last row seen for a student supplies the name.
    pub fn roster(&self) -> Vec<RosterEntry> {
        let mut order: Vec<StudentId> = Vec::new();
        let mut names: HashMap<StudentId, Option<String>> = HashMap::new();

        for row in &self.rows {
            let Some(student) = &row.student else {
                continue;
            };
            if names
                .insert(student.clone(), row.student_name.display())
                .is_none()
            {
                order.push(student.clone());
            }
        }

        order
            .into_iter()
            .map(|student| {
                let name = names.remove(&student).flatten();
                RosterEntry { student, name }
            })
            .collect()
    }

    /// Rows grouped by subject code in discovery order; the first row names the subject.
    pub fn subjects(&self) -> Vec<SubjectGroup> {
        let mut groups: Vec<SubjectGroup> = Vec::new();
        let mut index: HashMap<Option<SubjectCode>, usize> = HashMap::new();

        for row in &self.rows {
            let position = *index.entry(row.subject_code.clone()).or_insert_with(|| {
                groups.push(SubjectGroup {
                    code: row.subject_code.clone(),
                    name: row.subject_name.clone().filter(|name| !name.is_empty()),
                    students: BTreeSet::new(),
                });
                groups.len() - 1
            });
            if let Some(student) = &row.student {
                groups[position].students.insert(student.clone());
            }
        }

        groups
    }
}

/// Resolve the universe for `query`. The source is only read.
pub async fn resolve<U>(source: &U, query: &UniverseQuery) -> Result<Universe, StoreError>
where
    U: EnrollmentSource + ?Sized,
{
    let rows = source.enrollments(query).await?;
    let universe = Universe::from_rows(rows);
    debug!(
        rows = universe.row_count(),
        slots = universe.slots().len(),
        students = universe.students().len(),
        docentes = universe.docentes().len(),
        "resolved enrollment universe"
    );
    Ok(universe)
}
