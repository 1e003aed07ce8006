use std::collections::HashSet;

use super::domain::{DocenteId, StudentId};
use super::responses::ResponseSet;
use super::universe::{MatchKey, RosterEntry, SlotKey, Universe};

/// Expected, realized and pending evaluation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalCompletion {
    pub expected: usize,
    pub realized: usize,
    pub pending: usize,
}

impl GlobalCompletion {
    pub fn new(expected: usize, realized: usize) -> Self {
        Self {
            expected,
            realized,
            pending: expected.saturating_sub(realized),
        }
    }

    /// Realized share of the expected work in percent, `0.0` when nothing is expected.
    pub fn percentage(&self) -> f64 {
        if self.expected == 0 {
            0.0
        } else {
            self.realized as f64 / self.expected as f64 * 100.0
        }
    }
}

/// Completed versus pending members of a population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulationCompletion {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

/// Students of a roster split by completion, preserving roster order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionPartition {
    pub completed: Vec<RosterEntry>,
    pub pending: Vec<RosterEntry>,
}

impl CompletionPartition {
    fn split<F>(roster: Vec<RosterEntry>, is_completed: F) -> Self
    where
        F: Fn(&StudentId) -> bool,
    {
        let (completed, pending) = roster
            .into_iter()
            .partition(|entry| is_completed(&entry.student));
        Self { completed, pending }
    }
}

/// Matches universe slots against realized records.
///
/// Every `every`-style test below is vacuously true for an empty slot list, so a student or
/// docente without slots counts as completed.
#[derive(Debug)]
pub struct Reconciler<'a> {
    universe: &'a Universe,
    responses: &'a ResponseSet,
    realized: HashSet<MatchKey>,
}

impl<'a> Reconciler<'a> {
    pub fn new(universe: &'a Universe, responses: &'a ResponseSet) -> Self {
        let realized = responses
            .realized_records()
            .filter_map(MatchKey::of_record)
            .collect();
        Self {
            universe,
            responses,
            realized,
        }
    }

    pub fn slot_realized(&self, slot: &SlotKey) -> bool {
        self.realized.contains(&slot.match_key())
    }

    pub fn student_completed(&self, student: &StudentId) -> bool {
        self.universe
            .slots_of(student)
            .iter()
            .all(|slot| self.slot_realized(slot))
    }

    /// Completion of `student` considering only the slots owed to `docente`.
    pub fn student_completed_for(&self, student: &StudentId, docente: &DocenteId) -> bool {
        self.universe
            .slots_of(student)
            .iter()
            .filter(|slot| &slot.docente == docente)
            .all(|slot| self.slot_realized(slot))
    }

    pub fn docente_completed(&self, docente: &DocenteId) -> bool {
        self.universe
            .students_by_docente()
            .get(docente)
            .map(|students| {
                students
                    .iter()
                    .all(|student| self.student_completed_for(student, docente))
            })
            .unwrap_or(true)
    }

    /// Universe slots against realized records of the fetched scope.
    pub fn global(&self) -> GlobalCompletion {
        GlobalCompletion::new(self.universe.slots().len(), self.responses.realized_count())
    }

    pub fn students(&self) -> PopulationCompletion {
        let total = self.universe.students().len();
        let completed = self
            .universe
            .students()
            .iter()
            .filter(|student| self.student_completed(student))
            .count();
        PopulationCompletion {
            total,
            completed,
            pending: total - completed,
        }
    }

    pub fn docentes(&self) -> PopulationCompletion {
        let total = self.universe.docentes().len();
        let completed = self
            .universe
            .docentes()
            .iter()
            .filter(|docente| self.docente_completed(docente))
            .count();
        PopulationCompletion {
            total,
            completed,
            pending: total - completed,
        }
    }

    /// Roster of a docente-scoped universe split by per-docente completion.
    pub fn docente_roster(&self, docente: &DocenteId) -> CompletionPartition {
        CompletionPartition::split(self.universe.roster(), |student| {
            self.student_completed_for(student, docente)
        })
    }
}

/// Roster of a subject-scoped universe: a student is completed once any realized record of
/// theirs exists in `responses`, with no closure over other subjects.
pub fn subject_roster(universe: &Universe, responses: &ResponseSet) -> CompletionPartition {
    let answered: HashSet<&StudentId> = responses
        .realized_records()
        .filter_map(|record| record.student.as_ref())
        .collect();
    CompletionPartition::split(universe.roster(), |student| answered.contains(student))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::domain::{
        ConfigId, EnrollmentRow, EvaluationId, EvaluationRecord, LinkId, ResponseDetail,
        SubjectCode,
    };

    fn row(student: &str, docente: &str, subject: &str, group: &str) -> EnrollmentRow {
        EnrollmentRow {
            student: Some(StudentId(student.to_string())),
            docente: Some(DocenteId(docente.to_string())),
            subject_code: SubjectCode::parse(subject),
            group: Some(group.to_string()),
            ..EnrollmentRow::default()
        }
    }

    fn record(id: i64, student: &str, docente: &str, subject: &str) -> EvaluationRecord {
        EvaluationRecord {
            id: EvaluationId(id),
            configuration: ConfigId(1),
            student: Some(StudentId(student.to_string())),
            docente: Some(DocenteId(docente.to_string())),
            subject: SubjectCode::parse(subject),
            general_comment: None,
        }
    }

    fn answered(ids: &[i64]) -> Vec<ResponseDetail> {
        ids.iter()
            .map(|id| ResponseDetail {
                evaluation: EvaluationId(*id),
                link: LinkId(1),
                comment: None,
            })
            .collect()
    }

    #[test]
    fn pending_is_clamped_at_zero() {
        let completion = GlobalCompletion::new(2, 5);
        assert_eq!(completion.pending, 0);
        assert_eq!(GlobalCompletion::new(0, 0).percentage(), 0.0);
        assert!((GlobalCompletion::new(4, 1).percentage() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn student_with_one_unrealized_slot_is_pending() {
        let universe = Universe::from_rows(vec![
            row("S1", "D1", "10", "A"),
            row("S1", "D2", "20", "A"),
            row("S1", "D2", "30", "B"),
        ]);
        let responses = ResponseSet::new(
            vec![record(1, "S1", "D1", "10"), record(2, "S1", "D2", "20")],
            answered(&[1]),
        );
        let reconciler = Reconciler::new(&universe, &responses);

        assert!(!reconciler.student_completed(&StudentId("S1".to_string())));
        assert_eq!(reconciler.students().completed, 0);
        assert!(reconciler.docente_completed(&DocenteId("D1".to_string())));
        assert!(!reconciler.docente_completed(&DocenteId("D2".to_string())));
    }

    #[test]
    fn student_without_slots_is_vacuously_completed() {
        let mut orphan = row("S9", "D1", "10", "A");
        orphan.docente = None;
        let universe = Universe::from_rows(vec![orphan]);
        let responses = ResponseSet::default();
        let reconciler = Reconciler::new(&universe, &responses);

        assert!(reconciler.student_completed(&StudentId("S9".to_string())));
        assert_eq!(
            reconciler.students(),
            PopulationCompletion {
                total: 1,
                completed: 1,
                pending: 0
            }
        );
    }

    #[test]
    fn group_is_not_part_of_the_match() {
        let universe = Universe::from_rows(vec![
            row("S1", "D1", "10", "A"),
            row("S1", "D1", "10", "B"),
        ]);
        let responses = ResponseSet::new(vec![record(1, "S1", "D1", "010")], answered(&[1]));
        let reconciler = Reconciler::new(&universe, &responses);

        assert!(reconciler.student_completed(&StudentId("S1".to_string())));
        assert_eq!(reconciler.global(), GlobalCompletion::new(2, 1));
    }

    #[test]
    fn registered_but_unanswered_records_do_not_count() {
        let universe = Universe::from_rows(vec![row("S1", "D1", "10", "A")]);
        let responses = ResponseSet::new(vec![record(1, "S1", "D1", "10")], Vec::new());
        let reconciler = Reconciler::new(&universe, &responses);

        assert_eq!(reconciler.global().realized, 0);
        assert_eq!(reconciler.docentes().pending, 1);
        let roster = reconciler.docente_roster(&DocenteId("D1".to_string()));
        assert!(roster.completed.is_empty());
        assert_eq!(roster.pending.len(), 1);
    }

    #[test]
    fn subject_roster_uses_realized_students() {
        let universe = Universe::from_rows(vec![
            row("S1", "D1", "10", "A"),
            row("S2", "D1", "10", "A"),
        ]);
        let responses = ResponseSet::new(
            vec![record(1, "S1", "D1", "10"), record(2, "S2", "D1", "10")],
            answered(&[2]),
        );
        let partition = subject_roster(&universe, &responses);
        assert_eq!(partition.completed.len(), 1);
        assert_eq!(partition.completed[0].student, StudentId("S2".to_string()));
        assert_eq!(partition.pending[0].student, StudentId("S1".to_string()));
    }
}
