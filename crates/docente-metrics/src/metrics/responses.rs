use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::domain::{EvaluationId, EvaluationRecord, ResponseDetail, StudentId};
use super::store::{EvaluationStore, RecordScope, StoreError};

/// Evaluation records of one scope together with their response details.
///
/// Records are kept regardless of realization; a record is realized when it owns at least
/// one detail.
#[derive(Debug, Clone, Default)]
pub struct ResponseSet {
    records: Vec<EvaluationRecord>,
    details: Vec<ResponseDetail>,
    realized: HashSet<EvaluationId>,
}

impl ResponseSet {
    pub fn new(records: Vec<EvaluationRecord>, details: Vec<ResponseDetail>) -> Self {
        let realized = details.iter().map(|detail| detail.evaluation).collect();
        Self {
            records,
            details,
            realized,
        }
    }

    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn details(&self) -> &[ResponseDetail] {
        &self.details
    }

    pub fn realized_ids(&self) -> &HashSet<EvaluationId> {
        &self.realized
    }

    pub fn is_realized(&self, record: &EvaluationRecord) -> bool {
        self.realized.contains(&record.id)
    }

    pub fn realized_records(&self) -> impl Iterator<Item = &EvaluationRecord> + '_ {
        self.records
            .iter()
            .filter(|record| self.realized.contains(&record.id))
    }

    pub fn realized_count(&self) -> usize {
        self.realized_records().count()
    }

    /// Distinct students holding at least one record, answered or not.
    pub fn registered_students(&self) -> BTreeSet<StudentId> {
        self.records
            .iter()
            .filter_map(|record| record.student.clone())
            .collect()
    }

    /// Sub-set of records accepted by `keep`, with their details.
    pub fn restricted<F>(&self, keep: F) -> ResponseSet
    where
        F: Fn(&EvaluationRecord) -> bool,
    {
        let records: Vec<EvaluationRecord> = self
            .records
            .iter()
            .filter(|record| keep(record))
            .cloned()
            .collect();
        let ids: HashSet<EvaluationId> = records.iter().map(|record| record.id).collect();
        let details = self
            .details
            .iter()
            .filter(|detail| ids.contains(&detail.evaluation))
            .cloned()
            .collect();
        ResponseSet::new(records, details)
    }
}

/// Fetch the records of `scope`, then their details in a single batched lookup.
pub async fn fetch<S>(store: &S, scope: &RecordScope) -> Result<ResponseSet, StoreError>
where
    S: EvaluationStore + ?Sized,
{
    let records = store.evaluations(scope).await?;
    let ids: Vec<EvaluationId> = records.iter().map(|record| record.id).collect();
    let details = if ids.is_empty() {
        Vec::new()
    } else {
        store.details(&ids).await?
    };

    let set = ResponseSet::new(records, details);
    debug!(
        configuration = scope.configuration.0,
        records = set.records().len(),
        details = set.details().len(),
        realized = set.realized_ids().len(),
        "fetched evaluation records"
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::domain::{ConfigId, DocenteId, LinkId, SubjectCode};

    fn record(id: i64, student: &str, subject: &str) -> EvaluationRecord {
        EvaluationRecord {
            id: EvaluationId(id),
            configuration: ConfigId(1),
            student: Some(StudentId(student.to_string())),
            docente: Some(DocenteId("D1".to_string())),
            subject: SubjectCode::parse(subject),
            general_comment: None,
        }
    }

    fn detail(evaluation: i64, link: i64) -> ResponseDetail {
        ResponseDetail {
            evaluation: EvaluationId(evaluation),
            link: LinkId(link),
            comment: None,
        }
    }

    #[test]
    fn realized_requires_at_least_one_detail() {
        let set = ResponseSet::new(
            vec![record(1, "S1", "10"), record(2, "S2", "10")],
            vec![detail(1, 7), detail(1, 8)],
        );
        assert_eq!(set.records().len(), 2);
        assert_eq!(set.realized_count(), 1);
        assert!(set.is_realized(&set.records()[0]));
        assert!(!set.is_realized(&set.records()[1]));
        assert_eq!(set.registered_students().len(), 2);
    }

    #[test]
    fn restriction_carries_matching_details_only() {
        let set = ResponseSet::new(
            vec![record(1, "S1", "10"), record(2, "S1", "20")],
            vec![detail(1, 7), detail(2, 8)],
        );
        let subject = SubjectCode::parse("20");
        let narrowed = set.restricted(|record| record.subject == subject);
        assert_eq!(narrowed.records().len(), 1);
        assert_eq!(narrowed.details().len(), 1);
        assert_eq!(narrowed.details()[0].link, LinkId(8));
    }
}
