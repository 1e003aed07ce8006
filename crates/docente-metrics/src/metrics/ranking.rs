use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::aspects::mean;
use super::domain::{ConfigId, DocenteId};
use super::responses::{self, ResponseSet};
use super::scoring::ScoreTable;
use super::store::{BaselineScope, EvaluationStore, RecordScope, StoreError};
use super::universe::Universe;

pub const DEFAULT_SMOOTHING: f64 = 20.0;

/// Which responses feed the ranking baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Every response in the local store, whatever its configuration.
    #[default]
    Store,
    /// Only responses of the configuration being ranked.
    Configuration,
}

impl BaselinePolicy {
    pub fn scope(self, configuration: ConfigId) -> BaselineScope {
        match self {
            BaselinePolicy::Store => BaselineScope::Store,
            BaselinePolicy::Configuration => BaselineScope::Configuration(configuration),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingSettings {
    /// Weight `m` of the baseline, in evaluation counts.
    pub smoothing: f64,
    pub baseline: BaselinePolicy,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            smoothing: DEFAULT_SMOOTHING,
            baseline: BaselinePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedDocente {
    pub docente: DocenteId,
    pub avg: f64,
    pub adjusted: f64,
    pub realized: usize,
    pub universe: usize,
}

/// Bayesian shrinkage of `avg` towards `baseline`: `v/(v+m)*avg + m/(v+m)*baseline`.
pub fn adjusted_score(evaluations: usize, avg: f64, baseline: f64, smoothing: f64) -> f64 {
    let v = evaluations as f64;
    let total = v + smoothing;
    if total <= 0.0 {
        return baseline;
    }
    (v / total) * avg + (smoothing / total) * baseline
}

/// Rank every docente of `universe` from one batched fetch.
pub async fn rank<S>(
    store: &S,
    universe: &Universe,
    configuration: ConfigId,
    settings: RankingSettings,
) -> Result<Vec<RankedDocente>, StoreError>
where
    S: EvaluationStore + ?Sized,
{
    if universe.docentes().is_empty() {
        return Ok(Vec::new());
    }

    let baseline = store
        .baseline_totals(settings.baseline.scope(configuration))
        .await?
        .mean()
        .unwrap_or(0.0);

    let scope = RecordScope::configuration(configuration).within_docentes(universe.docente_set());
    let responses = responses::fetch(store, &scope).await?;
    let table = ScoreTable::resolve(store, configuration, responses.details()).await?;

    debug!(
        configuration = configuration.0,
        docentes = universe.docentes().len(),
        baseline,
        "ranking docentes"
    );
    Ok(rank_docentes(
        universe,
        &responses,
        &table,
        baseline,
        settings.smoothing,
    ))
}

/// Score and order the docentes of `universe` using already fetched responses.
///
/// Ties keep universe discovery order.
pub fn rank_docentes(
    universe: &Universe,
    responses: &ResponseSet,
    table: &ScoreTable,
    baseline: f64,
    smoothing: f64,
) -> Vec<RankedDocente> {
    let mut owner = HashMap::new();
    let mut evaluations: HashMap<&DocenteId, usize> = HashMap::new();
    for record in responses.records() {
        if let Some(docente) = &record.docente {
            owner.insert(record.id, docente);
            *evaluations.entry(docente).or_default() += 1;
        }
    }

    let mut points: HashMap<&DocenteId, Vec<f64>> = HashMap::new();
    for detail in responses.details() {
        let (Some(docente), Some(value)) = (owner.get(&detail.evaluation), table.points(detail.link))
        else {
            continue;
        };
        points.entry(*docente).or_default().push(value);
    }

    let mut ranked: Vec<RankedDocente> = universe
        .docentes()
        .iter()
        .map(|docente| {
            let realized = evaluations.get(docente).copied().unwrap_or(0);
            let avg = points
                .get(docente)
                .and_then(|values| mean(values))
                .unwrap_or(0.0);
            RankedDocente {
                docente: docente.clone(),
                avg,
                adjusted: adjusted_score(realized, avg, baseline, smoothing),
                realized,
                universe: universe.students_of(docente),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.adjusted.total_cmp(&a.adjusted));
    ranked
}
