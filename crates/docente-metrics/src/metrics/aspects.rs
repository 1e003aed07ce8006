use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::domain::{AspectId, ResponseDetail};
use super::scoring::ScoreTable;
use super::store::{EvaluationStore, StoreError};

/// Responses accumulated for one aspect.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectTally {
    pub aspect: AspectId,
    /// Every response, scored or open-ended.
    pub responses: usize,
    pub sum: f64,
    pub scores: Vec<f64>,
    /// Response comments kept for display, see [`kept_comment`].
    pub comments: Vec<String>,
}

impl AspectTally {
    fn new(aspect: AspectId) -> Self {
        Self {
            aspect,
            responses: 0,
            sum: 0.0,
            scores: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn is_scored(&self) -> bool {
        !self.scores.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        mean(&self.scores)
    }

    pub fn stddev(&self) -> Option<f64> {
        population_stddev(&self.scores)
    }
}

/// Per-aspect aggregation of a batch of responses, in first-seen aspect order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AspectBreakdown {
    tallies: Vec<AspectTally>,
    total_responses: usize,
}

impl AspectBreakdown {
    /// Group `details` by aspect. Details whose link resolves to no aspect are counted in
    /// [`total_responses`](Self::total_responses) only.
    pub fn aggregate(details: &[ResponseDetail], table: &ScoreTable) -> Self {
        let mut tallies: Vec<AspectTally> = Vec::new();
        let mut index: HashMap<AspectId, usize> = HashMap::new();

        for detail in details {
            let scored = table.score(detail);
            let Some(aspect) = scored.aspect else {
                continue;
            };
            let position = *index.entry(aspect).or_insert_with(|| {
                tallies.push(AspectTally::new(aspect));
                tallies.len() - 1
            });

            let tally = &mut tallies[position];
            tally.responses += 1;
            if let Some(points) = scored.points {
                tally.sum += points;
                tally.scores.push(points);
            }
            if let Some(comment) = kept_comment(detail.comment.as_deref()) {
                tally.comments.push(comment.to_string());
            }
        }

        Self {
            tallies,
            total_responses: details.len(),
        }
    }

    pub fn tallies(&self) -> &[AspectTally] {
        &self.tallies
    }

    pub fn total_responses(&self) -> usize {
        self.total_responses
    }

    pub fn total_sum(&self) -> f64 {
        self.tallies.iter().map(|tally| tally.sum).sum()
    }

    pub fn scored_aspects(&self) -> usize {
        self.tallies.iter().filter(|tally| tally.is_scored()).count()
    }

    /// Sum of every scored value divided by the number of scored aspects.
    ///
    /// This is not the mean of per-aspect means: aspects with more responses weigh more in the
    /// numerator while the denominator counts aspects.
    pub fn global_mean(&self) -> Option<f64> {
        match self.scored_aspects() {
            0 => None,
            scored => Some(self.total_sum() / scored as f64),
        }
    }

    /// Population deviation of the per-aspect means around [`global_mean`](Self::global_mean).
    pub fn global_stddev(&self) -> Option<f64> {
        let center = self.global_mean()?;
        let means: Vec<f64> = self.tallies.iter().filter_map(AspectTally::mean).collect();
        deviation_around(&means, center)
    }

    pub fn aspect_ids(&self) -> Vec<AspectId> {
        self.tallies.iter().map(|tally| tally.aspect).collect()
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation (divides by N). `None` for an empty slice.
pub fn population_stddev(values: &[f64]) -> Option<f64> {
    deviation_around(values, mean(values)?)
}

fn deviation_around(values: &[f64], center: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let variance = values
        .iter()
        .map(|value| (value - center).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt())
}

/// A response comment is shown when it has visible text or is exactly empty.
pub fn kept_comment(raw: Option<&str>) -> Option<&str> {
    raw.filter(|comment| comment.is_empty() || !comment.trim().is_empty())
}

/// Display names for `ids`. Aspects without metadata or with a blank name are left out.
pub async fn aspect_names<S>(
    store: &S,
    ids: &[AspectId],
) -> Result<HashMap<AspectId, String>, StoreError>
where
    S: EvaluationStore + ?Sized,
{
    let unique: Vec<AspectId> = ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if unique.is_empty() {
        return Ok(HashMap::new());
    }

    let names: HashMap<AspectId, String> = store
        .aspects(&unique)
        .await?
        .into_iter()
        .filter_map(|info| {
            let name = info.name.filter(|name| !name.trim().is_empty())?;
            Some((info.id, name))
        })
        .collect();
    debug!(
        requested = unique.len(),
        named = names.len(),
        "resolved aspect names"
    );
    Ok(names)
}
