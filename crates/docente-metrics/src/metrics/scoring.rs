use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use super::domain::{AspectId, ConfigId, LinkId, ResponseDetail, ScaleId};
use super::store::{EvaluationStore, StoreError};

/// Resolves response details to their aspect and configuration-scoped points.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    aspect_by_link: HashMap<LinkId, AspectId>,
    points_by_link: HashMap<LinkId, f64>,
}

/// A response detail after resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredResponse {
    pub aspect: Option<AspectId>,
    /// `None` for open-ended responses and scales without points in this configuration.
    pub points: Option<f64>,
}

impl ScoreTable {
    /// Build the table from already fetched link and points rows.
    pub fn from_parts(
        links: impl IntoIterator<Item = (LinkId, AspectId, Option<ScaleId>)>,
        points: impl IntoIterator<Item = (ScaleId, f64)>,
    ) -> Self {
        let points_by_scale: HashMap<ScaleId, f64> = points
            .into_iter()
            .filter(|(scale, value)| {
                let finite = value.is_finite();
                if !finite {
                    warn!(scale = scale.0, "ignoring non-finite scale points");
                }
                finite
            })
            .collect();

        let mut aspect_by_link = HashMap::new();
        let mut points_by_link = HashMap::new();
        for (link, aspect, scale) in links {
            aspect_by_link.insert(link, aspect);
            if let Some(value) = scale.and_then(|scale| points_by_scale.get(&scale)) {
                points_by_link.insert(link, *value);
            }
        }

        Self {
            aspect_by_link,
            points_by_link,
        }
    }

    /// Resolve every link referenced by `details` with two batched lookups.
    pub async fn resolve<S>(
        store: &S,
        configuration: ConfigId,
        details: &[ResponseDetail],
    ) -> Result<Self, StoreError>
    where
        S: EvaluationStore + ?Sized,
    {
        let link_ids: Vec<LinkId> = details
            .iter()
            .map(|detail| detail.link)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if link_ids.is_empty() {
            return Ok(Self::default());
        }

        let links = store.links(&link_ids).await?;
        let scale_ids: Vec<ScaleId> = links
            .iter()
            .filter_map(|link| link.scale)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let points = if scale_ids.is_empty() {
            Vec::new()
        } else {
            store.scale_scores(configuration, &scale_ids).await?
        };

        let table = Self::from_parts(
            links
                .iter()
                .map(|link| (link.id, link.aspect, link.scale)),
            points.iter().map(|score| (score.scale, score.points)),
        );

        let unknown = link_ids
            .iter()
            .filter(|link| !table.aspect_by_link.contains_key(link))
            .count();
        if unknown > 0 {
            warn!(
                configuration = configuration.0,
                unknown, "responses reference unknown aspect-scale links"
            );
        }
        debug!(
            configuration = configuration.0,
            links = table.aspect_by_link.len(),
            scored_links = table.points_by_link.len(),
            "resolved score table"
        );
        Ok(table)
    }

    pub fn aspect(&self, link: LinkId) -> Option<AspectId> {
        self.aspect_by_link.get(&link).copied()
    }

    pub fn points(&self, link: LinkId) -> Option<f64> {
        self.points_by_link.get(&link).copied()
    }

    pub fn score(&self, detail: &ResponseDetail) -> ScoredResponse {
        ScoredResponse {
            aspect: self.aspect(detail.link),
            points: self.points(detail.link),
        }
    }

    /// Points of every scored response among `details`, in order.
    pub fn scored_points<'a>(
        &'a self,
        details: impl IntoIterator<Item = &'a ResponseDetail> + 'a,
    ) -> impl Iterator<Item = f64> + 'a {
        details
            .into_iter()
            .filter_map(|detail| self.points(detail.link))
    }
}
