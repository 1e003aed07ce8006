use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use super::aspects::{self, AspectBreakdown};
use super::completion::{self, Reconciler};
use super::domain::{AspectId, CommentAnalysis, ConfigId, DocenteId, EvaluationId};
use super::filter::{DimensionFilter, FilterDimension, UniverseQuery};
use super::params::{MetricsParams, ParameterError};
use super::ranking::{self, RankingSettings};
use super::responses::{self, ResponseSet};
use super::scoring::ScoreTable;
use super::store::{EnrollmentSource, EvaluationStore, RecordScope, StoreError};
use super::universe::{self, Universe};
use super::views::{
    AspectMetric, AspectMetricsView, AspectTotals, CommentedAspect, DocenteCommentsView,
    DocenteCompletionView, DocenteStatsView, FilterOptionsView, GeneralTotals, RankingEntry,
    RankingView, StudentView, SubjectCompletionView, SubjectMetric, SubjectMetricsView,
    SummaryView,
};

/// Entry points of the metrics engine.
///
/// Each call validates its parameters before touching either store, then recomputes from
/// scratch; nothing is cached between calls.
pub struct MetricsService<U: ?Sized, S: ?Sized> {
    universe: Arc<U>,
    store: Arc<S>,
    ranking: RankingSettings,
}

/// Error raised by the metrics service.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything fetched for one docente under a configuration.
struct DocenteScope {
    docente: DocenteId,
    universe: Universe,
    responses: ResponseSet,
    table: ScoreTable,
}

impl<U, S> MetricsService<U, S>
where
    U: EnrollmentSource + ?Sized,
    S: EvaluationStore + ?Sized,
{
    pub fn new(universe: Arc<U>, store: Arc<S>, ranking: RankingSettings) -> Self {
        Self {
            universe,
            store,
            ranking,
        }
    }

    pub fn ranking_settings(&self) -> RankingSettings {
        self.ranking
    }

    /// Global completion totals for a configuration under the dimension filters.
    pub async fn summary(&self, params: &MetricsParams) -> Result<SummaryView, MetricsError> {
        let configuration = params.configuration()?;
        let query = UniverseQuery::new(params.dimensions());

        let universe = universe::resolve(self.universe.as_ref(), &query).await?;
        let scope = RecordScope::configuration(configuration)
            .within_students(universe.students().clone())
            .within_docentes(universe.docente_set());
        let responses = responses::fetch(self.store.as_ref(), &scope).await?;
        let registered = self
            .store
            .evaluations(&RecordScope::configuration(configuration))
            .await?;

        let reconciler = Reconciler::new(&universe, &responses);
        let global = reconciler.global();
        let students = reconciler.students();
        let docentes = reconciler.docentes();
        let registered_students: BTreeSet<_> = registered
            .iter()
            .filter_map(|record| record.student.as_ref())
            .collect();

        debug!(
            configuration = configuration.0,
            expected = global.expected,
            realized = global.realized,
            "computed evaluation summary"
        );
        Ok(SummaryView {
            generales: GeneralTotals {
                total_evaluaciones: global.expected,
                total_evaluaciones_registradas: registered.len(),
                total_realizadas: global.realized,
                total_pendientes: global.pending,
                total_estudiantes: students.total,
                total_estudiantes_registrados: registered_students.len(),
                total_estudiantes_pendientes: students.pending,
                total_docentes: docentes.total,
                total_docentes_pendientes: docentes.pending,
            },
        })
    }

    pub async fn docente_stats(
        &self,
        params: &MetricsParams,
    ) -> Result<DocenteStatsView, MetricsError> {
        let configuration = params.configuration()?;
        let docente = params.docente()?;

        let scope = self
            .load_docente(configuration, params.dimensions(), docente)
            .await?;
        Ok(stats_view(&scope))
    }

    /// Docentes of the filtered universe ordered by adjusted score.
    pub async fn ranking(&self, params: &MetricsParams) -> Result<RankingView, MetricsError> {
        let configuration = params.configuration()?;
        let query = UniverseQuery::new(params.dimensions());

        let universe = universe::resolve(self.universe.as_ref(), &query).await?;
        let ranked =
            ranking::rank(self.store.as_ref(), &universe, configuration, self.ranking).await?;
        Ok(RankingView {
            ranking: ranked.into_iter().map(RankingEntry::from).collect(),
        })
    }

    pub async fn docente_completion(
        &self,
        params: &MetricsParams,
    ) -> Result<DocenteCompletionView, MetricsError> {
        let configuration = params.configuration()?;
        let docente = params.docente()?;

        let query = UniverseQuery::new(params.dimensions()).for_docente(docente.clone());
        let universe = universe::resolve(self.universe.as_ref(), &query).await?;
        let scope = RecordScope::configuration(configuration).for_docente(docente.clone());
        let responses = responses::fetch(self.store.as_ref(), &scope).await?;

        let partition = Reconciler::new(&universe, &responses).docente_roster(&docente);
        Ok(DocenteCompletionView {
            docente_nombre: universe.docente_name(),
            docente,
            completados: partition.completed.into_iter().map(StudentView::from).collect(),
            pendientes: partition.pending.into_iter().map(StudentView::from).collect(),
        })
    }

    /// Per-aspect metrics over every response of the docente in the configuration.
    pub async fn docente_aspects(
        &self,
        params: &MetricsParams,
    ) -> Result<AspectMetricsView, MetricsError> {
        let configuration = params.configuration()?;
        let docente = params.docente()?;

        let scope = RecordScope::configuration(configuration).for_docente(docente.clone());
        self.aspect_view(configuration, docente, None, &scope).await
    }

    pub async fn docente_subjects(
        &self,
        params: &MetricsParams,
    ) -> Result<SubjectMetricsView, MetricsError> {
        let configuration = params.configuration()?;
        let docente = params.docente()?;

        let scope = self
            .load_docente(configuration, params.dimensions(), docente)
            .await?;
        let materias = scope
            .universe
            .subjects()
            .into_iter()
            .map(|group| {
                let subject = scope.responses.restricted(|record| {
                    group.code.is_some() && record.subject == group.code
                });
                let scores: Vec<f64> = scope.table.scored_points(subject.details()).collect();
                let expected = group.students.len();
                let realized = subject.realized_count();
                let completion = completion::GlobalCompletion::new(expected, realized);
                SubjectMetric {
                    codigo_materia: group.code,
                    nombre_materia: group.name,
                    total_evaluaciones: expected,
                    total_realizadas: realized,
                    total_pendientes: completion.pending,
                    suma: scores.iter().sum(),
                    promedio_general: aspects::mean(&scores),
                    desviacion_general: aspects::population_stddev(&scores),
                    total_evaluaciones_registradas: subject.records().len(),
                    total_estudiantes_registrados: subject.registered_students().len(),
                    total_aspectos: distinct_links(&subject),
                    porcentaje_cumplimiento: completion.percentage(),
                }
            })
            .collect();

        Ok(SubjectMetricsView {
            docente: scope.docente,
            materias,
        })
    }

    pub async fn subject_completion(
        &self,
        params: &MetricsParams,
    ) -> Result<SubjectCompletionView, MetricsError> {
        let configuration = params.configuration()?;
        let docente = params.docente()?;
        let subject = params.subject()?;

        let query = UniverseQuery::new(params.dimensions())
            .for_docente(docente.clone())
            .for_subject(subject.clone());
        let universe = universe::resolve(self.universe.as_ref(), &query).await?;
        let scope = RecordScope::configuration(configuration)
            .for_docente(docente.clone())
            .for_subject(subject.clone());
        let responses = responses::fetch(self.store.as_ref(), &scope).await?;

        let partition = completion::subject_roster(&universe, &responses);
        Ok(SubjectCompletionView {
            docente_nombre: universe.docente_name(),
            docente,
            codigo_materia: params
                .requested_subject()
                .unwrap_or_else(|| subject.to_string()),
            completados: partition.completed.into_iter().map(StudentView::from).collect(),
            pendientes: partition.pending.into_iter().map(StudentView::from).collect(),
        })
    }

    pub async fn subject_aspects(
        &self,
        params: &MetricsParams,
    ) -> Result<AspectMetricsView, MetricsError> {
        let configuration = params.configuration()?;
        let docente = params.docente()?;
        let subject = params.subject()?;

        let scope = RecordScope::configuration(configuration)
            .for_docente(docente.clone())
            .for_subject(subject);
        self.aspect_view(configuration, docente, params.requested_subject(), &scope)
            .await
    }

    /// Docente stats plus response comments and the stored summarizer output, optionally
    /// narrowed to one subject. Stats always cover the whole docente.
    pub async fn docente_comments(
        &self,
        params: &MetricsParams,
    ) -> Result<DocenteCommentsView, MetricsError> {
        let configuration = params.configuration()?;
        let docente = params.docente()?;
        let subject = params.optional_subject();

        let scope = self
            .load_docente(configuration, params.dimensions(), docente)
            .await?;
        let stats = stats_view(&scope);
        let responses = match &subject {
            Some(code) => scope
                .responses
                .restricted(|record| record.subject.as_ref() == Some(code)),
            None => scope.responses.clone(),
        };

        let ids: Vec<EvaluationId> = responses.records().iter().map(|record| record.id).collect();
        let analyses = if ids.is_empty() {
            Vec::new()
        } else {
            self.store.comment_analyses(&ids).await?
        };

        let breakdown = AspectBreakdown::aggregate(responses.details(), &scope.table);
        let names = aspects::aspect_names(self.store.as_ref(), &breakdown.aspect_ids()).await?;
        let conclusions = conclusions_by_aspect(&analyses);
        let totals = AspectTotals::of(&breakdown);

        let aspectos = breakdown
            .tallies()
            .iter()
            .map(|tally| CommentedAspect {
                metric: AspectMetric::from_tally(tally, names.get(&tally.aspect).cloned()),
                cmt: tally.comments.clone(),
                conclusion: conclusions.get(&tally.aspect).cloned(),
            })
            .collect();

        Ok(DocenteCommentsView {
            stats,
            docente_nombre: scope.universe.docente_name(),
            codigo_materia: params.requested_subject(),
            cmt_gen: responses
                .records()
                .iter()
                .filter_map(|record| record.general_comment.as_deref())
                .map(str::trim)
                .find(|comment| !comment.is_empty())
                .map(str::to_string),
            fortalezas: merged_list(analyses.iter().map(|analysis| &analysis.strengths)),
            debilidades: merged_list(analyses.iter().map(|analysis| &analysis.weaknesses)),
            conclusion_gen: analyses
                .iter()
                .filter_map(|analysis| analysis.general_conclusion.as_deref())
                .find(|conclusion| !conclusion.is_empty())
                .map(str::to_string),
            suma_total: totals.suma_total,
            total_respuestas: totals.total_respuestas,
            promedio: totals.promedio,
            desviacion: totals.desviacion,
            aspectos,
        })
    }

    /// Cascading distinct values of each universe dimension. No configuration is required.
    pub async fn filter_options(
        &self,
        params: &MetricsParams,
    ) -> Result<FilterOptionsView, MetricsError> {
        let dimensions = params.dimensions();
        let mut options = FilterOptionsView::default();

        for dimension in FilterDimension::ordered() {
            let values = self
                .universe
                .distinct_values(dimension, &dimensions.cascade_for(dimension))
                .await?;
            match dimension {
                FilterDimension::Site => options.sedes = values,
                FilterDimension::Period => options.periodos = values,
                FilterDimension::Program => options.programas = values,
                FilterDimension::Semester => options.semestres = values,
                FilterDimension::Group => options.grupos = values,
            }
        }

        Ok(options)
    }

    async fn load_docente(
        &self,
        configuration: ConfigId,
        dimensions: DimensionFilter,
        docente: DocenteId,
    ) -> Result<DocenteScope, StoreError> {
        let query = UniverseQuery::new(dimensions).for_docente(docente.clone());
        let universe = universe::resolve(self.universe.as_ref(), &query).await?;
        let scope = RecordScope::configuration(configuration).for_docente(docente.clone());
        let responses = responses::fetch(self.store.as_ref(), &scope).await?;
        let table = ScoreTable::resolve(self.store.as_ref(), configuration, responses.details())
            .await?;

        Ok(DocenteScope {
            docente,
            universe,
            responses,
            table,
        })
    }

    async fn aspect_view(
        &self,
        configuration: ConfigId,
        docente: DocenteId,
        requested_subject: Option<String>,
        scope: &RecordScope,
    ) -> Result<AspectMetricsView, MetricsError> {
        let responses = responses::fetch(self.store.as_ref(), scope).await?;
        let table =
            ScoreTable::resolve(self.store.as_ref(), configuration, responses.details()).await?;
        let breakdown = AspectBreakdown::aggregate(responses.details(), &table);
        let names = aspects::aspect_names(self.store.as_ref(), &breakdown.aspect_ids()).await?;
        let totals = AspectTotals::of(&breakdown);

        Ok(AspectMetricsView {
            docente,
            codigo_materia: requested_subject,
            suma_total: totals.suma_total,
            total_respuestas: totals.total_respuestas,
            promedio: totals.promedio,
            desviacion: totals.desviacion,
            aspectos: breakdown
                .tallies()
                .iter()
                .map(|tally| AspectMetric::from_tally(tally, names.get(&tally.aspect).cloned()))
                .collect(),
        })
    }
}

fn stats_view(scope: &DocenteScope) -> DocenteStatsView {
    let breakdown = AspectBreakdown::aggregate(scope.responses.details(), &scope.table);
    let completion = completion::GlobalCompletion::new(
        scope.universe.slots().len(),
        scope.responses.realized_count(),
    );

    DocenteStatsView {
        docente: scope.docente.clone(),
        promedio_general: breakdown.global_mean(),
        desviacion_general: breakdown.global_stddev(),
        total_evaluaciones: completion.expected,
        total_realizadas: completion.realized,
        total_pendientes: completion.pending,
        total_evaluaciones_registradas: scope.responses.records().len(),
        total_estudiantes_registrados: scope.responses.registered_students().len(),
        total_aspectos: distinct_links(&scope.responses),
        porcentaje_cumplimiento: completion.percentage(),
        suma: breakdown.total_sum(),
    }
}

fn distinct_links(responses: &ResponseSet) -> usize {
    responses
        .details()
        .iter()
        .map(|detail| detail.link)
        .collect::<BTreeSet<_>>()
        .len()
}

/// First non-empty conclusion stored for each aspect.
fn conclusions_by_aspect(analyses: &[CommentAnalysis]) -> HashMap<AspectId, String> {
    let mut conclusions = HashMap::new();
    for analysis in analyses {
        let (Some(aspect), Some(conclusion)) = (analysis.aspect, analysis.conclusion.as_deref())
        else {
            continue;
        };
        if !conclusion.is_empty() {
            conclusions
                .entry(aspect)
                .or_insert_with(|| conclusion.to_string());
        }
    }
    conclusions
}

/// Union of the JSON string arrays stored by the summarizer, first occurrence wins.
fn merged_list<'a>(raw: impl Iterator<Item = &'a Option<String>>) -> Option<Vec<String>> {
    let mut merged: Vec<String> = Vec::new();
    for text in raw.flatten() {
        let items = match serde_json::from_str::<Vec<serde_json::Value>>(text) {
            Ok(items) => items,
            Err(err) => {
                warn!(error = %err, "ignoring unparsable summarizer list");
                continue;
            }
        };
        for item in items {
            if let serde_json::Value::String(value) = item {
                if !value.is_empty() && !merged.contains(&value) {
                    merged.push(value);
                }
            }
        }
    }

    if merged.is_empty() {
        None
    } else {
        Some(merged)
    }
}
