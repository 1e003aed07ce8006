use serde::Serialize;

use super::aspects::{AspectBreakdown, AspectTally};
use super::domain::{AspectId, DocenteId, StudentId, SubjectCode};
use super::ranking::RankedDocente;
use super::universe::RosterEntry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub generales: GeneralTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneralTotals {
    pub total_evaluaciones: usize,
    pub total_evaluaciones_registradas: usize,
    pub total_realizadas: usize,
    pub total_pendientes: usize,
    pub total_estudiantes: usize,
    pub total_estudiantes_registrados: usize,
    pub total_estudiantes_pendientes: usize,
    pub total_docentes: usize,
    pub total_docentes_pendientes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocenteStatsView {
    pub docente: DocenteId,
    pub promedio_general: Option<f64>,
    pub desviacion_general: Option<f64>,
    pub total_evaluaciones: usize,
    pub total_realizadas: usize,
    pub total_pendientes: usize,
    pub total_evaluaciones_registradas: usize,
    pub total_estudiantes_registrados: usize,
    pub total_aspectos: usize,
    pub porcentaje_cumplimiento: f64,
    pub suma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingView {
    pub ranking: Vec<RankingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub docente: DocenteId,
    pub avg: f64,
    pub adjusted: f64,
    pub realizados: usize,
    pub universo: usize,
}

impl From<RankedDocente> for RankingEntry {
    fn from(ranked: RankedDocente) -> Self {
        Self {
            docente: ranked.docente,
            avg: ranked.avg,
            adjusted: ranked.adjusted,
            realizados: ranked.realized,
            universo: ranked.universe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentView {
    pub id: StudentId,
    pub nombre: Option<String>,
}

impl From<RosterEntry> for StudentView {
    fn from(entry: RosterEntry) -> Self {
        Self {
            id: entry.student,
            nombre: entry.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocenteCompletionView {
    pub docente: DocenteId,
    pub docente_nombre: Option<String>,
    pub completados: Vec<StudentView>,
    pub pendientes: Vec<StudentView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectCompletionView {
    pub docente: DocenteId,
    pub docente_nombre: Option<String>,
    /// Subject code as requested.
    pub codigo_materia: String,
    pub completados: Vec<StudentView>,
    pub pendientes: Vec<StudentView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AspectMetricsView {
    pub docente: DocenteId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo_materia: Option<String>,
    pub suma_total: f64,
    pub total_respuestas: usize,
    pub promedio: Option<f64>,
    pub desviacion: Option<f64>,
    pub aspectos: Vec<AspectMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AspectMetric {
    pub aspecto_id: AspectId,
    pub nombre: Option<String>,
    pub total_respuestas: usize,
    pub suma: f64,
    pub promedio: Option<f64>,
    pub desviacion: Option<f64>,
}

impl AspectMetric {
    pub fn from_tally(tally: &AspectTally, name: Option<String>) -> Self {
        Self {
            aspecto_id: tally.aspect,
            nombre: name,
            total_respuestas: tally.responses,
            suma: tally.sum,
            promedio: tally.mean(),
            desviacion: tally.stddev(),
        }
    }
}

/// Aggregate fields shared by the aspect and comment views.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AspectTotals {
    pub suma_total: f64,
    pub total_respuestas: usize,
    pub promedio: Option<f64>,
    pub desviacion: Option<f64>,
}

impl AspectTotals {
    pub fn of(breakdown: &AspectBreakdown) -> Self {
        Self {
            suma_total: breakdown.total_sum(),
            total_respuestas: breakdown.total_responses(),
            promedio: breakdown.global_mean(),
            desviacion: breakdown.global_stddev(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectMetricsView {
    pub docente: DocenteId,
    pub materias: Vec<SubjectMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectMetric {
    pub codigo_materia: Option<SubjectCode>,
    pub nombre_materia: Option<String>,
    pub total_evaluaciones: usize,
    pub total_realizadas: usize,
    pub total_pendientes: usize,
    pub suma: f64,
    pub promedio_general: Option<f64>,
    pub desviacion_general: Option<f64>,
    pub total_evaluaciones_registradas: usize,
    pub total_estudiantes_registrados: usize,
    pub total_aspectos: usize,
    pub porcentaje_cumplimiento: f64,
}

/// Docente metrics enriched with comments and the stored summarizer output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocenteCommentsView {
    #[serde(flatten)]
    pub stats: DocenteStatsView,
    pub docente_nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo_materia: Option<String>,
    pub cmt_gen: Option<String>,
    pub fortalezas: Option<Vec<String>>,
    pub debilidades: Option<Vec<String>>,
    pub conclusion_gen: Option<String>,
    pub suma_total: f64,
    pub total_respuestas: usize,
    pub promedio: Option<f64>,
    pub desviacion: Option<f64>,
    pub aspectos: Vec<CommentedAspect>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentedAspect {
    #[serde(flatten)]
    pub metric: AspectMetric,
    pub cmt: Vec<String>,
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptionsView {
    pub sedes: Vec<String>,
    pub periodos: Vec<String>,
    pub programas: Vec<String>,
    pub semestres: Vec<String>,
    pub grupos: Vec<String>,
}
