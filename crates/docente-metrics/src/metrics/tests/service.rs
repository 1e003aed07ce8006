use super::common::*;
use crate::metrics::domain::{AspectId, DocenteId};
use crate::metrics::params::ParameterError;
use crate::metrics::service::MetricsError;

#[tokio::test]
async fn docente_stats_combine_completion_and_scores() {
    let fixture = campaign();
    let stats = fixture
        .service
        .docente_stats(&cfg("1").with_docente("D1"))
        .await
        .expect("stats");

    assert_eq!(stats.docente, DocenteId("D1".to_string()));
    assert_eq!(stats.total_evaluaciones, 2);
    assert_eq!(stats.total_realizadas, 2);
    assert_eq!(stats.total_pendientes, 0);
    assert_eq!(stats.total_evaluaciones_registradas, 2);
    assert_eq!(stats.total_estudiantes_registrados, 2);
    assert_eq!(stats.total_aspectos, 3);
    assert_close(stats.porcentaje_cumplimiento, 100.0);
    assert_close(stats.suma, 13.0);
    assert_close_opt(stats.promedio_general, 6.5);
    assert_close_opt(stats.desviacion_general, 7.25_f64.sqrt());
}

#[tokio::test]
async fn docente_stats_respect_dimension_filters() {
    let fixture = campaign();
    let mut params = cfg("1").with_docente("D2");
    params.periodo = Some("2025-1".to_string());

    let stats = fixture.service.docente_stats(&params).await.expect("stats");
    assert_eq!(stats.total_evaluaciones, 2);
    assert_eq!(stats.total_realizadas, 1);
    assert_eq!(stats.total_pendientes, 1);
    assert_close(stats.porcentaje_cumplimiento, 50.0);
}

#[tokio::test]
async fn unknown_docente_gets_an_empty_shape() {
    let fixture = campaign();
    let stats = fixture
        .service
        .docente_stats(&cfg("1").with_docente("D404"))
        .await
        .expect("stats");

    assert_eq!(stats.total_evaluaciones, 0);
    assert_eq!(stats.total_realizadas, 0);
    assert_close(stats.porcentaje_cumplimiento, 0.0);
    assert_eq!(stats.promedio_general, None);
    assert_eq!(stats.desviacion_general, None);
}

#[tokio::test]
async fn docente_scoped_operations_require_a_docente() {
    let fixture = campaign();
    let err = fixture
        .service
        .docente_stats(&cfg("1"))
        .await
        .expect_err("docente is required");
    assert!(matches!(
        err,
        MetricsError::Parameter(ParameterError::MissingDocente)
    ));

    let err = fixture
        .service
        .docente_comments(&cfg("1").with_docente("  "))
        .await
        .expect_err("docente is required");
    assert!(matches!(
        err,
        MetricsError::Parameter(ParameterError::MissingDocente)
    ));
    assert_eq!(fixture.query_counts(), (0, 0));
}

#[tokio::test]
async fn comments_merge_summarizer_output() {
    let fixture = campaign();
    let view = fixture
        .service
        .docente_comments(&cfg("1").with_docente("D1"))
        .await
        .expect("comments");

    assert_eq!(view.stats.total_realizadas, 2);
    assert_eq!(view.docente_nombre.as_deref(), Some("Luis Perez"));
    assert_eq!(view.codigo_materia, None);
    assert_eq!(view.cmt_gen.as_deref(), Some("Excelente docente"));
    assert_eq!(
        view.fortalezas,
        Some(vec!["claridad".to_string(), "dominio".to_string()])
    );
    assert_eq!(view.debilidades, Some(vec!["puntualidad".to_string()]));
    assert_eq!(view.conclusion_gen.as_deref(), Some("Buen desempeno"));
    assert_eq!(view.total_respuestas, 4);
    assert_close(view.suma_total, 13.0);

    let mastery = &view.aspectos[0];
    assert_eq!(mastery.metric.aspecto_id, AspectId(1));
    assert_eq!(mastery.conclusion.as_deref(), Some("Explica con claridad"));
    assert!(mastery.cmt.is_empty());

    // a whitespace-only comment is dropped
    let punctuality = &view.aspectos[1];
    assert!(punctuality.cmt.is_empty());
    assert_eq!(punctuality.conclusion, None);

    let open = &view.aspectos[2];
    assert_eq!(open.cmt, vec!["Muy claro".to_string()]);
}

#[tokio::test]
async fn comments_keep_empty_strings_and_narrow_to_a_subject() {
    let fixture = campaign();
    let view = fixture
        .service
        .docente_comments(&cfg("1").with_docente("D2").with_subject("202"))
        .await
        .expect("comments");

    // stats stay docente-wide
    assert_eq!(view.stats.total_evaluaciones, 3);
    assert_eq!(view.stats.total_evaluaciones_registradas, 3);
    assert_eq!(view.codigo_materia.as_deref(), Some("202"));
    assert_eq!(view.total_respuestas, 1);
    assert_eq!(view.aspectos[0].cmt, vec![String::new()]);
    assert_eq!(view.fortalezas, None);
    assert_eq!(view.debilidades, None);
    assert_eq!(view.cmt_gen, None);

    let json = serde_json::to_value(&view).expect("serializes");
    assert_eq!(json["docente"], "D2");
    assert_eq!(json["total_evaluaciones"], 3);
    assert_eq!(json["aspectos"][0]["cmt"][0], "");
    assert_eq!(json["aspectos"][0]["nombre"], "Dominio del tema");
}

#[tokio::test]
async fn filter_options_cascade_from_site() {
    let fixture = campaign();
    let options = fixture
        .service
        .filter_options(&Default::default())
        .await
        .expect("filters");

    assert_eq!(options.sedes, vec!["Norte", "Sur"]);
    assert_eq!(options.periodos, vec!["2025-1", "2024-2"]);
    assert_eq!(options.programas, vec!["Ingenieria"]);
    assert_eq!(options.semestres, vec!["1", "2"]);
    assert_eq!(options.grupos, vec!["A", "B"]);

    let mut params = cfg("1");
    params.sede = Some("Sur".to_string());
    params.semestre = Some("2".to_string());
    let options = fixture
        .service
        .filter_options(&params)
        .await
        .expect("filters");
    assert_eq!(options.sedes, vec!["Norte", "Sur"]);
    assert_eq!(options.periodos, vec!["2024-2"]);
    assert!(options.grupos.is_empty());
}

#[tokio::test]
async fn repeated_calls_return_identical_views() {
    let fixture = campaign();
    let params = cfg("1").with_docente("D1");

    let first = fixture.service.docente_comments(&params).await.expect("comments");
    let second = fixture.service.docente_comments(&params).await.expect("comments");
    assert_eq!(first, second);

    let summary = fixture.service.summary(&cfg("1")).await.expect("summary");
    let again = fixture.service.summary(&cfg("1")).await.expect("summary");
    assert_eq!(summary, again);
}
