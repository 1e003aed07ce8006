use std::io::Write;

use crate::cli::MetricsCommand;
use crate::infra::{metrics_service, DynMetricsService};
use docente_metrics::config::AppConfig;
use docente_metrics::error::AppError;
use serde::Serialize;

/// Run one metrics query and print the resulting view to stdout.
pub(crate) async fn run_metrics(command: MetricsCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let query = command.query();
    let service = metrics_service(&config, query.snapshot.as_deref()).await?;

    let mut rendered = Vec::new();
    render_metrics(&service, &command, &mut rendered).await?;

    let mut out = std::io::stdout().lock();
    out.write_all(&rendered)?;
    out.flush()?;
    Ok(())
}

pub(crate) async fn render_metrics<W: Write>(
    service: &DynMetricsService,
    command: &MetricsCommand,
    out: &mut W,
) -> Result<(), AppError> {
    let params = command.query().params();
    match command {
        MetricsCommand::Summary(_) => write_json(out, &service.summary(&params).await?),
        MetricsCommand::Ranking(_) => write_json(out, &service.ranking(&params).await?),
        MetricsCommand::Docente { id, .. } => {
            let params = params.with_docente(id.clone());
            write_json(out, &service.docente_stats(&params).await?)
        }
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, view: &T) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *out, view).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}
