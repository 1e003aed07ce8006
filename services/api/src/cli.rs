use std::path::PathBuf;

use crate::report::run_metrics;
use crate::server;
use clap::{Args, Parser, Subcommand};
use docente_metrics::error::AppError;
use docente_metrics::metrics::MetricsParams;

#[derive(Parser, Debug)]
#[command(
    name = "docente-metrics-api",
    about = "Serve or compute evaluation completion and ranking metrics for docentes",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute a metrics view once and print it as JSON
    Metrics {
        #[command(subcommand)]
        command: MetricsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum MetricsCommand {
    /// Global completion totals for a configuration
    Summary(QueryArgs),
    /// Docentes ordered by adjusted score
    Ranking(QueryArgs),
    /// Completion and score statistics of one docente
    Docente {
        /// Docente identifier
        id: String,
        #[command(flatten)]
        query: QueryArgs,
    },
}

impl MetricsCommand {
    pub(crate) fn query(&self) -> &QueryArgs {
        match self {
            MetricsCommand::Summary(query)
            | MetricsCommand::Ranking(query)
            | MetricsCommand::Docente { query, .. } => query,
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve from a snapshot directory instead of the configured databases
    #[arg(long, value_name = "DIR")]
    pub(crate) snapshot: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct QueryArgs {
    /// Evaluation configuration (campaign) id
    #[arg(long = "cfg-t", value_name = "N")]
    pub(crate) cfg_t: String,
    #[arg(long)]
    pub(crate) sede: Option<String>,
    #[arg(long)]
    pub(crate) periodo: Option<String>,
    #[arg(long)]
    pub(crate) programa: Option<String>,
    #[arg(long)]
    pub(crate) semestre: Option<String>,
    #[arg(long)]
    pub(crate) grupo: Option<String>,
    /// Read `enrollments.csv` and `evaluations.json` from this directory
    #[arg(long, value_name = "DIR")]
    pub(crate) snapshot: Option<PathBuf>,
}

impl QueryArgs {
    pub(crate) fn params(&self) -> MetricsParams {
        MetricsParams {
            sede: self.sede.clone(),
            periodo: self.periodo.clone(),
            programa: self.programa.clone(),
            semestre: self.semestre.clone(),
            grupo: self.grupo.clone(),
            ..MetricsParams::for_configuration(self.cfg_t.clone())
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Metrics { command } => run_metrics(command).await,
    }
}
