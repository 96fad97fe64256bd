use crate::export::{run_export, ExportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use juprecruit::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "juprecruit-api",
    about = "Serve the recruitment API or export stored submissions",
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
    /// Write talent recruits or job applications from the table store as CSV
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Export(args) => run_export(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportKind;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["juprecruit"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn export_accepts_kind_and_output() {
        let cli = Cli::try_parse_from([
            "juprecruit",
            "export",
            "--kind",
            "jobs",
            "--output",
            "jobs.csv",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Export(args)) => {
                assert_eq!(args.kind, ExportKind::Jobs);
                assert_eq!(
                    args.output.as_deref(),
                    Some(std::path::Path::new("jobs.csv"))
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
