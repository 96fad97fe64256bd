use clap::{Args, ValueEnum};
use juprecruit::config::{AppConfig, ConfigError};
use juprecruit::error::AppError;
use juprecruit::integrations::SupabaseClient;
use juprecruit::recruitment::{
    JobApplication, RecruitRepository, ServiceError, TalentRecruit, JOB_HEADERS, TALENT_HEADERS,
};
use std::io::Write;
use std::path::PathBuf;

const CREATED_AT_HEADER: &str = "Created At";
/// The table keeps the profile's `discord` handle, not the ledger's Discord username cell.
const LEDGER_DISCORD_HEADER: &str = "Discord Username";
const STORED_DISCORD_HEADER: &str = "Discord";
/// Job ledger columns that are also stored in the table; the sign-in flags are ledger-only.
const STORED_JOB_COLUMNS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ExportKind {
    Talent,
    Jobs,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Which table to export
    #[arg(long, value_enum)]
    pub(crate) kind: ExportKind,
    /// Destination file (defaults to stdout)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let supabase = config
        .supabase
        .as_ref()
        .ok_or(ConfigError::Missing("SUPABASE_URL/SUPABASE_SERVICE_KEY"))?;
    let client = SupabaseClient::new(supabase)?;

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };

    let rows = write_export(&client, args.kind, writer).await?;
    if let Some(path) = &args.output {
        eprintln!("Exported {rows} rows to {}", path.display());
    }
    Ok(())
}

/// Write every stored record of `kind` as CSV and return the number of data rows.
pub(crate) async fn write_export<W: Write>(
    repository: &dyn RecruitRepository,
    kind: ExportKind,
    writer: W,
) -> Result<usize, AppError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let rows: Vec<Vec<String>> = match kind {
        ExportKind::Talent => {
            let mut header: Vec<&str> = TALENT_HEADERS
                .iter()
                .map(|column| match *column {
                    LEDGER_DISCORD_HEADER => STORED_DISCORD_HEADER,
                    other => other,
                })
                .collect();
            header.push(CREATED_AT_HEADER);
            csv_writer.write_record(&header).map_err(std::io::Error::from)?;

            repository
                .list_talent()
                .await
                .map_err(ServiceError::from)?
                .iter()
                .map(talent_row)
                .collect()
        }
        ExportKind::Jobs => {
            let mut header: Vec<&str> = JOB_HEADERS[..STORED_JOB_COLUMNS].to_vec();
            header.push(CREATED_AT_HEADER);
            csv_writer.write_record(&header).map_err(std::io::Error::from)?;

            repository
                .list_applications()
                .await
                .map_err(ServiceError::from)?
                .iter()
                .map(job_row)
                .collect()
        }
    };

    for row in &rows {
        csv_writer.write_record(row).map_err(std::io::Error::from)?;
    }
    csv_writer.flush()?;
    Ok(rows.len())
}

fn talent_row(recruit: &TalentRecruit) -> Vec<String> {
    vec![
        recruit.name.clone(),
        recruit.expertise.join(", "),
        recruit.experience.clone(),
        recruit.interests.join(", "),
        recruit.talents.clone(),
        recruit.languages.join(", "),
        recruit.timezone.clone(),
        recruit.description.clone(),
        recruit.email.clone(),
        recruit.twitter.clone(),
        recruit.linkedin.clone(),
        recruit.discord.clone(),
        recruit.previous_work_links.join(", "),
        recruit.created_at.to_rfc3339(),
    ]
}

fn job_row(application: &JobApplication) -> Vec<String> {
    vec![
        application.name.clone(),
        application.contact.clone(),
        application.message.clone(),
        application.workgroup.clone(),
        application.position.clone(),
        application.username.clone(),
        application.created_at.to_rfc3339(),
    ]
}
