use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use knit_sync::{
    ContentsClient, Credential, Library, RemoteLocation, SyncError, SyncSettings, VersionTag,
};

#[derive(Parser)]
#[command(name = "knit-sync")]
#[command(about = "Sync your knitting patterns and projects with a GitHub repository", version)]
#[command(after_help = "Settings come from --config <FILE> (TOML) or from the environment:
   KNIT_SYNC_OWNER, KNIT_SYNC_REPO, KNIT_SYNC_BRANCH, KNIT_SYNC_PATH,
   KNIT_SYNC_TOKEN, KNIT_SYNC_API_BASE, KNIT_SYNC_COMMIT_MESSAGE
A .env file in the working directory is read first.")]
struct Cli {
    /// Settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the library document
    Pull {
        /// Write the document here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Upload a JSON document, replacing the remote one
    Push {
        file: PathBuf,

        /// sha of the remote content this document was based on
        #[arg(long)]
        sha: Option<String>,
    },

    /// List active projects and their progress
    Projects,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => SyncSettings::load(path)?,
        None => SyncSettings::from_env()?,
    };
    let client = settings.client()?;
    let location = settings.location();
    let credential = settings.credential();

    let outcome = match cli.command {
        Commands::Pull { out } => pull(&client, &location, credential.as_ref(), out).await,
        Commands::Push { file, sha } => {
            push(&client, &location, credential.as_ref(), file, sha).await
        }
        Commands::Projects => projects(&client, &location, credential.as_ref()).await,
    };

    // Remote failures are reported once, verbatim; everything else goes
    // through anyhow's own error output.
    if let Err(err) = outcome {
        match RemoteFailure::from_error(&err) {
            Some(failure) => {
                failure.print();
                std::process::exit(1);
            }
            None => return Err(err),
        }
    }
    Ok(())
}

async fn pull(
    client: &ContentsClient,
    location: &RemoteLocation,
    credential: Option<&Credential>,
    out: Option<PathBuf>,
) -> Result<()> {
    let remote = client.fetch(location, credential).await?;
    let pretty = serde_json::to_string_pretty(&remote.document)?;

    match out {
        Some(path) => {
            tokio::fs::write(&path, pretty)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Pulled {} into {}",
                "✓".green(),
                location.to_string().bright_white(),
                path.display()
            );
        }
        None => println!("{}", pretty),
    }

    if let Some(sha) = remote.sha {
        eprintln!("  sha: {}", sha.to_string().bright_yellow());
    }
    Ok(())
}

async fn push(
    client: &ContentsClient,
    location: &RemoteLocation,
    credential: Option<&Credential>,
    file: PathBuf,
    sha: Option<String>,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let document: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;

    let known = sha.map(VersionTag::from);
    let new_sha = client.save(location, credential, &document, known.as_ref()).await?;

    eprintln!(
        "{} Pushed {} to {}",
        "✓".green(),
        file.display(),
        location.to_string().bright_white()
    );
    println!("{}", new_sha);
    Ok(())
}

async fn projects(
    client: &ContentsClient,
    location: &RemoteLocation,
    credential: Option<&Credential>,
) -> Result<()> {
    let (library, _) = client.fetch_as::<Library>(location, credential).await?;

    println!("{}", "Active Projects".cyan().bold());
    println!("{}", "═".repeat(60).bright_black());

    if library.active_projects.is_empty() {
        println!("{}", "(none)".bright_black());
    }

    for project in &library.active_projects {
        let pattern = project
            .pattern_id
            .as_deref()
            .and_then(|id| library.pattern(id))
            .map(|p| p.name.as_str())
            .unwrap_or("-");
        let pct = format!("{:>3}%", project.progress_percent());
        let pct = if project.is_finished() { pct.green() } else { pct.yellow() };

        println!(
            "{} {} {} {}",
            pct.bold(),
            project.name.bright_white(),
            format!("row {}/{}", project.current_row, project.total_rows).bright_black(),
            format!("({})", pattern).bright_black()
        );
    }

    Ok(())
}

/// A remote rejection: status and body exactly as received
#[derive(Debug, PartialEq)]
struct RemoteFailure {
    status: String,
    body: String,
    conflict: bool,
}

impl RemoteFailure {
    fn from_error(err: &anyhow::Error) -> Option<Self> {
        let sync = err.downcast_ref::<SyncError>()?;
        let status = sync.status()?;
        let body = sync.body()?;
        Some(Self {
            status: status.to_string(),
            body: body.to_string(),
            conflict: sync.is_conflict(),
        })
    }

    fn print(&self) {
        eprintln!("{} {}", "✗".red(), self.status.red().bold());
        eprintln!("{}", self.body);
        if self.conflict {
            eprintln!("{}", "The remote document changed; pull and try again.".yellow());
        }
    }
}
