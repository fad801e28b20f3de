mod capture;
mod config;

use anyhow::{Context, Result};
use capture::DirectoryCapture;
use clap::{Parser, Subcommand};
use config::AppConfig;
use faceroll_api::{FaceApiClient, GroupStatus};
use faceroll_core::{
    EnrollResult, EnrollmentRecord, EnrollmentSession, FaceService, PersonIdentity,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "faceroll", about = "Face enrollment against a remote face recognition service")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/faceroll/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a user from a directory of captured frames
    Enroll {
        /// Name stored with the new person
        #[arg(short, long)]
        user: String,
        /// Directory of frames, replayed in file-name order
        #[arg(short, long)]
        frames: PathBuf,
        /// Person id of an enrollment this one replaces
        #[arg(long)]
        existing: Option<String>,
        /// Restart from the first frame after the last one
        #[arg(long)]
        cycle: bool,
    },
    /// Check one frame against an enrolled person
    Verify {
        #[arg(short, long)]
        person: String,
        #[arg(short, long)]
        frame: PathBuf,
    },
    /// Delete an enrolled person
    Delete {
        #[arg(short, long)]
        person: String,
    },
    /// Start training the person group
    Train,
    /// Show the person group's training status
    TrainingStatus,
    /// Create the person group if it does not exist
    ValidateGroup,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let client = FaceApiClient::new(config.service.clone())?;
    let group = config.person_group_id.as_str();

    match cli.command {
        Commands::Enroll {
            user,
            frames,
            existing,
            cycle,
        } => return enroll(client, &config, user, &frames, existing, cycle).await,
        Commands::Verify { person, frame } => {
            let bytes = capture::read_frame(&frame)?;
            let outcome = client
                .verify(&PersonIdentity::new(group, person.as_str()), &bytes)
                .await?;
            print_json(&json!({
                "personId": person,
                "isIdentical": outcome.is_identical,
                "confidence": outcome.confidence,
            }))?;
            if !outcome.is_identical {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Delete { person } => {
            let deleted = client
                .delete_person(&PersonIdentity::new(group, person.as_str()))
                .await?;
            print_json(&json!({ "personId": person, "deleted": deleted }))?;
        }
        Commands::Train => {
            let triggered = client.train(group).await?;
            print_json(&json!({ "group": group, "triggered": triggered }))?;
            if !triggered {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::TrainingStatus => {
            let status = client.training_status(group).await?;
            print_json(&status)?;
        }
        Commands::ValidateGroup => {
            let status = client.validate_person_group(group).await?;
            print_json(&json!({ "group": group, "status": group_status(status) }))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Create a person, run a session against the frame directory, then
/// promote or drop the new person depending on the outcome.
async fn enroll(
    client: FaceApiClient,
    config: &AppConfig,
    user: String,
    frames: &Path,
    existing: Option<String>,
    cycle: bool,
) -> Result<ExitCode> {
    let status = client.validate_person_group(&config.person_group_id).await?;
    tracing::info!(group = %config.person_group_id, status = group_status(status), "person group ready");

    let mut capture = DirectoryCapture::open(frames, cycle)?;
    let client = Arc::new(client);

    let mut record = EnrollmentRecord::new(user, config.person_group_id.clone());
    if let Some(existing) = existing {
        record = record.with_existing(existing);
    }

    let person = match record.begin(client.as_ref()).await {
        Ok(person) => person,
        Err(e) => {
            tracing::error!(error = %e, "could not create person");
            return report(EnrollResult::Error, record.person_id());
        }
    };

    let session = EnrollmentSession::new(Arc::clone(&client), person, config.enroll.clone())
        .with_progress(|frames: u32| tracing::info!(frames, "enrollment progress"));

    let token = session.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling enrollment");
            token.cancel();
        }
    });
    let result = session.run(&mut capture).await?;
    interrupt.abort();

    if result.is_success() {
        if let Err(e) = record.commit(client.as_ref()).await {
            tracing::warn!(error = %e, "superseded person not removed");
            return report(result, record.pending_person_id());
        }
    } else if let Some(dropped) = record.abandon() {
        tracing::info!(person = %dropped, %result, "new person discarded");
    }

    report(result, record.person_id())
}

fn report(result: EnrollResult, person_id: Option<&str>) -> Result<ExitCode> {
    print_json(&json!({
        "result": result,
        "code": result.code(),
        "personId": person_id,
    }))?;
    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(result.code())
    })
}

fn group_status(status: GroupStatus) -> &'static str {
    match status {
        GroupStatus::Existing => "existing",
        GroupStatus::Created => "created",
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
