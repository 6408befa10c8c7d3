use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use session_core::{IdentityStore, Latency, SessionController, SessionError, StorageTokenSlot};
use shared::{
    domain::{Credentials, ProfilePatch, Registration, TrainingGoal, UserProfile},
    error::ApiError,
};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
#[command(name = "fitlog", about = "Sign in and manage the fitness tracker profile")]
struct Args {
    /// Where the session token is kept between runs.
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Skip the simulated backend delay.
    #[arg(long, global = true)]
    no_delay: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
    },
    Logout,
    Whoami,
    UpdateProfile {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        weight: Option<String>,
        #[arg(long)]
        height: Option<String>,
        #[arg(long)]
        goal: Option<TrainingGoal>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings();
    let database_url =
        normalize_database_url(args.database_url.as_deref().unwrap_or(&settings.database_url));
    let latency = if args.no_delay {
        Latency::none()
    } else {
        settings.latency()
    };
    let store = if settings.seed_demo_user {
        IdentityStore::with_demo_user(latency)
    } else {
        IdentityStore::new(latency)
    };
    let slot = StorageTokenSlot::open(&database_url).await?;
    let session = SessionController::initialize(Arc::new(store), Arc::new(slot)).await;

    match args.command {
        Command::Login { email, password } => {
            report(session.login(&Credentials::new(email, password)).await)?;
        }
        Command::Register {
            email,
            password,
            name,
        } => {
            report(
                session
                    .register(&Registration::new(email, password, name))
                    .await,
            )?;
        }
        Command::Logout => {
            session.logout().await;
            if let Some(err) = session.snapshot().await.last_error {
                tracing::warn!(error = %err, "signed out locally");
            }
            println!("signed out");
        }
        Command::Whoami => match session.current_user().await {
            Some(user) => print_user(&user)?,
            None => println!("not signed in"),
        },
        Command::UpdateProfile {
            email,
            name,
            weight,
            height,
            goal,
        } => {
            let patch = ProfilePatch {
                email,
                name,
                weight,
                height,
                goal,
            };
            if patch.is_empty() {
                bail!("nothing to update; pass at least one profile field");
            }
            report(session.update_profile(&patch).await)?;
        }
    }

    Ok(())
}

fn report(outcome: Result<UserProfile, SessionError>) -> Result<()> {
    match outcome {
        Ok(user) => print_user(&user),
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&ApiError::from(&err))?);
            Err(err.into())
        }
    }
}

fn print_user(user: &UserProfile) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(user)?);
    Ok(())
}
