mod args;

use agenda_core::{ClientConfig, Credentials, CurrentUser, Registration, Session};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Command, EventCommand, TaskCommand};

const SESSION_COOKIE: &str = "sessionid";

fn init_tracing(verbose: bool) {
    let default = if verbose { "agenda_core=debug,agenda=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = ClientConfig::resolve(cli.config.as_deref()).context("loading config")?;
    if let Some(url) = cli.api_url {
        config.base_url = url;
    }
    tracing::debug!(base_url = %config.base_url, "resolved configuration");

    let session = Session::connect(&config)
        .with_context(|| format!("connecting to {}", config.base_url))?;
    if let Some(id) = cli.session.as_deref() {
        session.transport().seed_cookie(&format!("{SESSION_COOKIE}={id}; Path=/"));
    }

    match cli.command {
        Command::Register {
            username,
            password,
            email,
            first_name,
            last_name,
        } => {
            let input = Registration {
                username,
                password,
                email,
                first_name,
                last_name,
            };
            print(&session.register(&input).await?)?;
        }
        Command::Login { username, password } => {
            let user = session.login(&Credentials { username, password }).await?;
            let id = session.transport().cookie(SESSION_COOKIE);
            print(&json!({ "user": user, "session": id }))?;
            if let Some(id) = id {
                eprintln!("export AGENDA_SESSION={id}");
            }
        }
        Command::Logout => print(&session.logout().await?)?,
        Command::Whoami => match session.current_user().await? {
            CurrentUser::Authenticated(user) => print(&user)?,
            CurrentUser::Anonymous(detail) => anyhow::bail!(detail.detail),
        },
        Command::Events(cmd) => match cmd {
            EventCommand::List => print(&session.events().await?)?,
            EventCommand::Add(fields) => print(&session.create_event(&fields.into()).await?)?,
            EventCommand::Update { id, fields } => {
                print(&session.update_event(id, &fields.into()).await?)?
            }
            EventCommand::Delete { id } => print(&session.delete_event(id).await?)?,
        },
        Command::Tasks(cmd) => match cmd {
            TaskCommand::List => print(&session.tasks().await?)?,
            TaskCommand::Add(fields) => print(&session.create_task(&fields.into()).await?)?,
            TaskCommand::Update { id, fields } => {
                print(&session.update_task(id, &fields.into()).await?)?
            }
            TaskCommand::Delete { id } => print(&session.delete_task(id).await?)?,
        },
        Command::Chat { query } => {
            let outcome = session.create_event_from_chat(&query.join(" ")).await?;
            print(&outcome)?;
            if !outcome.success {
                anyhow::bail!(outcome.error.unwrap_or_else(|| "no event created".to_string()));
            }
        }
    }

    Ok(())
}
