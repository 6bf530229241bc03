use anyhow::Context;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use quickremind::{build_notifier, spawn_background, ReminderService};
use quickremind_core::config::QuickRemindConfig;
use quickremind_core::{now_millis, NewReminder, Reminder, ReminderId};
use quickremind_store::{OnboardingState, SqlitePreferences};
use tracing::info;

/// QuickRemind - single-user reminders with exact-time notifications
#[derive(Parser)]
#[command(name = "quickremind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.quickremind/quickremind.toml)
    #[arg(long, global = true, env = "QUICKREMIND_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fire due alarms and follow the reminder list until Ctrl-C
    Run,

    /// Save a reminder and schedule its alarm
    Add {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        notes: String,

        /// Fire instant (RFC 3339)
        #[arg(long, conflicts_with = "in_secs")]
        at: Option<String>,

        /// Fire this many seconds from now
        #[arg(long)]
        in_secs: Option<i64>,
    },

    /// Print all reminders, soonest first
    List,

    /// Delete a reminder
    #[command(alias = "complete")]
    Delete { id: i64 },

    /// Show or finish the first-run walkthrough
    Onboarding {
        #[arg(long)]
        complete: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "quickremind=info,quickremind_store=info,quickremind_scheduler=info,quickremind_notify=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config / QUICKREMIND_CONFIG > ~/.quickremind/quickremind.toml
    let config = QuickRemindConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        QuickRemindConfig::default()
    });

    let prefs = SqlitePreferences::new(open_prefs_db(&config.database.path)?)?;
    let mut onboarding = OnboardingState::load(&prefs)?;

    let service = ReminderService::open(config)?;

    match cli.command {
        Commands::Run => {
            info!(start_screen = ?onboarding.start_screen(), "QuickRemind starting");
            run(service).await?;
        }
        Commands::Add {
            title,
            notes,
            at,
            in_secs,
        } => {
            let reminder_time = resolve_time(at.as_deref(), in_secs)?;
            let (reminder, outcome) = service
                .add_reminder(NewReminder::new(title, reminder_time).with_notes(notes))
                .await?;
            println!("{}  ({:?})", describe(&reminder), outcome);
        }
        Commands::List => {
            let reminders = service.list_reminders().await?;
            if reminders.is_empty() {
                println!("No reminders.");
            }
            for r in &reminders {
                println!("{}", describe(r));
            }
        }
        Commands::Delete { id } => {
            if service.delete_reminder(ReminderId(id)).await? {
                println!("Deleted reminder {id}.");
            } else {
                println!("No reminder {id}.");
            }
        }
        Commands::Onboarding { complete } => {
            if complete {
                onboarding.mark_complete(&prefs)?;
            }
            println!(
                "Onboarding complete: {} (start screen: {:?})",
                onboarding.is_complete(),
                onboarding.start_screen()
            );
        }
    }
    Ok(())
}

/// Drive alarms and the feed until Ctrl-C.
async fn run(service: ReminderService) -> anyhow::Result<()> {
    let notifier = build_notifier(&service.config);
    info!(backend = notifier.name(), "notifier ready");
    let background = spawn_background(&service, notifier);

    let mut feed = service.feed().subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            list = feed.changed() => match list {
                Some(list) => info!(count = list.len(), "reminder list updated"),
                None => break,
            },
            res = &mut ctrl_c => {
                res.context("listening for Ctrl-C")?;
                info!("shutdown requested");
                break;
            }
        }
    }

    drop(feed);
    background.shutdown().await;
    Ok(())
}

fn open_prefs_db(path: &str) -> anyhow::Result<rusqlite::Connection> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    Ok(rusqlite::Connection::open(path)?)
}

fn resolve_time(at: Option<&str>, in_secs: Option<i64>) -> anyhow::Result<i64> {
    match (at, in_secs) {
        (Some(at), _) => {
            let parsed = DateTime::parse_from_rfc3339(at)
                .with_context(|| format!("invalid --at timestamp: {at}"))?;
            Ok(parsed.timestamp_millis())
        }
        (None, Some(secs)) => secs
            .checked_mul(1_000)
            .and_then(|ms| now_millis().checked_add(ms))
            .with_context(|| format!("--in-secs {secs} is out of range")),
        (None, None) => Ok(now_millis()),
    }
}

fn describe(r: &Reminder) -> String {
    let when = r
        .fire_at()
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| r.reminder_time.to_string());
    if r.notes.is_empty() {
        format!("[{}] {}  {}", r.id, when, r.title)
    } else {
        format!("[{}] {}  {} - {}", r.id, when, r.title, r.notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
        let config = Cli::command()
            .get_arguments()
            .find(|a| a.get_id() == "config")
            .and_then(|a| a.get_env().map(|e| e.to_os_string()));
        assert_eq!(config.as_deref(), Some(std::ffi::OsStr::new("QUICKREMIND_CONFIG")));
    }

    #[test]
    fn complete_is_an_alias_for_delete() {
        let cli = Cli::try_parse_from(["quickremind", "--config", "/tmp/q.toml", "complete", "3"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("/tmp/q.toml"));
        assert!(matches!(cli.command, Commands::Delete { id: 3 }));
    }

    #[test]
    fn in_secs_is_relative_to_now() {
        let before = now_millis();
        let at = resolve_time(None, Some(60)).unwrap();
        assert!(at >= before + 60_000);
    }

    #[test]
    fn huge_in_secs_is_rejected() {
        assert!(resolve_time(None, Some(i64::MAX)).is_err());
        assert!(resolve_time(None, Some(i64::MAX / 1_000)).is_err());
    }

    #[test]
    fn at_takes_rfc3339() {
        let at = resolve_time(Some("1970-01-01T00:00:01Z"), None).unwrap();
        assert_eq!(at, 1_000);
        assert!(resolve_time(Some("tomorrow"), None).is_err());
    }
}
