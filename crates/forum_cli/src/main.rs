//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the configured forum database and make sure the status
//!   singleton exists.
//! - Print the site-wide counters in a stable `key=value` form.
//!
//! Usage: `forum_cli [config.json]`. Without a path the defaults apply,
//! which select an in-memory database.

use forum_core::{core_version, ForumConfig, SqliteDocumentStore, StatusService};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("forum_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => ForumConfig::load(path)?,
        None => ForumConfig::default(),
    };
    config.init_logging()?;

    let conn = config.open_database()?;
    let store = SqliteDocumentStore::try_new(&conn)?;
    let status = StatusService::new(&store).ensure_initialized()?;

    log::info!("event=cli_status module=cli status=ok");
    println!("forum_core version={}", core_version());
    println!("user_count={}", status.user_count);
    println!("topic_count={}", status.topic_count);
    println!("reply_count={}", status.reply_count);
    println!("user_index={}", status.user_index);
    Ok(())
}
