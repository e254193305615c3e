//! Schedulify turns class-schedule drafts (as produced by an extraction
//! service and corrected by the user) into recurring calendar events.

pub mod api_server;
pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod draft;
pub mod export;
pub mod extraction;
pub mod materialize;
pub mod occurrence;
pub mod term;
pub mod weekday;

use anyhow::Result;
use env_logger::Env;
use log::info;

/// Parse the command line, load config and dispatch.
pub async fn run(cli: cli::Cli) -> Result<()> {
    let config = Config::load()?;
    info!("Initializing Schedulify");
    app::Application::new(config).run(cli).await
}

/// `RUST_LOG`-driven logger, `info` by default.
pub fn init_logger() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use chrono::Local;
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}

// Re-export commonly used types
pub use clock::{parse_clock_time, ClockTime};
pub use config::Config;
pub use draft::{ClassMeetingDraft, DraftEditor, DraftField, EditorError, TermWindow};
pub use export::{ExportError, IcsBuilder};
pub use materialize::{materialize, materialize_all, MaterializeError, MaterializedOccurrence};
pub use occurrence::{first_occurrence_on_or_after, resolve_first_occurrence};
pub use weekday::{normalize_day_tokens, DayToken, WeekdayCode};
