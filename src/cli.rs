use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Schedulify - turn an extracted class schedule into recurring calendar events
#[derive(Debug, Parser)]
#[command(name = "schedulify")]
#[command(about = "Turn extracted class schedules into .ics files and calendar links", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the drafts come from and which term and timezone they belong to.
#[derive(Debug, Clone, Args)]
pub struct ScheduleArgs {
    /// Extraction JSON file (a list of classes or a full extraction response)
    #[arg(required = true)]
    pub input: PathBuf,

    /// First day of the term (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day of the term (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// IANA timezone, e.g. America/Los_Angeles
    #[arg(long, alias = "tz")]
    pub timezone: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a calendar file with one weekly event per class
    #[command(alias = "export")]
    Ics {
        #[command(flatten)]
        schedule: ScheduleArgs,

        /// Output path
        #[arg(short, long, default_value = "schedule.ics")]
        output: PathBuf,

        /// Calendar name shown by calendar apps
        #[arg(long)]
        calendar_name: Option<String>,
    },

    /// Print an "add to Google Calendar" link per class
    Links {
        #[command(flatten)]
        schedule: ScheduleArgs,
    },

    /// Print the first occurrence of every class as JSON
    Materialize {
        #[command(flatten)]
        schedule: ScheduleArgs,
    },

    /// Review and correct drafts interactively
    Edit {
        /// Extraction JSON file to start from
        input: Option<PathBuf>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(long, alias = "tz")]
        timezone: Option<String>,
    },

    /// Run the HTTP API
    Serve {
        /// Bind address, overrides the config file
        #[arg(long)]
        addr: Option<String>,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigActions,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigActions {
    /// Show the current configuration
    Show,

    /// Set the default timezone
    SetTimezone {
        #[arg(required = true)]
        timezone: String,
    },

    /// Set the calendar name written into exported files
    SetCalendarName {
        #[arg(required = true)]
        name: String,
    },
}
