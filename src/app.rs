use crate::cli::{Cli, Commands, ConfigActions, ScheduleArgs};
use crate::config::{get_config_path, Config};
use crate::draft::{ClassMeetingDraft, DraftEditor, DraftField, TermWindow};
use crate::export::{calendar_links, export_calendar, resolve_timezone};
use crate::extraction::{parse_extraction_payload, NEEDS_DATES_NOTE};
use crate::materialize::{materialize, materialize_all};
use crate::occurrence::parse_date;
use crate::term::{infer_term_window, needs_dates, today_in};
use crate::weekday::format_day_tokens;
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Drafts read from an extraction file, with the timezone and window to use.
#[derive(Debug, Clone)]
pub struct LoadedSchedule {
    pub drafts: Vec<ClassMeetingDraft>,
    pub timezone: String,
    pub window: TermWindow,
}

/// Read an extraction payload and settle its timezone and term window.
///
/// Flags win over what the payload inferred. A window with only one end is
/// completed with the configured term length.
pub fn load_schedule(
    path: &Path,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    timezone: Option<&str>,
    config: &Config,
) -> Result<LoadedSchedule> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response = parse_extraction_payload(&text)
        .with_context(|| format!("Failed to parse extraction payload {}", path.display()))?;

    let timezone = config.resolve_timezone(timezone.or(response.timezone.as_deref()));
    let start = start.or(response.inferred_start);
    let end = end.or(response.inferred_end);
    let window = match (start, end) {
        (Some(_), None) | (None, Some(_)) => {
            infer_term_window(start, end, config.calendar.default_term_weeks, today_in(&timezone))
        }
        _ => TermWindow::new(start, end),
    };

    let drafts = response.into_drafts();
    log::info!("Loaded {} drafts from {} ({})", drafts.len(), path.display(), timezone);
    Ok(LoadedSchedule { drafts, timezone, window })
}

fn load_from_args(args: &ScheduleArgs, config: &Config) -> Result<LoadedSchedule> {
    load_schedule(&args.input, args.start, args.end, args.timezone.as_deref(), config)
}

/// What the REPL should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive review of a draft list. Every command re-reads the current
/// drafts, so edits show up in the next listing or export.
pub struct EditSession {
    editor: DraftEditor,
    timezone: String,
    window: TermWindow,
    calendar_name: String,
}

impl EditSession {
    pub fn new(schedule: LoadedSchedule, calendar_name: impl Into<String>) -> Self {
        Self {
            editor: DraftEditor::from_drafts(schedule.drafts),
            timezone: schedule.timezone,
            window: schedule.window,
            calendar_name: calendar_name.into(),
        }
    }

    pub fn editor(&self) -> &DraftEditor {
        &self.editor
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn window(&self) -> TermWindow {
        self.window
    }

    /// Run one command line and return the text to show.
    pub fn execute(&mut self, line: &str) -> Result<(Flow, String)> {
        let words = split_words(line);
        let Some((command, args)) = words.split_first() else {
            return Ok((Flow::Continue, String::new()));
        };

        let output = match command.to_lowercase().as_str() {
            "list" | "ls" => self.render_list(),
            "add" => {
                let index = self.editor.push(ClassMeetingDraft::new(args.join(" ")));
                format!("Added draft {}", index)
            }
            "set" => {
                let [index, field, value @ ..] = args else {
                    bail!("Usage: set <n> <field> <value>");
                };
                let index = parse_index(index)?;
                self.editor.update(index, DraftField::parse(field, &value.join(" "))?)?;
                self.render_one(index)
            }
            "rm" | "remove" => {
                let [index] = args else {
                    bail!("Usage: rm <n>");
                };
                let removed = self.editor.remove(parse_index(index)?)?;
                format!("Removed '{}'", removed.display_title())
            }
            "term" => {
                let [start, end] = args else {
                    bail!("Usage: term <start YYYY-MM-DD> <end YYYY-MM-DD>");
                };
                let start = parse_date(start).ok_or_else(|| anyhow!("Invalid start date '{}'", start))?;
                let end = parse_date(end).ok_or_else(|| anyhow!("Invalid end date '{}'", end))?;
                if start > end {
                    bail!("Term start {} is after term end {}", start, end);
                }
                self.window = TermWindow::new(Some(start), Some(end));
                format!("Term set to {} .. {}", start, end)
            }
            "tz" | "timezone" => {
                let [zone] = args else {
                    bail!("Usage: tz <IANA timezone>");
                };
                resolve_timezone(zone)?;
                self.timezone = zone.clone();
                format!("Timezone set to {}", zone)
            }
            "links" => self.render_links(),
            "export" => {
                let path = args.first().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("schedule.ics"));
                self.export_to(&path)?
            }
            "help" => HELP.to_string(),
            "quit" | "exit" => return Ok((Flow::Quit, String::new())),
            _ => "Unknown command. Type 'help' for available commands.".to_string(),
        };
        Ok((Flow::Continue, output))
    }

    fn render_one(&self, index: usize) -> String {
        let Some(draft) = self.editor.get(index) else {
            return String::new();
        };
        let mut out = format!(
            "[{}] {} | {} | {}-{}",
            index,
            draft.display_title(),
            format_day_tokens(&draft.weekdays),
            draft.start_time,
            draft.end_time
        );
        if let Some(location) = &draft.location {
            let _ = write!(out, " | {}", location);
        }
        if draft.has_unrecognized_days() {
            let guesses: Vec<&str> =
                draft.weekdays.iter().filter(|d| !d.is_recognized()).map(|d| d.as_str()).collect();
            let _ = write!(out, "\n    ? unrecognized days: {}", guesses.join(", "));
        }
        match materialize(draft, &self.timezone, &self.window) {
            Ok(occ) => {
                let _ = write!(out, "\n    first meeting {}", occ.start.format("%a %Y-%m-%d %H:%M"));
            }
            Err(e) => {
                let _ = write!(out, "\n    ! {}", e);
            }
        }
        out
    }

    fn render_list(&self) -> String {
        if self.editor.is_empty() {
            return "No drafts. Use 'add <title>' to create one.".to_string();
        }
        let mut lines: Vec<String> = (0..self.editor.len()).map(|i| self.render_one(i)).collect();
        if needs_dates(self.editor.drafts(), &self.window) {
            lines.push(NEEDS_DATES_NOTE.to_string());
        }
        lines.join("\n")
    }

    fn render_links(&self) -> String {
        calendar_links(self.editor.drafts(), &self.timezone, &self.window)
            .into_iter()
            .map(|link| match (link.url, link.error) {
                (Some(url), _) => format!("[{}] {}\n    {}", link.index, link.title, url),
                (None, error) => format!("[{}] {}\n    ! {}", link.index, link.title, error.unwrap_or_default()),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn export_to(&self, path: &Path) -> Result<String> {
        let export = export_calendar(self.editor.drafts(), &self.timezone, &self.window, &self.calendar_name)?;
        export.write_to(path)?;

        let mut out = format!("Wrote {} events to {}", export.event_count, path.display());
        for skipped in &export.skipped {
            let _ = write!(out, "\n    skipped [{}] {}: {}", skipped.index, skipped.title, skipped.reason);
        }
        Ok(out)
    }
}

const HELP: &str = "Available commands:
  list                       - Show drafts and how they will be scheduled
  add [title]                - Add a draft
  set <n> <field> <value>    - Change a field (title, days, start, end, location,
                               instructor, notes, start_date, end_date, term)
  rm <n>                     - Remove a draft
  term <start> <end>         - Set the term dates (YYYY-MM-DD)
  tz <zone>                  - Set the timezone
  links                      - Print Google Calendar links
  export [path]              - Write an .ics file (default schedule.ics)
  help                       - Show this help
  quit                       - Leave the editor";

fn parse_index(raw: &str) -> Result<usize> {
    raw.parse::<usize>().with_context(|| format!("Expected a draft number, got '{}'", raw))
}

/// Split a command line on spaces, keeping double-quoted runs together.
fn split_words(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => {
                if in_quotes {
                    parts.push(std::mem::take(&mut current));
                }
                in_quotes = !in_quotes;
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

pub struct Application {
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(mut self, cli: Cli) -> Result<()> {
        match cli.command {
            Commands::Ics { schedule, output, calendar_name } => {
                let loaded = load_from_args(&schedule, &self.config)?;
                let name = calendar_name.unwrap_or_else(|| self.config.calendar.calendar_name.clone());
                let export = export_calendar(&loaded.drafts, &loaded.timezone, &loaded.window, &name)
                    .map_err(|e| {
                        if needs_dates(&loaded.drafts, &loaded.window) {
                            println!("{}", NEEDS_DATES_NOTE);
                        }
                        e
                    })?;
                export.write_to(&output)?;
                println!("Wrote {} events to {}", export.event_count, output.display());
                for skipped in &export.skipped {
                    println!("  skipped [{}] {}: {}", skipped.index, skipped.title, skipped.reason);
                }
                Ok(())
            }
            Commands::Links { schedule } => {
                let loaded = load_from_args(&schedule, &self.config)?;
                resolve_timezone(&loaded.timezone)?;
                for link in calendar_links(&loaded.drafts, &loaded.timezone, &loaded.window) {
                    match (link.url, link.error) {
                        (Some(url), _) => println!("{}: {}", link.title, url),
                        (None, error) => println!("{}: {}", link.title, error.unwrap_or_default()),
                    }
                }
                Ok(())
            }
            Commands::Materialize { schedule } => {
                let loaded = load_from_args(&schedule, &self.config)?;
                let report = materialize_all(&loaded.drafts, &loaded.timezone, &loaded.window);
                let json = serde_json::to_string_pretty(&report.summaries(&loaded.drafts))?;
                println!("{}", json);
                Ok(())
            }
            Commands::Edit { input, start, end, timezone } => {
                let schedule = match input {
                    Some(path) => load_schedule(&path, start, end, timezone.as_deref(), &self.config)?,
                    None => LoadedSchedule {
                        drafts: Vec::new(),
                        timezone: self.config.resolve_timezone(timezone.as_deref()),
                        window: TermWindow::new(start, end),
                    },
                };
                let session = EditSession::new(schedule, self.config.calendar.calendar_name.clone());
                run_editor(session)
            }
            Commands::Serve { addr } => crate::api_server::start_api_server(self.config, addr).await,
            Commands::Config { action } => self.run_config(action),
        }
    }

    fn run_config(&mut self, action: ConfigActions) -> Result<()> {
        match action {
            ConfigActions::Show => {
                println!("# {}", get_config_path()?.display());
                println!("{}", toml::to_string_pretty(&self.config)?);
            }
            ConfigActions::SetTimezone { timezone } => {
                resolve_timezone(&timezone)?;
                self.config.calendar.default_timezone = Some(timezone.clone());
                self.config.save()?;
                println!("Default timezone set to {}", timezone);
            }
            ConfigActions::SetCalendarName { name } => {
                self.config.calendar.calendar_name = name.clone();
                self.config.save()?;
                println!("Calendar name set to {}", name);
            }
        }
        Ok(())
    }
}

fn run_editor(mut session: EditSession) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("Editing {} drafts in {}. Type 'help' for commands.", session.editor().len(), session.timezone());
    match session.window() {
        TermWindow { start: Some(start), end: Some(end) } => println!("Term: {} .. {}", start, end),
        _ => println!("No term dates yet; set them with 'term <start> <end>'."),
    }

    loop {
        match rl.readline("schedulify> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match session.execute(&line) {
                    Ok((Flow::Quit, _)) => break,
                    Ok((Flow::Continue, output)) => {
                        if !output.is_empty() {
                            println!("{}", output);
                        }
                    }
                    Err(err) => log::error!("Failed to process command: {:#}", err),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}
