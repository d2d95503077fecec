//! `slots` CLI: evaluate facility booking scenarios from the command line.
//!
//! A scenario is a JSON snapshot (config, zones, bookings, holidays) with an
//! optional recurrence `pattern`.
//!
//! ## Usage
//!
//! ```sh
//! # Expand the scenario's pattern for a zone (stdin → stdout)
//! slots occurrences --zone court-1 < scenario.json
//!
//! # Availability of one cell, or of every slot on a date
//! slots availability -i scenario.json --zone court-1 --date 2025-06-04 --slot 10:00
//! slots availability -i scenario.json --zone court-1 --date 2025-06-04
//!
//! # Split the pattern's occurrences into free and conflicted, with substitutes
//! slots partition -i scenario.json --zone court-1 --now 2025-06-01T00:00:00Z -o plan.json
//!
//! # Export the pattern as an RFC 5545 RRULE
//! slots rrule -i scenario.json
//! ```
//!
//! Set `RUST_LOG=slot_engine=debug` to see engine decisions on stderr.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use slot_engine::{
    generate_occurrences, partition, suggest_substitutes, AvailabilityStatus, ConflictManager,
    PartitionOutcome, RecurrencePattern, SelectedTimeSlot, Snapshot, Substitute,
};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Availability and recurrence engine for facility booking"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Common {
    /// Scenario file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
    /// Reference time for past-slot checks, RFC 3339 (defaults to the current time)
    #[arg(long)]
    now: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand the scenario's recurrence pattern into occurrences
    Occurrences {
        #[command(flatten)]
        common: Common,
        /// Zone to book
        #[arg(long)]
        zone: String,
        /// First date of interest (defaults to the pattern's start date)
        #[arg(long)]
        from: Option<String>,
        /// Maximum number of occurrences
        #[arg(long, default_value_t = 100)]
        max: usize,
    },
    /// Check availability of a zone on a date
    Availability {
        #[command(flatten)]
        common: Common,
        #[arg(long)]
        zone: String,
        #[arg(long)]
        date: String,
        /// Single slot label (all slots of the grid if omitted)
        #[arg(long)]
        slot: Option<String>,
    },
    /// Split the pattern's occurrences into free and conflicted ones
    Partition {
        #[command(flatten)]
        common: Common,
        #[arg(long)]
        zone: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long, default_value_t = 100)]
        max: usize,
    },
    /// Print the scenario's pattern as an RFC 5545 RRULE
    Rrule {
        #[command(flatten)]
        common: Common,
    },
}

/// Input document: an availability snapshot plus an optional pattern.
#[derive(Deserialize)]
struct Scenario {
    #[serde(flatten)]
    snapshot: Snapshot,
    #[serde(default)]
    pattern: Option<RecurrencePattern>,
}

impl Scenario {
    fn pattern(&self) -> Result<&RecurrencePattern> {
        match &self.pattern {
            Some(pattern) => Ok(pattern),
            None => bail!("Scenario has no 'pattern' to expand"),
        }
    }
}

#[derive(Serialize)]
struct SlotStatus<'a> {
    time_slot: &'a str,
    #[serde(flatten)]
    status: AvailabilityStatus,
}

#[derive(Serialize)]
struct ConflictReport<'a> {
    occurrence: &'a SelectedTimeSlot,
    #[serde(flatten)]
    status: &'a AvailabilityStatus,
    substitutes: Vec<Substitute>,
}

#[derive(Serialize)]
struct PartitionReport<'a> {
    outcome: PartitionOutcome,
    accepted: &'a [SelectedTimeSlot],
    conflicted: Vec<ConflictReport<'a>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Occurrences {
            common,
            zone,
            from,
            max,
        } => {
            let scenario = read_scenario(common.input.as_deref())?;
            let pattern = scenario.pattern()?;
            let grid = scenario
                .snapshot
                .config
                .grid()
                .context("Scenario config does not describe a valid slot grid")?;
            let from = match from.as_deref() {
                Some(s) => parse_date(s)?,
                None => pattern.start_date,
            };
            let occurrences: Vec<SelectedTimeSlot> = pattern
                .apply(from, zone, &grid, max)
                .context("Invalid recurrence pattern")?
                .collect();
            write_json(common.output.as_deref(), &occurrences)?;
        }
        Commands::Availability {
            common,
            zone,
            date,
            slot,
        } => {
            let scenario = read_scenario(common.input.as_deref())?;
            let manager = build_manager(&scenario, common.now.as_deref())?;
            let date = parse_date(&date)?;
            let labels: Vec<String> = match slot {
                Some(slot) => vec![slot],
                None => manager.grid().labels().map(String::from).collect(),
            };
            let report: Vec<SlotStatus> = labels
                .iter()
                .map(|label| SlotStatus {
                    time_slot: label,
                    status: manager.check_availability(&zone, date, label),
                })
                .collect();
            write_json(common.output.as_deref(), &report)?;
        }
        Commands::Partition {
            common,
            zone,
            from,
            max,
        } => {
            let scenario = read_scenario(common.input.as_deref())?;
            let manager = build_manager(&scenario, common.now.as_deref())?;
            let pattern = scenario.pattern()?;
            pattern
                .validate(manager.grid())
                .context("Invalid recurrence pattern")?;
            let from = match from.as_deref() {
                Some(s) => parse_date(s)?,
                None => pattern.start_date,
            };

            let split = partition(
                generate_occurrences(pattern, from, zone, manager.grid(), max),
                &manager,
            );
            let options = scenario.snapshot.config.substitutes;
            let report = PartitionReport {
                outcome: split.outcome(),
                accepted: &split.accepted,
                conflicted: split
                    .conflicted
                    .iter()
                    .map(|c| ConflictReport {
                        occurrence: &c.occurrence,
                        status: &c.status,
                        substitutes: suggest_substitutes(&c.occurrence, &manager, options),
                    })
                    .collect(),
            };
            write_json(common.output.as_deref(), &report)?;
        }
        Commands::Rrule { common } => {
            let scenario = read_scenario(common.input.as_deref())?;
            let rule = scenario.pattern()?.to_rrule();
            write_output(common.output.as_deref(), &format!("{}\n", rule))?;
        }
    }

    Ok(())
}

fn build_manager(scenario: &Scenario, now: Option<&str>) -> Result<ConflictManager> {
    let now = match now {
        Some(s) => parse_now(s)?,
        None => Utc::now(),
    };
    scenario
        .snapshot
        .manager(now)
        .context("Scenario does not describe a valid facility")
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Invalid date: '{}'", s))
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` taken as UTC.
fn parse_now(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .with_context(|| format!("Invalid --now datetime: '{}'", s))
}

fn read_scenario(path: Option<&str>) -> Result<Scenario> {
    let json = read_input(path)?;
    let scenario: Scenario = serde_json::from_str(&json).context("Failed to parse scenario JSON")?;
    scenario
        .snapshot
        .config
        .validate()
        .context("Invalid scenario config")?;
    tracing::debug!(
        zones = scenario.snapshot.zones.len(),
        bookings = scenario.snapshot.bookings.len(),
        has_pattern = scenario.pattern.is_some(),
        "scenario loaded"
    );
    Ok(scenario)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: Option<&str>, value: &T) -> Result<()> {
    let mut pretty = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    pretty.push('\n');
    write_output(path, &pretty)
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
