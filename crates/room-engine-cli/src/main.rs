//! `rooms` CLI -- expand reservation series, check conflicts, and validate
//! requests from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Expand one stored reservation (or an array of them) into occurrences
//! rooms expand -i reservation.json
//!
//! # Check a candidate against the room's stored reservations
//! rooms conflicts -i candidate.json --existing room-101.json
//!
//! # Validate a new request against the room's policy
//! rooms validate -i candidate.json --room room-101-policy.json
//!
//! # Occurrences visible in a calendar week, in the rooms' timezone
//! rooms --timezone America/Sao_Paulo calendar -i all.json --from 2024-03-11 --to 2024-03-17
//! ```
//!
//! Logging goes to stderr; set `RUST_LOG=room_engine=debug` for expansion detail.

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use room_engine::dst::{resolve_local, DstPolicy};
use room_engine::model::{decode_records, parse_all};
use room_engine::{
    check_conflicts, expand_all, occurrences_in_window, validate_at, ConflictScope, EngineConfig,
    Occurrence, RawReservation, RecordId, ReservationDefinition, RoomPolicy,
    DEFAULT_DISPLAY_LIMIT,
};
use serde::Serialize;
use serde_json::json;
use std::io::{self, Read};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rooms",
    version,
    about = "Room reservation recurrence and conflict engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON engine config file ({"timezone": "...", "dst_policy": "..."})
    #[arg(long, global = true)]
    config: Option<String>,

    /// IANA timezone the rooms operate in (overrides the config file)
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// What to do with occurrences in a DST gap: skip or shift-forward
    #[arg(long, global = true)]
    dst_policy: Option<DstPolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand reservation series into concrete occurrences
    Expand {
        /// Input file with one reservation or an array (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Check a candidate reservation against the room's approved reservations
    Conflicts {
        /// Candidate reservation file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// File with the stored reservations (array)
        #[arg(long)]
        existing: String,
        /// Use every given reservation instead of the approved ones in the candidate's room
        #[arg(long)]
        no_filter: bool,
        /// Maximum number of conflict messages to print
        #[arg(long, default_value_t = DEFAULT_DISPLAY_LIMIT)]
        limit: usize,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Validate a new reservation against a room policy
    Validate {
        /// Reservation file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Room policy file ({"room_id": ..., "name": ..., "fixed_reservation_only": ...})
        #[arg(long)]
        room: String,
        /// Validate as of this RFC 3339 instant instead of the current time
        #[arg(long)]
        now: Option<String>,
    },
    /// List occurrences overlapping a date range, sorted by start
    Calendar {
        /// File with the stored reservations (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// First day of the range (YYYY-MM-DD, rooms' timezone)
        #[arg(long)]
        from: NaiveDate,
        /// Last day of the range, inclusive
        #[arg(long)]
        to: NaiveDate,
        /// Only show this room
        #[arg(long)]
        room: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Serialize)]
struct ConflictOutput {
    conflicts: Vec<room_engine::Conflict>,
    skipped: usize,
    messages: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = build_config(
        cli.config.as_deref(),
        cli.timezone.as_deref(),
        cli.dst_policy,
    )?;

    match cli.command {
        Commands::Expand { input, output } => {
            let (raws, rejected) = read_reservations(input.as_deref())?;
            let (defs, skipped) = parse_all(&raws, &config.timezone);
            if rejected + skipped > 0 {
                tracing::warn!("{} malformed reservation(s) skipped", rejected + skipped);
            }
            let occurrences: Vec<Occurrence> = defs
                .iter()
                .flat_map(|def| expand_all(def, &config))
                .collect();
            write_json(output.as_deref(), &occurrences)?;
        }
        Commands::Conflicts {
            input,
            existing,
            no_filter,
            limit,
            output,
        } => {
            let candidate: RawReservation = serde_json::from_str(&read_input(input.as_deref())?)
                .context("Failed to parse candidate reservation JSON")?;
            let (existing, rejected) = read_reservations(Some(&existing))?;
            let scope = if no_filter {
                ConflictScope::All
            } else {
                ConflictScope::Room
            };

            let report = check_conflicts(&candidate, &existing, &scope, &config)
                .context("Candidate reservation is malformed")?;
            let messages = report.messages(limit, &config.timezone);
            write_json(
                output.as_deref(),
                &ConflictOutput {
                    skipped: report.skipped + rejected,
                    conflicts: report.conflicts,
                    messages,
                },
            )?;
        }
        Commands::Validate { input, room, now } => {
            let raw: RawReservation = serde_json::from_str(&read_input(input.as_deref())?)
                .context("Failed to parse reservation JSON")?;
            let def = ReservationDefinition::parse(&raw, &config.timezone)
                .context("Reservation is malformed")?;
            let policy: RoomPolicy = serde_json::from_str(&read_input(Some(&room))?)
                .context("Failed to parse room policy JSON")?;
            let now = match now {
                Some(s) => DateTime::parse_from_rfc3339(&s)
                    .with_context(|| format!("Invalid --now instant: {}", s))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };

            match validate_at(&def, &policy, now, &config) {
                Ok(()) => write_json(None, &json!({ "valid": true }))?,
                Err(e) => {
                    write_json(
                        None,
                        &json!({ "valid": false, "message": e.to_string(), "error": e }),
                    )?;
                    process::exit(1);
                }
            }
        }
        Commands::Calendar {
            input,
            from,
            to,
            room,
            output,
        } => {
            anyhow::ensure!(from <= to, "--from {} is after --to {}", from, to);
            let (raws, _) = read_reservations(input.as_deref())?;
            let (mut defs, _) = parse_all(&raws, &config.timezone);
            if let Some(room) = room {
                let room = parse_record_id(&room);
                defs.retain(|d| d.room_id == room);
            }

            let window_start = start_of_day(from, &config)?;
            let window_end = start_of_day(
                to.checked_add_days(Days::new(1))
                    .context("--to is out of range")?,
                &config,
            )?;
            let entries = occurrences_in_window(&defs, window_start, window_end, &config);
            write_json(output.as_deref(), &entries)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Layer the engine config: defaults, then the config file, then flags.
fn build_config(
    path: Option<&str>,
    timezone: Option<&str>,
    dst_policy: Option<DstPolicy>,
) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let json = read_input(Some(path))?;
            EngineConfig::from_json(&json)
                .with_context(|| format!("Invalid config file: {}", path))?
        }
        None => EngineConfig::default(),
    };
    if let Some(name) = timezone {
        config.timezone = EngineConfig::with_timezone_name(name)?.timezone;
    }
    if let Some(policy) = dst_policy {
        config.dst_policy = policy;
    }
    Ok(config)
}

/// Room ids on the command line: integers when they parse as one.
fn parse_record_id(s: &str) -> RecordId {
    s.parse::<i64>()
        .map(RecordId::Int)
        .unwrap_or_else(|_| RecordId::from(s))
}

fn start_of_day(date: NaiveDate, config: &EngineConfig) -> Result<DateTime<Utc>> {
    resolve_local(
        &config.timezone,
        date.and_time(chrono::NaiveTime::MIN),
        DstPolicy::ShiftForward,
    )
    .with_context(|| format!("No start of day for {} in {}", date, config.timezone))
}

/// Read one reservation or an array of them. Rows that do not decode are
/// dropped; their count is returned alongside.
fn read_reservations(path: Option<&str>) -> Result<(Vec<RawReservation>, usize)> {
    let json = read_input(path)?;
    decode_records(&json).context("Failed to parse reservations JSON")
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

fn write_json<T: Serialize>(path: Option<&str>, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
