use log::info;

use leave_reconcile::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;

use crate::args::Args;
use crate::recon::config_reader::*;

pub mod feed;
pub mod io_roster;
pub mod merge;

#[derive(Debug, Snafu)]
pub enum PlanError {
    #[snafu(display("Error opening roster file {path}"))]
    OpeningRoster {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The roster file {path} has no readable worksheet"))]
    EmptyRoster { path: String },
    #[snafu(display(""))]
    OpeningJson { source: std::io::Error },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error fetching calendar feed {url}"))]
    FetchingFeed { source: reqwest::Error, url: String },
    #[snafu(display("Could not parse calendar feed: {message}"))]
    ParsingFeed { message: String },
    #[snafu(display("Error writing output file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing CSV file {path}"))]
    WritingCsv { source: csv::Error, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PlanResult<T> = Result<T, PlanError>;

/// Days of calendar context fetched on each side of the booked date range.
pub const DEFAULT_WINDOW_PADDING_DAYS: i64 = 7;

pub mod config_reader {
    use crate::recon::*;

    /// JSON settings file. Everything is optional; explicit command line
    /// flags take precedence over the file.
    #[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
    pub struct PlanConfig {
        #[serde(rename = "rosterPath")]
        pub roster_path: Option<String>,
        #[serde(rename = "targetName")]
        pub target_name: Option<String>,
        #[serde(rename = "calendarUrl")]
        pub calendar_url: Option<String>,
        #[serde(rename = "worksheetName")]
        pub worksheet_name: Option<String>,
        #[serde(rename = "windowPaddingDays")]
        pub window_padding_days: Option<i64>,
        #[serde(rename = "fetchTimeoutSeconds")]
        pub fetch_timeout_seconds: Option<u64>,
    }

    pub fn read_config(path: &str) -> PlanResult<PlanConfig> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        let config: PlanConfig =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(config)
    }
}

/// The fully resolved inputs of one run.
#[derive(Debug, Clone)]
pub struct PlanSettings {
    pub roster_path: String,
    pub target_name: String,
    pub calendar_url: Option<String>,
    pub worksheet_name: Option<String>,
    pub window_padding_days: i64,
    pub fetch_timeout: Option<StdDuration>,
    pub out: Option<String>,
    pub csv: Option<String>,
}

pub fn resolve_settings(args: &Args, config: PlanConfig) -> PlanResult<PlanSettings> {
    let roster_path = match args.roster.clone().or(config.roster_path) {
        Some(p) => p,
        None => {
            whatever!("A roster file must be provided with --roster or in the settings file")
        }
    };
    let target_name = match args.name.clone().or(config.target_name) {
        Some(n) if !n.trim().is_empty() => n,
        _ => whatever!("A person's name must be provided with --name or in the settings file"),
    };
    Ok(PlanSettings {
        roster_path,
        target_name,
        calendar_url: args.calendar.clone().or(config.calendar_url),
        worksheet_name: args.worksheet.clone().or(config.worksheet_name),
        window_padding_days: args
            .padding
            .or(config.window_padding_days)
            .unwrap_or(DEFAULT_WINDOW_PADDING_DAYS),
        fetch_timeout: args
            .timeout
            .or(config.fetch_timeout_seconds)
            .map(StdDuration::from_secs),
        out: args.out.clone(),
        csv: args.csv.clone(),
    })
}

fn feed_window(entries: &[LeaveEntry], padding_days: i64) -> Option<(NaiveDate, NaiveDate)> {
    let min = entries.iter().map(|e| e.date).min()?;
    let max = entries.iter().map(|e| e.date).max()?;
    let pad = Duration::days(padding_days);
    Some((min - pad, max + pad))
}

fn build_summary_js(settings: &PlanSettings, rows: &[merge::PlanRow], tally: &[(String, usize)]) -> JSValue {
    let plan: Vec<JSValue> = rows
        .iter()
        .map(|r| {
            json!({
                "date": r.date.format("%Y-%m-%d").to_string(),
                "originalType": r.original,
                "type": r.kind,
                "calendar": r.calendar,
            })
        })
        .collect();
    let tally_js: Vec<JSValue> = tally
        .iter()
        .map(|(kind, days)| json!({"leaveType": kind, "days": days}))
        .collect();
    json!({
        "name": settings.target_name,
        "roster": settings.roster_path,
        "plan": plan,
        "tally": tally_js,
    })
}

/// Runs the whole pipeline: roster extraction, calendar reconciliation,
/// merge, and output.
///
/// A missing or failing calendar feed never affects the roster-side
/// results; it only leaves the calendar column empty.
pub fn run_plan(settings: &PlanSettings) -> PlanResult<()> {
    let grid =
        io_roster::read_roster_grid(&settings.roster_path, settings.worksheet_name.as_deref())?;
    info!("run_plan: roster grid with {} rows", grid.len());

    let entries = extract_leave(&grid, &settings.target_name);
    info!("run_plan: {} booked leave entries", entries.len());
    if entries.is_empty() {
        println!(
            "No booked leave found for {:?} in {}",
            settings.target_name, settings.roster_path
        );
        return Ok(());
    }

    let day_summaries = match (&settings.calendar_url, feed_window(&entries, settings.window_padding_days)) {
        (Some(url), Some((start, end))) if !url.is_empty() => {
            info!(
                "run_plan: reconciling calendar feed between {} and {}",
                start, end
            );
            let fetcher = feed::FeedFetcher::new(settings.fetch_timeout);
            Some(feed::reconcile(&fetcher, url, start, end))
        }
        _ => None,
    };

    let rows = merge::merge_plan(entries, day_summaries.as_ref());
    let tally = merge::kind_tally(&rows);
    merge::print_plan(&rows, &tally);

    if let Some(path) = &settings.csv {
        merge::write_csv(&rows, path)?;
        info!("run_plan: CSV plan written to {}", path);
    }

    if let Some(out) = &settings.out {
        let summary_js = build_summary_js(settings, &rows, &tally);
        let pretty = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
        if out == "stdout" {
            println!("{}", pretty);
        } else {
            fs::write(out, pretty).context(WritingOutputSnafu { path: out.clone() })?;
        }
    }

    Ok(())
}
