// Calendar feed handling: one blocking fetch, iCal parsing, recurrence
// expansion, and the reconciliation boundary that degrades every feed
// problem to "no calendar data".

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use icalendar::{Calendar, CalendarComponent, Component, Event};
use log::{debug, warn};
use rrule::RRuleSet;
use snafu::prelude::*;

use leave_reconcile::{build_day_summaries, DaySummaries, RawEvent};

use crate::recon::{FetchingFeedSnafu, ParsingFeedSnafu, PlanResult};

/// Performs the single blocking fetch of a reconciliation call. The
/// timeout is the caller's policy; without one the HTTP client default
/// applies.
pub struct FeedFetcher {
    timeout: Option<StdDuration>,
}

impl FeedFetcher {
    pub fn new(timeout: Option<StdDuration>) -> FeedFetcher {
        FeedFetcher { timeout }
    }

    fn fetch(&self, url: &str) -> PlanResult<String> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context(FetchingFeedSnafu { url })?;
        let response = client
            .get(url)
            .send()
            .context(FetchingFeedSnafu { url })?
            .error_for_status()
            .context(FetchingFeedSnafu { url })?;
        response.text().context(FetchingFeedSnafu { url })
    }
}

/// Builds the date-keyed display map for `[start, end]` from the feed.
///
/// Fails gracefully: an empty URL short-circuits, and any transport,
/// status or parse error is reported once as a warning and yields an
/// empty map. An empty map means "no calendar data", never an error.
pub fn reconcile(
    fetcher: &FeedFetcher,
    url: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> DaySummaries {
    if url.is_empty() {
        return DaySummaries::new();
    }
    match feed_events(fetcher, url, start, end) {
        Ok(events) => build_day_summaries(&events),
        Err(e) => {
            warn!("could not load the calendar feed: {}", e);
            DaySummaries::new()
        }
    }
}

fn feed_events(
    fetcher: &FeedFetcher,
    url: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> PlanResult<Vec<RawEvent>> {
    let body = fetcher.fetch(url)?;
    parse_feed(&body, start, end)
}

/// Parses an iCal body into date-granularity event occurrences, with
/// recurring events materialized inside `[start, end]`.
pub fn parse_feed(body: &str, start: NaiveDate, end: NaiveDate) -> PlanResult<Vec<RawEvent>> {
    let calendar = match body.parse::<Calendar>() {
        Ok(c) => c,
        Err(e) => {
            return ParsingFeedSnafu {
                message: format!("{}", e),
            }
            .fail()
        }
    };

    let mut events: Vec<RawEvent> = Vec::new();
    for component in &calendar.components {
        let CalendarComponent::Event(event) = component else {
            continue;
        };
        let summary = event.get_summary().unwrap_or("Busy").to_string();
        let Some(dtstart) = property_date(event, "DTSTART") else {
            debug!("skipping event without a readable DTSTART: {:?}", summary);
            continue;
        };
        let dtend = property_date(event, "DTEND");

        match event.properties().get("RRULE").map(|p| p.value()) {
            Some(rule) => {
                // Each instance keeps the base event's day span.
                let span = dtend
                    .map(|e| (e - dtstart).num_days().max(1))
                    .unwrap_or(1);
                for occurrence in expand_rrule(rule, event, dtstart, span, start, end) {
                    events.push(RawEvent {
                        summary: summary.clone(),
                        start: occurrence,
                        end: Some(occurrence + Duration::days(span)),
                    });
                }
            }
            None => {
                // Mirror the window bound applied to recurring instances:
                // an event that cannot touch any day of the window is
                // dropped here rather than carried into the day map.
                let effective_end = match dtend {
                    Some(e) if e > dtstart => e,
                    // Zero-length and end-less events still cover one day.
                    _ => dtstart + Duration::days(1),
                };
                if dtstart > end || effective_end <= start {
                    continue;
                }
                events.push(RawEvent {
                    summary,
                    start: dtstart,
                    end: dtend,
                });
            }
        }
    }
    Ok(events)
}

// Date or datetime property values at day granularity. Timezones beyond
// whole-day resolution are out of scope, so the local date of the stamp
// is taken as-is.
fn parse_ical_date(val: &str) -> Option<NaiveDate> {
    if val.len() == 8 {
        NaiveDate::parse_from_str(val, "%Y%m%d").ok()
    } else {
        NaiveDateTime::parse_from_str(
            val,
            if val.ends_with('Z') {
                "%Y%m%dT%H%M%SZ"
            } else {
                "%Y%m%dT%H%M%S"
            },
        )
        .ok()
        .map(|dt| dt.date())
    }
}

fn property_date(event: &Event, key: &str) -> Option<NaiveDate> {
    event
        .properties()
        .get(key)
        .and_then(|p| parse_ical_date(p.value()))
}

// Materializes the recurrence instances of one event that intersect the
// window: `span` is the base event's day span, so an instance starting
// before the window but still covering days inside it is kept. The rule
// is rebuilt on a UTC DTSTART line so the rrule crate has one consistent
// datetime flavor to work with.
fn expand_rrule(
    rule: &str,
    event: &Event,
    seed: NaiveDate,
    span: i64,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<NaiveDate> {
    let seed_dt = seed.and_hms_opt(0, 0, 0).unwrap().and_utc();

    // UNTIL must match the DTSTART flavor (RFC 5545). Since DTSTART is
    // forced to a UTC datetime, a date-only UNTIL is upgraded to the end
    // of that day.
    let mut rule_part = rule.trim().to_string();
    if let Some(idx) = rule_part.find("UNTIL=") {
        let val_start = idx + 6;
        let val_end = rule_part[val_start..]
            .find(';')
            .map(|i| val_start + i)
            .unwrap_or(rule_part.len());
        let until_val = &rule_part[val_start..val_end];
        if until_val.len() == 8 && !until_val.contains('T') {
            let new_until = format!("{}T235959Z", until_val);
            rule_part.replace_range(val_start..val_end, &new_until);
        }
    }

    let mut rrule_string = format!(
        "DTSTART:{}\nRRULE:{}\n",
        seed_dt.format("%Y%m%dT%H%M%SZ"),
        rule_part
    );

    // Feeds in the wild repeat identical EXDATEs; deduplicate before
    // handing them to the parser.
    let mut exdate_props: Vec<&icalendar::Property> = Vec::new();
    if let Some(props) = event.multi_properties().get("EXDATE") {
        exdate_props.extend(props.iter());
    }
    if let Some(prop) = event.properties().get("EXDATE") {
        exdate_props.push(prop);
    }
    let mut seen_exdates = HashSet::new();
    for prop in exdate_props {
        // One EXDATE property may carry a comma-separated date list
        // (RFC 5545).
        for val in prop.value().split(',') {
            if let Some(d) = parse_ical_date(val) {
                let ex = d
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    .and_utc()
                    .format("%Y%m%dT%H%M%SZ")
                    .to_string();
                if seen_exdates.insert(ex.clone()) {
                    rrule_string.push_str(&format!("EXDATE:{}\n", ex));
                }
            }
        }
    }

    let rrule_set = match RRuleSet::from_str(&rrule_string) {
        Ok(set) => set,
        Err(e) => {
            // A feed with one odd rule still shows the event on its start
            // date instead of losing it.
            warn!("could not interpret recurrence rule {:?}: {}", rule, e);
            return vec![seed];
        }
    };

    let ceiling = window_end.and_hms_opt(23, 59, 59).unwrap().and_utc();
    rrule_set
        .into_iter()
        .take_while(|d| d.to_utc() <= ceiling)
        .map(|d| d.to_utc().date_naive())
        .filter(|occ| *occ + Duration::days(span) > window_start)
        .collect()
}
