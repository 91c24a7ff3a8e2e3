use clap::Parser;

/// Reconciles one person's booked leave days from a roster spreadsheet
/// with the events of an iCal calendar feed.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The roster spreadsheet (.xlsx) to read the booked leave from.
    #[clap(short, long, value_parser)]
    pub roster: Option<String>,

    /// The person to look up, as spelled in the roster's name column
    /// (for example "Smith, John"). Matching is case- and whitespace-insensitive.
    #[clap(short, long, value_parser)]
    pub name: Option<String>,

    /// (URL or empty) The iCal feed to reconcile against, typically a calendar's
    /// secret address in iCal format. When omitted, the plan is produced without
    /// calendar annotations.
    #[clap(long, value_parser)]
    pub calendar: Option<String>,

    /// (file path, optional) A JSON settings file carrying the same options as the
    /// command line. Explicit flags take precedence over the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// When the workbook has several worksheets, the name of the one holding the
    /// roster. Defaults to the first worksheet.
    #[clap(long, value_parser)]
    pub worksheet: Option<String>,

    /// (file path or 'stdout') If specified, the plan and its per-type tally are
    /// written as JSON to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) If specified, the per-day plan is exported as CSV.
    #[clap(long, value_parser)]
    pub csv: Option<String>,

    /// Number of days of calendar context fetched around the booked date range.
    #[clap(long, value_parser)]
    pub padding: Option<i64>,

    /// Timeout in seconds for the calendar feed fetch. Unbounded when not set
    /// here or in the settings file.
    #[clap(long, value_parser)]
    pub timeout: Option<u64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
