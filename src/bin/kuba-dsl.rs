//! Kuba DSL command line
//!
//! Small front end for trying the pipeline without a server:
//!
//! ```text
//! kuba-dsl interval "[2020-11-13 14:15:00,2020-11-13 14:20:00)@Europe/Berlin"
//! kuba-dsl calendar --tz Europe/Berlin --year 2021
//! kuba-dsl calendar --day -1
//! echo '[{"x":0,"y":15},{"x":60,"y":25}]' | kuba-dsl chart --metric-scale 10
//! ```
//!
//! Results are written to stdout as JSON; logs go to stderr.

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use kuba_dsl::config::Config;
use kuba_dsl::query::{parse_range, Pipeline};
use kuba_dsl::time::{parse_timezone, Calendar, Tz};
use kuba_dsl::types::{AggregateKind, Interval, Period, Series, ALIGN_GROUP_START};
use kuba_dsl::Result;

#[derive(Parser)]
#[command(name = "kuba-dsl")]
#[command(version)]
#[command(about = "Range parsing, calendar intervals and chart pipelines for time series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (overrides DSL_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a range expression and print the inclusive interval
    Interval {
        /// Expression such as "[2020-11-13 12:55:52,2020-11-13 12:56:26]@Etc/UTC"
        expr: String,
    },

    /// Print the interval of a calendar year or day
    Calendar {
        /// IANA timezone (defaults to the configured zone)
        #[arg(long)]
        tz: Option<String>,

        /// Calendar year
        #[arg(long, conflicts_with = "day")]
        year: Option<i32>,

        /// Day offset relative to today (0 = today, -1 = yesterday)
        #[arg(long, allow_hyphen_values = true)]
        day: Option<i64>,
    },

    /// Read a JSON series from stdin and print chart-ready display samples
    Chart {
        /// Fixed-point scale of the metric
        #[arg(long, default_value_t = 1)]
        metric_scale: i64,

        /// Viewport width in pixels (defaults to the configured width)
        #[arg(short, long)]
        width: Option<usize>,

        /// Grid divisor in seconds (defaults to the configured grid)
        #[arg(long)]
        grid: Option<i64>,

        /// Group by calendar period before reducing
        #[arg(long, requires = "agg")]
        group: Option<Period>,

        /// Reduction applied to each group (min, max, avg, sum, count)
        #[arg(long, requires = "group")]
        agg: Option<AggregateKind>,

        /// Seconds added to each timestamp before grouping
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        drift: i64,

        /// IANA timezone for grouping (defaults to the configured zone)
        #[arg(long)]
        tz: Option<String>,
    },
}

#[derive(Serialize)]
struct IntervalOutput {
    min: i64,
    max: i64,
    timezone: String,
}

impl IntervalOutput {
    fn new(interval: Interval, tz: Tz) -> Self {
        Self {
            min: interval.min,
            max: interval.max,
            timezone: tz.name().to_string(),
        }
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

fn cmd_interval(expr: &str) -> Result<()> {
    let parsed = parse_range(expr)?;
    print_json(&IntervalOutput::new(parsed.interval, parsed.timezone))
}

fn cmd_calendar(config: &Config, tz: Option<&str>, year: Option<i32>, day: Option<i64>) -> Result<()> {
    let tz = resolve_timezone(config, tz)?;
    let calendar = Calendar::new(tz);

    let interval = match (year, day) {
        (Some(year), _) => calendar.year_interval(year)?,
        (None, Some(offset)) => calendar.day_interval(offset)?,
        (None, None) => calendar.today()?,
    };

    print_json(&IntervalOutput::new(interval, tz))
}

#[allow(clippy::too_many_arguments)]
fn cmd_chart(
    config: &Config,
    metric_scale: i64,
    width: Option<usize>,
    grid: Option<i64>,
    group: Option<Period>,
    agg: Option<AggregateKind>,
    drift: i64,
    tz: Option<&str>,
) -> Result<()> {
    let mut pipeline = Pipeline::from_config(config)?;
    if let Some(width) = width {
        pipeline = pipeline.with_viewport_width(width)?;
    }
    if let Some(grid) = grid {
        pipeline = pipeline.with_grid(grid)?;
    }

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let series: Series = serde_json::from_str(&input)?;
    debug!(points = series.len(), "Read input series");

    let mut series = pipeline.snap(series)?;

    if let (Some(period), Some(kind)) = (group, agg) {
        let tz = resolve_timezone(config, tz)?;
        let groups = pipeline.group_by_period(series, drift, ALIGN_GROUP_START, tz, period);
        info!(groups = groups.len(), ?period, %kind, "Grouped series");
        series = pipeline.group_reduce(&groups, kind);
    }

    let series = pipeline.downscale(series)?;
    let display = pipeline.unscale(&series, metric_scale)?;
    print_json(&display)
}

// =============================================================================
// Helpers
// =============================================================================

fn resolve_timezone(config: &Config, tz: Option<&str>) -> Result<Tz> {
    match tz {
        Some(name) => parse_timezone(name),
        None => config.time.default_timezone.parse(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os("DSL_CONFIG").map(PathBuf::from));

    let config = match path {
        Some(path) => Config::from_file_with_env(path)?,
        None => Config::from_env(),
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.structured {
        builder.json().init();
    } else {
        builder.init();
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    init_tracing(&config);
    debug!(?config, "Configuration loaded");

    match &cli.command {
        Commands::Interval { expr } => cmd_interval(expr)?,
        Commands::Calendar { tz, year, day } => cmd_calendar(&config, tz.as_deref(), *year, *day)?,
        Commands::Chart {
            metric_scale,
            width,
            grid,
            group,
            agg,
            drift,
            tz,
        } => cmd_chart(
            &config,
            *metric_scale,
            *width,
            *grid,
            *group,
            *agg,
            *drift,
            tz.as_deref(),
        )?,
    }

    Ok(())
}
