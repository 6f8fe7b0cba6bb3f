//! Smart-home analytics CLI
//!
//! Reads usage events, alerts and feedback from JSON or JSON Lines files and
//! prints analytics reports as JSON on stdout.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use smarthome_analytics::{
    config::{parse_timezone, Config},
    core::{
        aggregate_usage, area_usage_correlation, build_histogram, correlate, home_usage_samples,
        period_total, summarize_distribution, summarize_with_resolution, top_correlations,
        CorrelationReport, DistributionSummary, Granularity, ObservationWindow, ReportBuilder,
        ReportKind, ResolutionSummary, UsagePeriod,
    },
    ingest::{
        group_by_device, load_records, load_usage_events, AlertRecord, DeviceRecord,
        FeedbackRecord, HomeRecord, UsageEvent,
    },
    logging, VERSION,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "smarthome-analytics")]
#[command(version = VERSION)]
#[command(about = "Usage analytics and device correlation for smart homes", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// IANA timezone for calendar alignment, overriding the configuration
    #[arg(long, global = true)]
    timezone: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Usage hours per day or week bucket
    Usage {
        /// Usage events file (JSON array or JSON Lines, `-` for stdin)
        #[arg(long)]
        events: PathBuf,

        /// Bucket granularity (day or week)
        #[arg(long, default_value = "day")]
        granularity: String,

        /// Number of buckets (defaults to the configured period count)
        #[arg(long)]
        periods: Option<usize>,

        /// Reference time (RFC3339), defaults to now
        #[arg(long)]
        reference: Option<String>,

        /// Only include events of this device
        #[arg(long)]
        device: Option<String>,
    },

    /// Total usage over a rolling period
    Period {
        #[arg(long)]
        events: PathBuf,

        /// day, week, month or year
        #[arg(long, default_value = "day")]
        period: String,

        #[arg(long)]
        reference: Option<String>,

        #[arg(long)]
        device: Option<String>,
    },

    /// Usage by 2-hour slot of the day
    Histogram {
        #[arg(long)]
        events: PathBuf,

        /// Observation window length in days
        #[arg(long)]
        days: Option<u32>,

        #[arg(long)]
        reference: Option<String>,

        #[arg(long)]
        device: Option<String>,
    },

    /// Directional co-occurrence probabilities between devices
    Correlate {
        #[arg(long)]
        events: PathBuf,

        /// Slice width in minutes (must divide 1440)
        #[arg(long)]
        window_minutes: Option<u32>,

        /// Observation window length in days
        #[arg(long)]
        days: Option<u32>,

        /// Keep at most this many pairs
        #[arg(long)]
        top: Option<usize>,

        /// Drop pairs at or below this probability
        #[arg(long)]
        min_probability: Option<f64>,

        /// Device records file, used with --home
        #[arg(long, requires = "home")]
        devices: Option<PathBuf>,

        /// Restrict to the devices of one home
        #[arg(long, requires = "devices")]
        home: Option<String>,

        #[arg(long)]
        reference: Option<String>,
    },

    /// Alert distribution by type
    Alerts {
        /// Alert records file
        #[arg(long)]
        records: PathBuf,

        /// Grouping key
        #[arg(long, value_enum, default_value = "alert-type")]
        by: AlertGrouping,

        /// Only include alerts of this home
        #[arg(long)]
        home: Option<String>,
    },

    /// Feedback resolution by device type
    Feedback {
        /// Feedback records file
        #[arg(long)]
        records: PathBuf,
    },

    /// Relationship between home area and daily usage of a device type
    AreaUsage {
        #[arg(long)]
        homes: PathBuf,

        #[arg(long)]
        devices: PathBuf,

        #[arg(long)]
        events: PathBuf,

        #[arg(long, default_value = "air_conditioner")]
        device_type: String,

        #[arg(long)]
        days: Option<u32>,

        #[arg(long)]
        reference: Option<String>,
    },

    /// Show configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlertGrouping {
    AlertType,
    DeviceType,
}

/// Resolved runtime context shared by all commands.
struct AppContext {
    config: Config,
    config_path: PathBuf,
    builder: ReportBuilder,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let ctx = match load_context(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            logging::init("info");
            tracing::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&ctx.config.log_level);

    match run(cli.command, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_context(cli: &Cli) -> Result<AppContext> {
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let mut config = Config::load_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    if let Some(name) = &cli.timezone {
        config.timezone = parse_timezone(name)?;
    }

    let builder = ReportBuilder::new(config.timezone);
    Ok(AppContext {
        config,
        config_path,
        builder,
    })
}

fn run(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Usage {
            events,
            granularity,
            periods,
            reference,
            device,
        } => cmd_usage(ctx, &events, &granularity, periods, reference, device),
        Commands::Period {
            events,
            period,
            reference,
            device,
        } => cmd_period(ctx, &events, &period, reference, device),
        Commands::Histogram {
            events,
            days,
            reference,
            device,
        } => cmd_histogram(ctx, &events, days, reference, device),
        Commands::Correlate {
            events,
            window_minutes,
            days,
            top,
            min_probability,
            devices,
            home,
            reference,
        } => cmd_correlate(
            ctx,
            &events,
            CorrelateOptions {
                window_minutes,
                days,
                top,
                min_probability,
                devices,
                home,
                reference,
            },
        ),
        Commands::Alerts { records, by, home } => cmd_alerts(ctx, &records, by, home),
        Commands::Feedback { records } => cmd_feedback(ctx, &records),
        Commands::AreaUsage {
            homes,
            devices,
            events,
            device_type,
            days,
            reference,
        } => cmd_area_usage(ctx, &homes, &devices, &events, &device_type, days, reference),
        Commands::Config => cmd_config(ctx),
    }
}

/// Parse an RFC3339 reference time, or take the current time.
fn reference_time(reference: Option<String>, tz: Tz) -> Result<DateTime<Tz>> {
    match reference {
        Some(s) => {
            let parsed = DateTime::parse_from_rfc3339(&s)
                .with_context(|| format!("invalid --reference {s:?}, expected RFC3339"))?;
            Ok(parsed.with_timezone(&tz))
        }
        None => Ok(Utc::now().with_timezone(&tz)),
    }
}

fn load_events(path: &Path, device: Option<&str>) -> Result<Vec<UsageEvent>> {
    let mut events = load_usage_events(path)
        .with_context(|| format!("reading usage events from {}", path.display()))?;
    if let Some(device) = device {
        events.retain(|e| e.device_id() == device);
    }
    tracing::info!(count = events.len(), path = %path.display(), "loaded usage events");
    Ok(events)
}

fn emit<T: Serialize>(ctx: &AppContext, kind: ReportKind, payload: T) -> Result<()> {
    let json = ctx
        .builder
        .build_json(kind, payload)
        .context("serializing report")?;
    println!("{json}");
    Ok(())
}

fn cmd_usage(
    ctx: &AppContext,
    events: &Path,
    granularity: &str,
    periods: Option<usize>,
    reference: Option<String>,
    device: Option<String>,
) -> Result<()> {
    let granularity: Granularity = granularity.parse()?;
    let reference = reference_time(reference, ctx.config.timezone)?;
    let events = load_events(events, device.as_deref())?;

    let period_count = periods.unwrap_or(ctx.config.period_count);
    let result = aggregate_usage(&events, reference, period_count, granularity)?;
    emit(ctx, ReportKind::Usage, result)
}

fn cmd_period(
    ctx: &AppContext,
    events: &Path,
    period: &str,
    reference: Option<String>,
    device: Option<String>,
) -> Result<()> {
    let period: UsagePeriod = period.parse()?;
    let reference = reference_time(reference, ctx.config.timezone)?;
    let events = load_events(events, device.as_deref())?;

    emit(
        ctx,
        ReportKind::PeriodTotal,
        period_total(&events, reference, period),
    )
}

fn cmd_histogram(
    ctx: &AppContext,
    events: &Path,
    days: Option<u32>,
    reference: Option<String>,
    device: Option<String>,
) -> Result<()> {
    let reference = reference_time(reference, ctx.config.timezone)?;
    let window = ObservationWindow::trailing_days(
        reference.with_timezone(&Utc),
        days.unwrap_or(ctx.config.lookback_days),
    )?;
    let events = load_events(events, device.as_deref())?;

    emit(
        ctx,
        ReportKind::Histogram,
        build_histogram(&events, &window, &ctx.config.timezone),
    )
}

struct CorrelateOptions {
    window_minutes: Option<u32>,
    days: Option<u32>,
    top: Option<usize>,
    min_probability: Option<f64>,
    devices: Option<PathBuf>,
    home: Option<String>,
    reference: Option<String>,
}

fn cmd_correlate(ctx: &AppContext, events: &Path, opts: CorrelateOptions) -> Result<()> {
    let window_minutes = opts
        .window_minutes
        .unwrap_or(ctx.config.correlation_window_minutes);
    let reference = reference_time(opts.reference, ctx.config.timezone)?;
    let window = ObservationWindow::trailing_days(
        reference.with_timezone(&Utc),
        opts.days.unwrap_or(ctx.config.lookback_days),
    )?;

    let mut events = load_events(events, None)?;
    events.retain(|e| window.contains(e.start_time()));
    let mut by_device = group_by_device(&events);

    if let (Some(devices_path), Some(home)) = (&opts.devices, &opts.home) {
        let devices: Vec<DeviceRecord> = load_records(devices_path)
            .with_context(|| format!("reading devices from {}", devices_path.display()))?;
        let home_devices: BTreeMap<String, Vec<UsageEvent>> = devices
            .iter()
            .filter(|d| &d.home_id == home)
            .map(|d| {
                let events = by_device.remove(&d.device_id).unwrap_or_default();
                (d.device_id.clone(), events)
            })
            .collect();
        if home_devices.is_empty() {
            tracing::warn!(home = %home, "home has no devices");
        }
        by_device = home_devices;
    }

    let pairs = correlate(&by_device, window_minutes, &ctx.config.timezone)?;
    let pairs = top_correlations(
        &pairs,
        opts.top.unwrap_or(ctx.config.top_correlations),
        opts.min_probability.unwrap_or(ctx.config.min_link_probability),
    );

    emit(
        ctx,
        ReportKind::Correlation,
        CorrelationReport {
            window_minutes,
            devices: by_device.keys().cloned().collect(),
            pairs,
        },
    )
}

fn cmd_alerts(
    ctx: &AppContext,
    records: &Path,
    by: AlertGrouping,
    home: Option<String>,
) -> Result<()> {
    let mut alerts: Vec<AlertRecord> = load_records(records)
        .with_context(|| format!("reading alerts from {}", records.display()))?;
    if let Some(home) = home {
        alerts.retain(|a| a.home_id.as_deref() == Some(home.as_str()));
    }

    let stats = match by {
        AlertGrouping::AlertType => summarize_distribution(&alerts, |a| a.alert_type.clone()),
        AlertGrouping::DeviceType => summarize_distribution(&alerts, |a| {
            a.device_type.clone().unwrap_or_else(|| "unknown".to_string())
        }),
    };

    emit(
        ctx,
        ReportKind::AlertDistribution,
        DistributionSummary::from_stats(stats),
    )
}

fn cmd_feedback(ctx: &AppContext, records: &Path) -> Result<()> {
    let feedback: Vec<FeedbackRecord> = load_records(records)
        .with_context(|| format!("reading feedback from {}", records.display()))?;

    let stats = summarize_with_resolution(&feedback, |f| f.device_type.clone(), |f| f.resolved);
    emit(
        ctx,
        ReportKind::FeedbackResolution,
        ResolutionSummary::from_stats(stats),
    )
}

fn cmd_area_usage(
    ctx: &AppContext,
    homes: &Path,
    devices: &Path,
    events: &Path,
    device_type: &str,
    days: Option<u32>,
    reference: Option<String>,
) -> Result<()> {
    let reference = reference_time(reference, ctx.config.timezone)?;
    let window = ObservationWindow::trailing_days(
        reference.with_timezone(&Utc),
        days.unwrap_or(ctx.config.lookback_days),
    )?;

    let homes: Vec<HomeRecord> = load_records(homes)
        .with_context(|| format!("reading homes from {}", homes.display()))?;
    let devices: Vec<DeviceRecord> = load_records(devices)
        .with_context(|| format!("reading devices from {}", devices.display()))?;
    let events = load_events(events, None)?;

    let samples = home_usage_samples(&homes, &devices, &events, device_type, &window);
    if samples.is_empty() {
        tracing::warn!(device_type, "no homes own a device of this type");
    }
    emit(ctx, ReportKind::AreaUsage, area_usage_correlation(samples))
}

fn cmd_config(ctx: &AppContext) -> Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", ctx.config_path);
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&ctx.config).context("serializing config")?
    );
    Ok(())
}
