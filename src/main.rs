use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tabled::{Table, Tabled};

use cgmrs::config::AppConfig;
use cgmrs::engine::AnalysisEngine;
use cgmrs::iob::{LinearDecayIob, NoInsulin};
use cgmrs::logging::{init_logging, LogLevel};
use cgmrs::models::{GlucoseReading, GlucoseSeries, InsulinDoseEvent};
use cgmrs::{A1cEstimator, DawnPhenomenonDetector, StatisticsEngine, TrendPredictor, VariabilityAnalyzer};

/// cgmrs - CGM Analytics CLI
///
/// Analyzes continuous glucose monitor data: descriptive statistics,
/// variability indices, dawn phenomenon detection, short-horizon trend
/// prediction, and A1C estimation.
#[derive(Parser)]
#[command(name = "cgmrs")]
#[command(version = "0.1.0")]
#[command(about = "CGM Analytics CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Readings as a JSON array of {timestamp, value_mg_dl, ...}
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Insulin doses as a JSON array of {timestamp, units, kind}
    #[arg(short, long, value_name = "FILE")]
    doses: Option<PathBuf>,

    /// Emit the raw report as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Descriptive statistics: mean, SD, CV, time in range
    Stats,

    /// Variability indices: MAG, J-Index, ADRR, hourly patterns
    Variability,

    /// Dawn phenomenon detection over recent days
    Dawn {
        /// Calendar days to look back over
        #[arg(short = 'n', long, default_value = "14")]
        days: usize,
    },

    /// Short-horizon glucose prediction with risk alerts
    Predict,

    /// Estimated A1C with monthly trend
    A1c,

    /// Run every analyzer and print a combined summary
    Summary,
}

#[derive(Tabled)]
struct HourlyRow {
    #[tabled(rename = "Hour")]
    hour: u32,
    #[tabled(rename = "Readings")]
    count: usize,
    #[tabled(rename = "Avg mg/dL")]
    average: String,
    #[tabled(rename = "In Range %")]
    in_range: String,
}

#[derive(Tabled)]
struct DawnDayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Midnight")]
    midnight: String,
    #[tabled(rename = "Early AM")]
    early: String,
    #[tabled(rename = "Waking")]
    waking: String,
    #[tabled(rename = "Rise")]
    rise: String,
    #[tabled(rename = "Dawn?")]
    dawn: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.logging.level = match cli.verbose {
        0 => config.logging.level,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    init_logging(&config.logging)?;

    let series = load_series(&cli.input)?;
    let doses = match &cli.doses {
        Some(path) => load_doses(path)?,
        None => Vec::new(),
    };

    match cli.command {
        Commands::Stats => {
            let report = StatisticsEngine::compute_statistics(&series)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("{}", "GLUCOSE STATISTICS".green().bold());
            println!("  Readings:           {}", report.reading_count);
            println!("  Average:            {:.1} mg/dL", report.average);
            println!("  Min / Max:          {:.0} / {:.0} mg/dL", report.min, report.max);
            println!("  Std deviation:      {:.1} mg/dL", report.standard_deviation);
            println!("  CV:                 {:.1}%", report.coefficient_of_variation);
            println!("  Time in range:      {:.1}%", report.time_in_range_percent);
        }

        Commands::Variability => {
            let report = VariabilityAnalyzer::compute_variability(&series);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("{}", "GLYCEMIC VARIABILITY".blue().bold());
            match report.mag {
                Some(mag) => println!("  MAG:     {:.2} mg/dL per reading", mag),
                None => println!("  MAG:     not enough readings"),
            }
            println!("  J-Index: {:.2}", report.j_index);
            println!("  ADRR:    {:.2}", report.adrr);
            println!();
            let rows: Vec<HourlyRow> = report
                .hourly_patterns
                .iter()
                .filter(|p| p.count > 0)
                .map(|p| HourlyRow {
                    hour: p.hour,
                    count: p.count,
                    average: format!("{:.1}", p.average),
                    in_range: format!("{:.1}", p.in_range_percent),
                })
                .collect();
            println!("{}", Table::new(rows));
        }

        Commands::Dawn { days } => {
            let report = DawnPhenomenonDetector::analyze_dawn_phenomenon(&series, days)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("{}", "DAWN PHENOMENON".cyan().bold());
            println!(
                "  {} of {} classifiable days affected ({:.0}%)",
                report.dawn_phenomenon_days, report.valid_days, report.dawn_phenomenon_percentage
            );
            println!("  Average rise: {:.1} mg/dL", report.average_dawn_rise);
            println!("  Max rise:     {:.1} mg/dL", report.max_dawn_rise);
            println!("  Severity:     {}", report.severity.to_string().bold());
            println!("  Trend:        {:?}", report.recent_trend);
            println!();
            let fmt = |v: Option<f64>| match v {
                Some(x) => format!("{:.0}", x),
                None => "-".to_string(),
            };
            let rows: Vec<DawnDayRow> = report
                .days
                .iter()
                .map(|d| DawnDayRow {
                    date: d.date.to_string(),
                    midnight: fmt(d.midnight),
                    early: fmt(d.early_morning),
                    waking: fmt(d.waking),
                    rise: fmt(d.dawn_rise),
                    dawn: if d.has_dawn_phenomenon { "yes" } else { "no" }.to_string(),
                })
                .collect();
            println!("{}", Table::new(rows));
            println!();
            for rec in &report.recommendations {
                println!("  {} {}", "-".dimmed(), rec);
            }
        }

        Commands::Predict => {
            let iob = LinearDecayIob::new(doses);
            let predictor = TrendPredictor::with_config(config.analysis.predictor.clone());
            match predictor.predict(&series, &iob) {
                None => println!("{}", "Not enough readings to predict yet.".yellow()),
                Some(report) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                        return Ok(());
                    }
                    println!("{}", "GLUCOSE FORECAST".magenta().bold());
                    println!(
                        "  Predicted in {} min: {:.0} mg/dL ({})",
                        report.time_horizon_minutes, report.predicted_glucose, report.trend
                    );
                    println!("  Confidence: {:.0}%", report.confidence);
                    println!(
                        "  Factors: slope {:+.2}/step, IOB {:+.1}, pattern {:+.1}",
                        report.factors.current_trend,
                        report.factors.iob_impact,
                        report.factors.pattern_influence
                    );
                    for alert in &report.alerts {
                        println!("  {} {}", "!".red().bold(), alert.message.red());
                    }
                }
            }
        }

        Commands::A1c => {
            let report = A1cEstimator::estimate_a1c(&series)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("{}", "ESTIMATED A1C".yellow().bold());
            println!("  Estimated A1C:   {:.1}% ({})", report.estimated_a1c, report.category);
            println!("  Average glucose: {:.1} mg/dL", report.average_glucose);
            if let Some(change) = report.period_change_percent {
                println!("  Last period:     {:+.1}%", change);
            }
            for point in &report.trend_series {
                println!(
                    "    {}  {:.1}%  ({} readings)",
                    point.period, point.estimated_a1c, point.reading_count
                );
            }
            println!("  {}", report.recommendation);
        }

        Commands::Summary => {
            let engine = AnalysisEngine::with_config(config.analysis.clone());
            let report = if doses.is_empty() {
                engine.analyze(&series, &NoInsulin)
            } else {
                engine.analyze(&series, &LinearDecayIob::new(doses))
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("{}", "CGM ANALYSIS SUMMARY".white().bold());
            match &report.statistics {
                Some(s) => println!(
                    "  Average {:.1} mg/dL, TIR {:.1}% over {} readings",
                    s.average, s.time_in_range_percent, s.reading_count
                ),
                None => println!("  No readings in window."),
            }
            if let Some(mag) = report.variability.mag {
                println!("  MAG {:.1}, J-Index {:.1}, ADRR {:.1}", mag, report.variability.j_index, report.variability.adrr);
            }
            match &report.dawn_phenomenon {
                Some(d) => println!("  Dawn phenomenon: {} ({:.0}% of days)", d.severity, d.dawn_phenomenon_percentage),
                None => println!("  Dawn phenomenon: not enough data yet"),
            }
            match &report.prediction {
                Some(p) => println!(
                    "  Forecast: {:.0} mg/dL in {} min ({})",
                    p.predicted_glucose, p.time_horizon_minutes, p.trend
                ),
                None => println!("  Forecast: not enough data yet"),
            }
            match &report.a1c {
                Some(a) => println!("  Estimated A1C: {:.1}% ({})", a.estimated_a1c, a.category),
                None => println!("  Estimated A1C: not enough data yet"),
            }
        }
    }

    Ok(())
}

/// Load a JSON array of readings. Pre-normalized input only; parsing of
/// vendor exports lives in the ingestion tooling, not here.
fn load_series(path: &PathBuf) -> Result<GlucoseSeries> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading input file {}", path.display()))?;
    let readings: Vec<GlucoseReading> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing readings from {}", path.display()))?;
    Ok(GlucoseSeries::new(readings))
}

fn load_doses(path: &PathBuf) -> Result<Vec<InsulinDoseEvent>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading doses file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing insulin doses from {}", path.display()))
}
