use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tabled::{settings::Style, Table, Tabled};

use liftready::config::EngineConfig;
use liftready::error::{ErrorSeverity, LiftReadyError};
use liftready::export::{export_all, ExportFormat};
use liftready::import::{DailyCsvImporter, ImportFormat, ImportManager, WellnessValidator};
use liftready::logging::{init_logging, LogLevel, RunReport};
use liftready::models::{normalize_exercise, DailyMetrics, WellnessEntry};
use liftready::overload::OverloadVersion;
use liftready::personalization::{calculate_baselines, detect_fatigue_type, BaselineSet, PersonalizationConfig};
use liftready::pipeline::{Pipeline, PipelineOutput};
use liftready::readiness::{
    session_plan, zone, CycleAdjustment, ReadinessStrategy, ReadinessVersion, ReadinessZone, WellnessV3,
};

/// liftready - readiness and overload analysis for strength training
///
/// Recomputes daily readiness scores, training recommendations and
/// per-lift neuromuscular overload flags from a training log and a
/// wellness log.
#[derive(Parser)]
#[command(name = "liftready")]
#[command(version)]
#[command(about = "Readiness and overload analysis for strength training", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write every output table
    Run {
        /// Training log (date, exercise, sets, reps, weight, rpe, rir)
        #[arg(short, long)]
        training: PathBuf,

        /// Wellness log (date, sleep_hours, sleep_quality, ...)
        #[arg(short, long)]
        wellness: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Key lifts, comma separated (overrides the config)
        #[arg(short, long, value_delimiter = ',')]
        key_lifts: Vec<String>,

        /// Output format for the tables (csv, json)
        #[arg(short = 'f', long, default_value = "csv")]
        format: ExportFormat,

        /// Overload rule set (overrides the config)
        #[arg(long)]
        overload_version: Option<OverloadVersion>,

        /// Readiness formula (overrides the config)
        #[arg(long)]
        readiness_version: Option<ReadinessVersion>,

        /// Number of recent days to print
        #[arg(long, default_value = "7")]
        days: usize,

        /// Write a JSON run report to this path
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Check input files against the schema without computing anything
    Validate {
        #[arg(short, long)]
        training: PathBuf,

        #[arg(short, long)]
        wellness: Option<PathBuf>,
    },

    /// Instant readiness from a morning check-in
    Readiness {
        #[arg(long)]
        sleep_hours: f64,

        /// Sleep quality (1-5)
        #[arg(long, default_value = "3")]
        sleep_quality: f64,

        #[arg(long)]
        fatigue: Option<f64>,

        #[arg(long)]
        soreness: Option<f64>,

        #[arg(long)]
        stress: Option<f64>,

        #[arg(long)]
        motivation: Option<f64>,

        /// Subjective readiness (0-10)
        #[arg(long)]
        perceived: Option<f64>,

        #[arg(long)]
        pain: bool,

        #[arg(long)]
        pain_location: Option<String>,

        #[arg(long)]
        sick: bool,

        /// Energy (0-10)
        #[arg(long)]
        energy: Option<f64>,

        /// Stiffness (0-10)
        #[arg(long)]
        stiffness: Option<f64>,

        /// Day of the menstrual cycle (1 = first day of bleeding)
        #[arg(long)]
        cycle_day: Option<u8>,

        /// Cramping (0-5)
        #[arg(long)]
        cramping: Option<f64>,

        /// Bloating (0-5)
        #[arg(long)]
        bloating: Option<f64>,

        /// wellness_v1, wellness_v2 or wellness_v3
        #[arg(long, default_value = "wellness_v2")]
        version: ReadinessVersion,

        /// Daily table with history for a personal sleep baseline
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,
    },

    /// Show or create the configuration file
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long)]
        force: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = execute(cli) {
        let (message, severity) = match err.downcast_ref::<LiftReadyError>() {
            Some(e) => (e.user_message(), e.severity()),
            None => (format!("{:#}", err), ErrorSeverity::Error),
        };
        let label = match severity {
            ErrorSeverity::Warning => "warning:".yellow().bold(),
            _ => "error:".red().bold(),
        };
        eprintln!("{} {}", label, message);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from_file(path),
        None => Ok(EngineConfig::load_or_default()),
    }
}

fn execute(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    config.logging.level = LogLevel::from_verbosity(config.logging.level, cli.verbose);
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Run {
            training,
            wellness,
            out,
            key_lifts,
            format,
            overload_version,
            readiness_version,
            days,
            report,
        } => {
            if !key_lifts.is_empty() {
                let lifts: Vec<String> = key_lifts.iter().map(|l| normalize_exercise(l)).collect();
                config.overload.key_lifts = lifts.clone();
                config.daily.key_lifts = lifts;
            }
            if let Some(version) = overload_version {
                config.overload.version = version;
            }
            if let Some(version) = readiness_version {
                config.readiness.version = version;
            }

            let started = Instant::now();
            let mut run_report = RunReport::new("run");
            let result = run_pipeline(&config, &training, wellness.as_deref(), &out, format, &mut run_report);
            match &result {
                Ok(output) => {
                    run_report.finish(started.elapsed(), None);
                    print_summary(output, days);
                }
                Err(e) => run_report.finish(started.elapsed(), Some(&**e)),
            }
            if let Some(path) = report {
                run_report.save_to_file(&path)?;
            }
            result.map(|_| ())
        }

        Commands::Validate { training, wellness } => validate_inputs(&training, wellness.as_deref()),

        Commands::Readiness {
            sleep_hours,
            sleep_quality,
            fatigue,
            soreness,
            stress,
            motivation,
            perceived,
            pain,
            pain_location,
            sick,
            energy,
            stiffness,
            cycle_day,
            cramping,
            bloating,
            version,
            history,
        } => {
            let mut entry = WellnessEntry::new(Local::now().date_naive(), sleep_hours, sleep_quality);
            entry.fatigue = fatigue;
            entry.soreness = soreness;
            entry.stress = stress;
            entry.motivation = motivation;
            entry.perceived_readiness = perceived;
            entry.pain_flag = pain || pain_location.is_some();
            entry.pain_location = pain_location;
            entry.sick = sick;
            entry.energy = energy;
            entry.stiffness = stiffness;
            entry.cycle_day = cycle_day;
            entry.cramping = cramping;
            entry.bloating = bloating;
            instant_readiness(entry, version, history.as_deref(), &config.personalization)
        }

        Commands::Config { init, force, show } => {
            let path = cli.config.unwrap_or_else(EngineConfig::default_config_path);
            if init {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                let mut fresh = EngineConfig::default();
                fresh.save_to_file(&path)?;
                println!("{} {}", "✓ Wrote default configuration to".green(), path.display());
            }
            if show || !init {
                let content = toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", content);
            }
            Ok(())
        }
    }
}

fn run_pipeline(
    config: &EngineConfig,
    training: &Path,
    wellness: Option<&Path>,
    out: &Path,
    format: ExportFormat,
    report: &mut RunReport,
) -> Result<PipelineOutput> {
    println!("{}", "Running readiness pipeline...".blue().bold());
    report.add_context("overload_version", config.overload.version);
    report.add_context("readiness_version", config.readiness.version);

    let data = ImportManager::new()
        .with_progress(true)
        .import_inputs(training, wellness)
        .map_err(LiftReadyError::from)?;
    report.add_context("training_rows", data.sets.len());
    report.add_context("wellness_entries", data.wellness.len());
    if data.wellness.is_empty() {
        report.add_warning("No wellness data; sleep-based components are missing");
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Scoring readiness and overload...");
    let output = Pipeline::new(config.clone()).run(&data.sets, &data.wellness);
    spinner.finish_and_clear();
    let output = output?;

    let written = export_all(&output, out, format).map_err(LiftReadyError::from)?;
    report.add_context("output_dir", out.display());
    report.add_context("files_written", written.len());
    println!(
        "{} {} files written to {}",
        "✓".green(),
        written.len(),
        out.display()
    );
    Ok(output)
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Readiness")]
    readiness: String,
    #[tabled(rename = "Recommendation")]
    recommendation: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Overload")]
    overload: u32,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reasons")]
    reasons: String,
}

fn colored_score(score: Option<u32>) -> String {
    let text = score.map_or_else(|| "NA".to_string(), |s| s.to_string());
    match zone(score) {
        ReadinessZone::High => text.green().to_string(),
        ReadinessZone::Medium => text.yellow().to_string(),
        ReadinessZone::Low => text.red().to_string(),
        ReadinessZone::Unknown => text.dimmed().to_string(),
    }
}

fn print_summary(output: &PipelineOutput, days: usize) {
    let skip = output.readiness.len().saturating_sub(days);
    let rows: Vec<DayRow> = output
        .readiness
        .iter()
        .zip(&output.day_plans)
        .skip(skip)
        .map(|(record, plan)| DayRow {
            date: record.date.to_string(),
            readiness: colored_score(record.readiness_score),
            recommendation: record.recommendation.clone(),
            action: record.action_intensity.clone(),
            overload: record.overload_score,
            status: plan.day_status.to_string(),
            reasons: record.reasons_label(),
        })
        .collect();

    if rows.is_empty() {
        println!("{}", "No training days to report".yellow());
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    let advanced = output.overload.advanced_lifts();
    if !advanced.is_empty() {
        println!("{} {}", "Advanced lifts:".bold(), advanced.join(", "));
    }

    if let Some(latest) = &output.latest {
        println!("\n{} {}", "Latest day:".bold(), latest.date);
        if let Some(context) = &latest.context {
            println!("  Personal context: {} ({})", context.label, context.short);
        }
        if let Some(fatigue) = &latest.fatigue {
            println!(
                "  Fatigue: {} -> {} ({})",
                fatigue.fatigue_type.to_string().cyan(),
                fatigue.target_split,
                fatigue.intensity_hint
            );
        }
        if let Some(risk) = &latest.injury_risk {
            println!("  Injury risk: {} ({}) - {}", risk.risk_level, risk.score, risk.action);
        }
        println!("  Next week: {}", latest.weekly_plan.reasoning);
    }
}

fn validate_inputs(training: &Path, wellness: Option<&Path>) -> Result<()> {
    println!("{}", "Validating input files...".blue().bold());
    let manager = ImportManager::new();

    let sets = manager.import_training(training).map_err(LiftReadyError::from)?;
    let exercises: std::collections::BTreeSet<&str> = sets.iter().map(|s| s.exercise.as_str()).collect();
    println!(
        "{} {}: {} rows, {} exercises",
        "✓".green(),
        training.display(),
        sets.len(),
        exercises.len()
    );

    if let Some(path) = wellness {
        let entries = manager.import_wellness(path).map_err(LiftReadyError::from)?;
        println!("{} {}: {} entries", "✓".green(), path.display(), entries.len());
    }
    Ok(())
}

fn instant_readiness(
    entry: WellnessEntry,
    version: ReadinessVersion,
    history: Option<&Path>,
    personalization: &PersonalizationConfig,
) -> Result<()> {
    if version == ReadinessVersion::Objective {
        bail!("The objective formula needs the daily table; use `liftready run` instead");
    }
    WellnessValidator::validate_entry(1, &entry).map_err(LiftReadyError::from)?;

    let baselines: BaselineSet = match history {
        Some(path) => {
            let daily = DailyCsvImporter::new()
                .import_file(path)
                .map_err(LiftReadyError::from)?;
            calculate_baselines(&daily, &[], &[], personalization)
        }
        None => calculate_baselines(&[], &[], &[], personalization),
    };

    let mut day = DailyMetrics::empty(entry.date);
    day.sleep_hours = Some(entry.sleep_hours);
    day.sleep_quality = Some(entry.sleep_quality);
    day.perceived_readiness = entry.perceived_readiness;
    day.wellness = Some(entry.clone());

    let strategy: Box<dyn ReadinessStrategy> = match version {
        ReadinessVersion::WellnessV3 => Box::new(WellnessV3::from_baselines(&baselines)),
        other => other.strategy(),
    };
    let score = strategy.score(&day).context("Check-in could not be scored")?;
    let fatigue = detect_fatigue_type(&entry, &baselines, score);
    let session = session_plan(Some(score), Some(&entry));

    println!("{} {} ({})", "Readiness:".bold(), colored_score(Some(score)), zone(Some(score)));
    if let Some(cycle) = CycleAdjustment::from_entry(&entry) {
        println!("{} {} (day {})", "Cycle phase:".bold(), cycle.phase, cycle.day);
    }
    println!("{} {}", "Fatigue:".bold(), fatigue.fatigue_type.to_string().cyan());
    println!("  {}", fatigue.reason);
    println!("  Target: {} | {}", fatigue.target_split, fatigue.intensity_hint);
    for recommendation in &fatigue.recommendations {
        println!("  - {}", recommendation);
    }

    println!("{} {}", "Session:".bold(), session.headline);
    if let (Some(rir), Some(volume)) = (&session.target_rir, &session.volume_change) {
        println!("  RIR {} | {}", rir, volume);
    }
    if let Some(pain) = session.pain_zone {
        println!("  Pain ({}): avoid {}", pain.as_str(), session.avoid.join(", "));
        println!("  Usually fine: {}", session.allowed.join(", "));
    }
    for line in session.notes.iter().chain(&session.rules) {
        println!("  - {}", line);
    }
    Ok(())
}
