//! vision-cal - Brightness measurement and LightStrengthGain calibration
//!
//! CLI entry point

use clap::Parser;
use serde::Serialize;
use std::error::Error;
use std::io::{BufRead, Write};
use vision_cal::{
    create_progress_bar, exit_codes,
    export::{self, COLUMNS},
    load_gain_or_default, load_image,
    logging::setup_logging,
    now_timestamp, recommend, AnalysisScope, AnalyzeArgs, AppState, CalibrationError,
    CalibrationLocator, CalibrationStore, Checklist, ChecklistArgs, Cli, CliOverrides, Commands,
    Config, ConfigError, ExportError, GainCommand, GainRecommendation, HistogramError,
    HistoryCommand, HistoryError, ImageSourceError, LuminanceHistogram, MeasurementHistory,
    MeasurementRecord, RecommendArgs, RegionError, RegionStats, SessionError, Settings,
    DEFAULT_GAIN, TARGET_BRIGHTNESS,
};

type CmdResult = Result<(), Box<dyn Error>>;

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let result = load_settings(&cli).and_then(|settings| match &cli.command {
        Commands::Analyze(args) => run_analyze(args, &settings, cli.quiet),
        Commands::Recommend(args) => run_recommend(args),
        Commands::Gain { action } => run_gain(action, &settings, cli.quiet),
        Commands::History { action } => run_history(action, &settings, cli.quiet),
        Commands::Checklist(args) => run_checklist(args, &settings, cli.quiet),
        Commands::Info => run_info(&cli, &settings),
    });

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code_for(e.as_ref())
        }
    });
}

// ============ Helper Functions ============

/// Map an error to its exit code category
fn exit_code_for(err: &(dyn Error + 'static)) -> i32 {
    if let Some(e) = err.downcast_ref::<ImageSourceError>() {
        return match e {
            ImageSourceError::NotFound(_) => exit_codes::INPUT_NOT_FOUND,
            ImageSourceError::Decode { .. } => exit_codes::PROCESSING_ERROR,
        };
    }
    if err.is::<RegionError>() {
        return exit_codes::INVALID_ARGS;
    }
    if let Some(e) = err.downcast_ref::<SessionError>() {
        return match e {
            SessionError::Region(_) => exit_codes::INVALID_ARGS,
            _ => exit_codes::PROCESSING_ERROR,
        };
    }
    if err.is::<ConfigError>() {
        return exit_codes::CONFIG_ERROR;
    }
    if let Some(e) = err.downcast_ref::<CalibrationError>() {
        return match e {
            CalibrationError::OutOfRange(_) => exit_codes::INVALID_ARGS,
            _ => exit_codes::CONFIG_ERROR,
        };
    }
    if let Some(e) = err.downcast_ref::<HistoryError>() {
        return match e {
            HistoryError::NoSuchRecord(_) => exit_codes::INVALID_ARGS,
            HistoryError::InvalidGain(_) => exit_codes::PROCESSING_ERROR,
            _ => exit_codes::OUTPUT_ERROR,
        };
    }
    if let Some(e) = err.downcast_ref::<ExportError>() {
        return match e {
            ExportError::TemplateNotFound(_) => exit_codes::INPUT_NOT_FOUND,
            _ => exit_codes::OUTPUT_ERROR,
        };
    }
    if let Some(e) = err.downcast_ref::<HistogramError>() {
        return match e {
            HistogramError::PlotTooSmall(..) => exit_codes::CONFIG_ERROR,
            HistogramError::Save(_) => exit_codes::OUTPUT_ERROR,
        };
    }
    if err.is::<std::io::Error>() {
        return exit_codes::OUTPUT_ERROR;
    }
    exit_codes::GENERAL_ERROR
}

/// Create CLI overrides from global flags and the report template option
fn create_cli_overrides(cli: &Cli) -> CliOverrides {
    let mut overrides = CliOverrides::new();
    if let Some(base) = &cli.base_path {
        overrides = overrides.with_base_path(base);
    }
    if let Some(history) = &cli.history_file {
        overrides = overrides.with_history_path(history);
    }
    if let Commands::History {
        action: HistoryCommand::Report {
            template: Some(template),
            ..
        },
    } = &cli.command
    {
        overrides = overrides.with_report_template(template);
    }
    overrides
}

fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn Error>> {
    let file_config = Config::resolve(cli.config.as_deref())?;
    Ok(file_config.merge_with_cli(&create_cli_overrides(cli)))
}

/// Gain from the calibration store, or the default when it is unavailable
fn stored_gain(settings: &Settings) -> f64 {
    match CalibrationLocator::new(&settings.base_path).open() {
        Ok((_, store)) => load_gain_or_default(&store),
        Err(e) => {
            tracing::warn!(error = %e, default = DEFAULT_GAIN, "calibration store unavailable");
            DEFAULT_GAIN
        }
    }
}

// ============ Analyze Command ============

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    image: &'a str,
    width: u32,
    height: u32,
    scope: AnalysisScope,
    region: String,
    gain: f64,
    stats: &'a RegionStats,
    recommendation: &'a GainRecommendation,
}

fn run_analyze(args: &AnalyzeArgs, settings: &Settings, quiet: bool) -> CmdResult {
    let image = load_image(&args.image)?;
    let gain = args.gain.unwrap_or_else(|| stored_gain(settings));
    let state = AppState::new(gain).with_image(image);

    let state = if let Some(selection) = args.region {
        state.analyze_selection(selection)?
    } else if let Some(preset) = args.preset {
        state.analyze_preset(preset)?
    } else {
        state.analyze_full()?
    };

    let (image, analysis) = match (state.image(), state.analysis()) {
        (Some(image), Some(analysis)) => (image, analysis),
        _ => return Err("analysis produced no result".into()),
    };
    let (width, height) = image.dimensions();

    if args.json {
        let output = AnalyzeOutput {
            image: image.name(),
            width,
            height,
            scope: analysis.scope,
            region: analysis.region_label(),
            gain: state.gain(),
            stats: &analysis.stats,
            recommendation: &analysis.recommendation,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let stats = &analysis.stats;
        println!("Image: {} ({}x{})", image.name(), width, height);
        println!("Region: {}", analysis.region_label());
        println!("Average brightness: {:.2} / 255", stats.avg_brightness);
        println!("Std deviation: {:.2}", stats.std_brightness);
        println!(
            "Min / Max: {:.0} / {:.0}",
            stats.min_brightness, stats.max_brightness
        );
        println!("RGB average: {}", stats.rgb_summary());
        println!("LightStrengthGain: {:.2}", state.gain());
        println!();
        println!("{}", analysis.recommendation.text());
    }

    if let Some(path) = &args.histogram {
        let histogram = LuminanceHistogram::from_luminance(analysis.stats.luminance_map());
        histogram.save_plot(
            path,
            settings.histogram_width,
            settings.histogram_height,
            TARGET_BRIGHTNESS,
        )?;
        if !quiet && !args.json {
            println!(
                "{} written to {}",
                LuminanceHistogram::title(analysis.scope),
                path.display()
            );
            println!("  {}", histogram.legend(TARGET_BRIGHTNESS));
        }
    }

    if args.save {
        let mut history = MeasurementHistory::load(&settings.history_path)?;
        if let Some(record) = state.record(&now_timestamp()) {
            history.push(record);
        }
        history.save(&settings.history_path)?;
        if !quiet && !args.json {
            println!("Saved as measurement #{}", history.len());
        }
    }

    Ok(())
}

// ============ Recommend Command ============

fn run_recommend(args: &RecommendArgs) -> CmdResult {
    let scope = if args.full {
        AnalysisScope::WholeImage
    } else {
        AnalysisScope::SelectedRegion
    };
    let rec = recommend(args.brightness, TARGET_BRIGHTNESS, args.gain, scope);
    println!("{}", rec.text());
    Ok(())
}

// ============ Gain Command ============

fn run_gain(action: &GainCommand, settings: &Settings, quiet: bool) -> CmdResult {
    match action {
        GainCommand::Show => {
            let (camera, store) = CalibrationLocator::new(&settings.base_path).open()?;
            let gain = store.read_gain()?;
            println!("Camera: {}", camera.camera_name);
            println!("Document: {}", camera.path.display());
            println!("LightStrengthGain: {:.2}", gain);
        }
        GainCommand::Set { value } => {
            let mut history = MeasurementHistory::load(&settings.history_path)?;
            apply_gain(*value, settings, &mut history, quiet)?;
        }
    }

    Ok(())
}

/// Write a gain to the located camera document and log the write in the history
fn apply_gain(
    gain: f64,
    settings: &Settings,
    history: &mut MeasurementHistory,
    quiet: bool,
) -> CmdResult {
    let (camera, store) = CalibrationLocator::new(&settings.base_path).open()?;
    let previous = match store.read_gain() {
        Ok(previous) => format!("{:.2}", previous),
        Err(e) => {
            tracing::warn!(error = %e, "previous gain unreadable");
            "?".to_string()
        }
    };
    store.write_gain(gain)?;
    let stored = store.read_gain()?;
    println!(
        "LightStrengthGain updated: {} -> {:.2} ({})",
        previous, stored, camera.camera_name
    );

    history.push(MeasurementRecord::calibration_write(
        &now_timestamp(),
        &camera.camera_name,
        stored,
    ));
    history.save(&settings.history_path)?;
    if !quiet {
        println!("Recorded as measurement #{}", history.len());
    }
    Ok(())
}

// ============ History Command ============

fn run_history(action: &HistoryCommand, settings: &Settings, quiet: bool) -> CmdResult {
    let path = &settings.history_path;
    let mut history = MeasurementHistory::load(path)?;

    match action {
        HistoryCommand::List => {
            if history.is_empty() {
                println!("No measurements saved.");
            }
            for (idx, record) in history.records().iter().enumerate() {
                println!("{:>3}. {}", idx + 1, record.summary());
            }
        }
        HistoryCommand::Show { number } => {
            let record = history.get(*number)?;
            for (column, value) in COLUMNS.iter().zip(record.fields()) {
                let mut lines = value.lines();
                println!("{}: {}", column, lines.next().unwrap_or(""));
                for line in lines {
                    println!("    {}", line);
                }
            }
        }
        HistoryCommand::Apply { number } => {
            let gain = history.get(*number)?.gain_value()?;
            apply_gain(gain, settings, &mut history, quiet)?;
        }
        HistoryCommand::Clear => {
            let removed = history.len();
            history.clear();
            history.save(path)?;
            if !quiet {
                println!("Removed {} measurement(s)", removed);
            }
        }
        HistoryCommand::Export { output } => {
            export::export_xlsx(history.records(), output)?;
            if !quiet {
                println!("Exported {} measurement(s) to {}", history.len(), output.display());
            }
        }
        HistoryCommand::Report { output, .. } => {
            export::write_report(
                output,
                settings.report_template.as_deref(),
                history.records(),
                &now_timestamp(),
            )?;
            if !quiet {
                println!("Report written to {}", output.display());
            }
        }
    }

    Ok(())
}

// ============ Checklist Command ============

fn run_checklist(args: &ChecklistArgs, settings: &Settings, quiet: bool) -> CmdResult {
    let mut checklist = Checklist::new(settings.checklist.clone());

    if args.yes {
        checklist.check_all();
    } else {
        let entries: Vec<(usize, usize, String, String)> = checklist
            .categories()
            .iter()
            .enumerate()
            .flat_map(|(ci, cat)| {
                cat.items
                    .iter()
                    .enumerate()
                    .map(move |(ii, item)| (ci, ii, cat.name.clone(), item.clone()))
            })
            .collect();

        let stdin = std::io::stdin();
        let mut lines = stdin.lock().lines();
        for (ci, ii, category, item) in entries {
            print!("[{}] {}? [y/N] ", category, item);
            std::io::stdout().flush()?;
            let Some(answer) = lines.next().transpose()? else {
                println!();
                break;
            };
            let answer = answer.trim().to_ascii_lowercase();
            checklist.set(ci, ii, answer == "y" || answer == "yes")?;
        }
    }

    if !quiet {
        let pb = create_progress_bar(checklist.total() as u64);
        pb.set_position(checklist.checked_count() as u64);
        pb.finish_with_message(if checklist.is_complete() {
            "ready"
        } else {
            "incomplete"
        });
    }

    println!(
        "{}/{} items confirmed ({:.0}%)",
        checklist.checked_count(),
        checklist.total(),
        checklist.progress_percent()
    );

    if !checklist.is_complete() {
        let missing: Vec<String> = checklist
            .items()
            .filter(|item| !item.checked)
            .map(|item| format!("  - [{}] {}", item.category, item.label))
            .collect();
        println!("Not confirmed:");
        println!("{}", missing.join("\n"));
        return Err("checklist incomplete".into());
    }

    println!("All pre-flight checks confirmed.");
    Ok(())
}

// ============ Info Command ============

fn run_info(cli: &Cli, settings: &Settings) -> CmdResult {
    println!("vision-cal v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Config File Locations:");
    if let Some(path) = &cli.config {
        println!("  Explicit: {}", path.display());
    }
    for path in Config::search_paths() {
        let state = if path.exists() { "found" } else { "not found" };
        println!("  {} ({})", path.display(), state);
    }

    println!();
    println!("Calibration Store:");
    let locator = CalibrationLocator::new(&settings.base_path);
    println!("  Base path: {}", settings.base_path.display());
    println!("  General.xml: {}", locator.general_path().display());
    match locator.open() {
        Ok((camera, store)) => {
            println!("  Camera: {} ({})", camera.camera_name, camera.path.display());
            match store.read_gain() {
                Ok(gain) => println!("  LightStrengthGain: {:.2}", gain),
                Err(e) => println!("  LightStrengthGain: unavailable ({})", e),
            }
        }
        Err(e) => println!("  Camera: unavailable ({})", e),
    }

    println!();
    println!("History:");
    println!("  File: {}", settings.history_path.display());
    match MeasurementHistory::load(&settings.history_path) {
        Ok(history) => println!("  Measurements: {}", history.len()),
        Err(e) => println!("  Measurements: unreadable ({})", e),
    }

    println!();
    println!("Report Template:");
    match &settings.report_template {
        Some(path) => println!("  {}", path.display()),
        None => println!("  built-in"),
    }

    Ok(())
}
