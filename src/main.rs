//! GreenTwin CLI
//!
//! Manage tracked plants, apply stress events, and run leaf images through the
//! disease pipeline against a local JSON store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use tracing::info;

use greentwin::backend::backend_name;
use greentwin::twin::health_score_for;
use greentwin::utils::format_percent;
use greentwin::utils::logging::{init_logging, LogConfig};
use greentwin::{
    DueReminderCheck, GreenTwinConfig, JsonFileStore, PlantCareService, PlantLog, PlantRecord,
    PlantState, ReminderScheduler,
};

/// GreenTwin plant care tracker
///
/// Keeps a digital twin of each plant's condition and folds disease
/// predictions from leaf photos into it.
#[derive(Parser, Debug)]
#[command(name = "greentwin")]
#[command(version)]
#[command(about = "Digital twin plant care tracker", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// JSON configuration file
    #[arg(short, long, env = "GREENTWIN_CONFIG")]
    config: Option<PathBuf>,

    /// Plant store file (overrides the configured path)
    #[arg(short, long, env = "GREENTWIN_STORE")]
    store: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a new plant
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Species
        #[arg(short, long)]
        species: String,
    },

    /// List all plants
    List,

    /// Show one plant and its twin state
    Show {
        /// Plant id
        id: u64,
    },

    /// Delete a plant and its twin state
    Remove {
        /// Plant id
        id: u64,
    },

    /// Add a growth-log note, or list the log when no note is given
    Log {
        /// Plant id
        id: u64,

        /// Note text
        note: Option<String>,
    },

    /// Apply water/heat stress deltas
    Stress {
        /// Plant id
        id: u64,

        /// Water stress delta (may be negative)
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        water: f64,

        /// Heat stress delta (may be negative)
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        heat: f64,
    },

    /// Classify a leaf image and update the plant's twin
    Diagnose {
        /// Plant id
        id: u64,

        /// Leaf image (jpg/png)
        image: PathBuf,
    },

    /// Classify a leaf image without touching any plant
    Classify {
        /// Leaf image (jpg/png)
        image: PathBuf,
    },

    /// Compute a health score from raw stress values
    Score {
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        water: f64,

        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        heat: f64,

        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        risk: f64,
    },

    /// Run the reminder scheduler until Ctrl+C
    Reminders {
        /// Minutes between checks (overrides the configured interval)
        #[arg(short, long)]
        interval_minutes: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    let mut config = GreenTwinConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(store) = cli.store {
        config.store_path.0 = store;
    }

    match cli.command {
        Commands::Add { name, species } => {
            let mut service = open_service(&config)?;
            let plant = service.create_plant(&name, &species)?;
            println!(
                "{} {} (id {})",
                "Created".green().bold(),
                plant.name,
                plant.id
            );
        }

        Commands::List => {
            let service = open_service(&config)?;
            cmd_list(&service.list_plants()?);
        }

        Commands::Show { id } => {
            let service = open_service(&config)?;
            print_plant(&service.get_plant(id)?);
        }

        Commands::Remove { id } => {
            let mut service = open_service(&config)?;
            service.delete_plant(id)?;
            println!("{} plant {}", "Removed".yellow().bold(), id);
        }

        Commands::Log { id, note } => {
            let mut service = open_service(&config)?;
            match note {
                Some(note) => {
                    service.add_log(id, &note)?;
                    println!("{} note for plant {}", "Logged".green().bold(), id);
                }
                None => print_logs(&service.list_logs(id)?),
            }
        }

        Commands::Stress { id, water, heat } => {
            let mut service = open_service(&config)?;
            let state = service.apply_stress(id, water, heat)?;
            println!("{}", "Stress applied".cyan().bold());
            print_state(&state);
        }

        Commands::Diagnose { id, image } => {
            cmd_diagnose(&config, id, &image)?;
        }

        Commands::Classify { image } => {
            cmd_classify(&config, &image)?;
        }

        Commands::Score { water, heat, risk } => {
            let score = health_score_for(water, heat, risk);
            println!("Health score: {}", colored_health(score));
        }

        Commands::Reminders { interval_minutes } => {
            if let Some(minutes) = interval_minutes {
                config.reminders.interval_minutes = minutes;
            }
            config.reminders.validate()?;
            cmd_reminders(config.reminders.interval())?;
        }
    }

    Ok(())
}

fn open_service(config: &GreenTwinConfig) -> Result<PlantCareService<JsonFileStore>> {
    let store = JsonFileStore::open(&config.store_path.0)
        .with_context(|| format!("Failed to open store {:?}", config.store_path.0))?;
    Ok(PlantCareService::from_config(store, config))
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image {:?}", path))
}

fn cmd_list(plants: &[PlantRecord]) {
    if plants.is_empty() {
        println!("{}", "No plants yet. Add one with `greentwin add`.".yellow());
        return;
    }

    println!(
        "{}",
        format!("{:>4}  {:<24} {:<28} {:>8}", "ID", "NAME", "SPECIES", "HEALTH").bold()
    );
    for plant in plants {
        println!(
            "{:>4}  {:<24} {:<28} {:>8}",
            plant.id,
            plant.name,
            plant.species,
            colored_health(plant.state.health_score())
        );
    }
}

fn cmd_diagnose(config: &GreenTwinConfig, id: u64, image: &Path) -> Result<()> {
    let bytes = read_image(image)?;
    let mut service = open_service(config)?;

    info!("Diagnosing plant {} from {:?}", id, image);
    println!("{}", "Diagnosis:".cyan().bold());
    println!("  Classifier: {} ({})", service.classifier().name(), backend_name());

    let diagnosis = service.diagnose(id, &bytes)?;

    println!(
        "  Label:      {} ({})",
        diagnosis.classification.label.bold(),
        format_percent(diagnosis.classification.confidence)
    );
    if diagnosis.overridden {
        println!(
            "  {} classifier said {}, leaf is mostly green",
            "Overridden:".yellow(),
            diagnosis.raw_label
        );
    }
    if let Some(ratio) = diagnosis.green_ratio {
        println!("  Green:      {}", format_percent(ratio));
    }
    println!();
    print_state(&diagnosis.state);

    Ok(())
}

fn cmd_classify(config: &GreenTwinConfig, image: &Path) -> Result<()> {
    let bytes = read_image(image)?;
    let service = open_service(config)?;

    let (result, outcome) = service.classify_image(&bytes)?;

    println!("{}", "Classification:".cyan().bold());
    println!("  Classifier: {}", service.classifier().name());
    println!(
        "  Label:      {} ({})",
        result.label.bold(),
        format_percent(result.confidence)
    );
    if outcome.overridden {
        println!("  {}", "Label replaced by the color heuristic".yellow());
    }

    Ok(())
}

fn cmd_reminders(interval: Duration) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let mut scheduler = ReminderScheduler::new(interval, Arc::new(DueReminderCheck::new()));
        scheduler.start()?;

        println!(
            "{} every {:?}. Press Ctrl+C to stop.",
            "Checking reminders".green().bold(),
            interval
        );

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;

        info!("Shutdown signal received");
        scheduler.stop().await;
        Ok::<(), anyhow::Error>(())
    })
}

fn print_plant(plant: &PlantRecord) {
    println!("{} {}", plant.name.bold(), format!("#{}", plant.id).dimmed());
    println!("  Species:  {}", plant.species);
    println!("  Created:  {}", plant.created_at.format("%Y-%m-%d %H:%M UTC"));
    print_state(&plant.state);
    if !plant.logs.is_empty() {
        println!();
        print_logs(&plant.logs);
    }
}

fn print_logs(logs: &[PlantLog]) {
    if logs.is_empty() {
        println!("{}", "No log entries.".yellow());
        return;
    }

    println!("{}", "Growth log:".cyan().bold());
    for entry in logs {
        let when = entry.logged_at.format("%Y-%m-%d %H:%M");
        match &entry.diagnosis {
            Some(d) => println!(
                "  {}  {} ({}), health {}",
                when,
                d.label,
                format_percent(d.confidence),
                colored_health(d.health_score)
            ),
            None => println!("  {}  {}", when, entry.note),
        }
    }
}

fn print_state(state: &PlantState) {
    println!("  Health:        {}", colored_health(state.health_score()));
    println!("  Water stress:  {:.2}", state.water_stress());
    println!("  Heat stress:   {:.2}", state.heat_stress());
    println!("  Disease risk:  {:.2}", state.disease_risk_index());
    println!(
        "  Updated:       {}",
        state.last_updated().format("%Y-%m-%d %H:%M:%S UTC")
    );
}

fn colored_health(score: f64) -> ColoredString {
    let text = format!("{:.1}", score);
    if score >= 75.0 {
        text.green()
    } else if score >= 40.0 {
        text.yellow()
    } else {
        text.red()
    }
}
