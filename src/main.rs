use anyhow::Result;
use clap::{Parser, Subcommand};

use roadseg::source::DateRange;
use roadseg::{cli, config, web};

#[derive(Debug, Parser)]
#[command(name = "roadseg")]
#[command(about = "Group road segments into sections and color them by issue density")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch segments, group them into sections, and print the layer
    Layer {
        /// Date range filter: all, today, week, month (default from config)
        #[arg(long)]
        date_range: Option<DateRange>,
        /// Output format: table (default), json, csv, geojson
        #[arg(long, default_value = "table")]
        format: String,
        /// Read a saved segment array from FILE (`-` for stdin) instead of the backend
        #[arg(long)]
        input: Option<String>,
        /// Print one merged segment per section instead of every segment
        #[arg(long)]
        merged: bool,
    },
    /// Show the density legend: buckets, colors, ranges
    Legend {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Run the map viewer in a local web server
    Serve {
        /// Listen address (default from config: 127.0.0.1:9747)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Check system health: backend, config, fetch log
    Health,
    /// Show fetch statistics from the fetch log
    Stats {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        /// Only include the last N days of data
        #[arg(long)]
        days: Option<u32>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config to ~/.roadseg/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a value by dotted key, e.g. `backend.base_url`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Layer {
            date_range,
            format,
            input,
            merged,
        } => cli::run_layer(&cli::LayerOptions {
            date_range,
            format: cli::OutputFormat::from_str_opt(Some(&format)),
            input,
            merged,
        }),
        Commands::Legend { format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_legend(fmt)
        }
        Commands::Serve { addr } => {
            let cfg = config::load();
            let addr = cli::serve_addr(addr, &cfg);
            web::serve(cfg, &addr)
        }
        Commands::Health => cli::run_health(),
        Commands::Stats { format, days } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_stats(fmt, days)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
