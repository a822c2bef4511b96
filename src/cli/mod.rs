//! CLI command implementations for roadseg.
//!
//! Provides subcommand handlers for:
//! - `roadseg layer`: fetch, group, and print the segment layer
//! - `roadseg legend`: density bucket colors and ranges
//! - `roadseg health`: check backend, config, logs
//! - `roadseg stats`: summarize the fetch log
//! - `roadseg config show|init|set|reset`: configuration management

use anyhow::Result;
use colored::{ColoredString, Colorize};

use crate::analytics::logger;
use crate::analytics::reporter::{self, FetchStats};
use crate::config::{self, RoadsegConfig};
use crate::layer::{LayerSettings, SegmentLayer};
use crate::loader::{MapState, ReloadOutcome};
use crate::notify;
use crate::segments::{DensityBucket, Segment};
use crate::segments::density::LegendEntry;
use crate::source::{DateRange, FileSource, HttpSource, SegmentSource};

/// Output format for printing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    GeoJson,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            Some("geojson") => Self::GeoJson,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// roadseg layer
// ---------------------------------------------------------------------------

/// Options for `roadseg layer`.
#[derive(Debug, Clone)]
pub struct LayerOptions {
    pub date_range: Option<DateRange>,
    pub format: OutputFormat,
    /// Path to a saved response, `-` for stdin. `None` fetches from the backend.
    pub input: Option<String>,
    pub merged: bool,
}

/// Load the segment layer once and print it.
///
/// A failed load prints the notification and returns an error, so the
/// process exits non-zero without printing a partial layer.
pub fn run_layer(opts: &LayerOptions) -> Result<()> {
    let cfg = config::load();
    let range = opts.date_range.unwrap_or(cfg.backend.default_date_range);

    let source: Box<dyn SegmentSource> = match &opts.input {
        Some(arg) => Box::new(FileSource::from_arg(arg)),
        None => Box::new(HttpSource::from_config(&cfg.backend)),
    };

    let mut state = MapState::new(LayerSettings::from_config(&cfg), range);
    let (outcome, log_entry) = state.reload(source.as_ref(), range);

    if let Some(entry) = log_entry {
        logger::log_fetch(&cfg.logging, &entry);
    }
    for notification in state.drain_notifications() {
        notify::log_notification(&notification);
        notification.print();
    }

    if outcome == ReloadOutcome::Failed {
        anyhow::bail!("road segment layer was not built");
    }
    let Some(layer) = state.layer() else {
        anyhow::bail!("road segment layer was not built");
    };

    match (opts.merged, opts.format) {
        (false, OutputFormat::Table) => print_layer_table(layer),
        (false, OutputFormat::Json) => println!("{}", serde_json::to_string_pretty(layer)?),
        (false, OutputFormat::Csv) => print_layer_csv(layer),
        (_, OutputFormat::GeoJson) => println!("{}", serde_json::to_string_pretty(&layer.to_geojson())?),
        (true, OutputFormat::Table) => print_sections_table(layer),
        (true, OutputFormat::Json) => println!("{}", serde_json::to_string_pretty(&layer.sections)?),
        (true, OutputFormat::Csv) => print_sections_csv(&layer.sections),
    }

    Ok(())
}

fn print_layer_table(layer: &SegmentLayer) {
    println!(
        "{}",
        format!("Road Sections — {}", layer.date_range).bold().cyan()
    );
    println!("{}", "=".repeat(88));
    println!(
        "  {:>4} {:>5} {:>7} {:>9} {:>26} {:>12}  Time",
        "#", "Segs", "Issues", "Dist km", "Density", "Speed kn"
    );
    println!("  {}", "-".repeat(86));

    for (i, group) in layer.groups.iter().enumerate() {
        let speed = group
            .average_speed
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| "N/A".to_string());
        let line = format!(
            "  {:>4} {:>5} {:>7} {:>9.1} {:>26} {:>12}  {} - {}",
            group.index,
            group.segment_count,
            group.total_issues,
            group.total_distance_km(),
            group.density.to_string(),
            speed,
            group.start_time.format("%Y-%m-%d %H:%M:%S"),
            group.end_time.format("%H:%M:%S"),
        );

        let marker = bucket_swatch(group.bucket);
        if i % 2 == 0 {
            println!("{marker}{line}");
        } else {
            println!("{marker}{}", line.dimmed());
        }
    }

    println!();
    println!(
        "  {} segments in {} sections",
        format_number(layer.segment_count),
        format_number(layer.groups.len())
    );
}

fn print_layer_csv(layer: &SegmentLayer) {
    println!(
        "segment_index,group_index,start_lat,start_lon,end_lat,end_lon,color,total_issues,density,density_unit,average_speed,total_distance_km"
    );
    for p in &layer.polylines {
        let [start, end] = p.path;
        println!(
            "{},{},{},{},{},{},{},{},{:.3},{},{},{:.3}",
            p.segment_index,
            p.group_index,
            start[0],
            start[1],
            end[0],
            end[1],
            p.color,
            p.popup.total_issues,
            p.popup.density.value(),
            p.popup.density.unit_label(),
            p.popup
                .average_speed
                .map(|v| format!("{v:.3}"))
                .unwrap_or_default(),
            p.popup.total_distance_km,
        );
    }
}

fn print_sections_table(layer: &SegmentLayer) {
    println!(
        "{}",
        format!("Merged Road Sections — {}", layer.date_range).bold().cyan()
    );
    println!("{}", "=".repeat(72));
    for (section, group) in layer.sections.iter().zip(&layer.groups) {
        println!(
            "{}  ({:.6}, {:.6}) → ({:.6}, {:.6})  {} issues  {}",
            bucket_swatch(group.bucket),
            section.start_latitude,
            section.start_longitude,
            section.end_latitude,
            section.end_longitude,
            section.issue_count,
            group.density.to_string().dimmed(),
        );
    }
}

fn print_sections_csv(sections: &[Segment]) {
    println!(
        "start_lat,start_lon,end_lat,end_lon,start_time,end_time,issue_count,distance,average_speed"
    );
    for s in sections {
        println!(
            "{},{},{},{},{},{},{},{},{}",
            s.start_latitude,
            s.start_longitude,
            s.end_latitude,
            s.end_longitude,
            s.start_time.format("%Y-%m-%dT%H:%M:%S"),
            s.end_time.format("%Y-%m-%dT%H:%M:%S"),
            s.issue_count,
            s.distance.map(|d| d.to_string()).unwrap_or_default(),
            s.average_speed.map(|v| v.to_string()).unwrap_or_default(),
        );
    }
}

// ---------------------------------------------------------------------------
// roadseg legend
// ---------------------------------------------------------------------------

/// Print the density legend for the configured thresholds.
pub fn run_legend(format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let legend = cfg.density.legend();

    match format {
        OutputFormat::Json | OutputFormat::GeoJson => {
            println!("{}", serde_json::to_string_pretty(&legend)?)
        }
        OutputFormat::Csv => print_legend_csv(&legend),
        OutputFormat::Table => print_legend_table(&legend),
    }
    Ok(())
}

fn print_legend_table(legend: &[LegendEntry]) {
    println!("{}", "Road Segments".bold().cyan());
    for entry in legend {
        println!(
            "{} {:<10} {:<16} {}",
            bucket_swatch(entry.bucket),
            entry.bucket.to_string(),
            entry.label,
            entry.color.dimmed()
        );
    }
}

fn print_legend_csv(legend: &[LegendEntry]) {
    println!("bucket,color,label");
    for entry in legend {
        println!("{},{},{}", entry.bucket, entry.color, entry.label);
    }
}

// ---------------------------------------------------------------------------
// roadseg health
// ---------------------------------------------------------------------------

/// Check backend reachability, config files, and logs.
pub fn run_health() -> Result<()> {
    println!("{}", "roadseg Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();

    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.roadseg/config.toml found"
        } else {
            "not found (run `roadseg config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".roadseg.toml found"
        } else {
            "none (optional)"
        },
    );

    let source = HttpSource::from_config(&cfg.backend);
    match source.probe() {
        Ok(status) => print_health_item(
            "Backend",
            true,
            &format!("reachable at {} (HTTP {status})", source.base_url()),
        ),
        Err(e) => print_health_item("Backend", false, &format!("{e:#}")),
    }

    print_health_item(
        "Default date range",
        true,
        cfg.backend.default_date_range.as_query(),
    );

    let log_path = logger::fetch_log_path(&cfg.logging);
    let log_entries = log_path
        .as_deref()
        .filter(|p| p.exists())
        .map(|p| logger::read_entries(p).len());
    print_health_item(
        "Fetch log",
        log_entries.is_some(),
        &match log_entries {
            Some(n) => format!("{n} entries"),
            None if !cfg.logging.enabled => "disabled".to_string(),
            None => "no log file yet".to_string(),
        },
    );

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<20} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// roadseg stats
// ---------------------------------------------------------------------------

/// Summarize past loads from the fetch log.
pub fn run_stats(format: OutputFormat, days: Option<u32>) -> Result<()> {
    let cfg = config::load();
    let stats = reporter::compute_stats(&cfg.logging, days);

    if stats.total_loads == 0 {
        println!(
            "{}",
            "No data yet. Load a segment layer to see stats.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json | OutputFormat::GeoJson => print_stats_json(&stats)?,
        OutputFormat::Csv => print_stats_csv(&stats),
        OutputFormat::Table => print_stats_table(&stats),
    }
    Ok(())
}

fn print_stats_table(stats: &FetchStats) {
    println!("{}", "roadseg Fetch Report".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("  {} {}", "Loads:       ".bold(), format_number(stats.total_loads));
    println!(
        "  {} {} ({:.1}%)",
        "Failures:    ".bold(),
        stats.failures,
        stats.failure_pct
    );
    println!("  {} {:.1}", "Avg segments:".bold(), stats.avg_segments);
    println!("  {} {:.1}", "Avg sections:".bold(), stats.avg_groups);
    println!("  {} {:.0}ms", "Avg duration:".bold(), stats.avg_duration_ms);
    if let Some(err) = &stats.last_error {
        println!("  {} {}", "Last error:  ".bold(), truncate(err, 60).red());
    }
    println!();

    println!("{}", "By Date Range".bold().cyan());
    println!(
        "  {:<10} {:>6} {:>9} {:>12}",
        "Range", "Loads", "Failures", "Avg Segs"
    );
    println!("  {}", "-".repeat(40));
    for r in &stats.ranges {
        println!(
            "  {:<10} {:>6} {:>9} {:>12.1}",
            r.date_range.as_query(),
            r.loads,
            r.failures,
            r.avg_segments
        );
    }
}

fn print_stats_json(stats: &FetchStats) -> Result<()> {
    let value = serde_json::json!({
        "total_loads": stats.total_loads,
        "failures": stats.failures,
        "failure_pct": stats.failure_pct,
        "avg_segments": stats.avg_segments,
        "avg_groups": stats.avg_groups,
        "avg_duration_ms": stats.avg_duration_ms,
        "last_error": stats.last_error,
        "ranges": stats.ranges.iter().map(|r| serde_json::json!({
            "date_range": r.date_range,
            "loads": r.loads,
            "failures": r.failures,
            "avg_segments": r.avg_segments,
        })).collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_stats_csv(stats: &FetchStats) {
    println!("date_range,loads,failures,avg_segments");
    for r in &stats.ranges {
        println!(
            "{},{},{},{:.1}",
            r.date_range, r.loads, r.failures, r.avg_segments
        );
    }
}

// ---------------------------------------------------------------------------
// roadseg config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective roadseg Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source_line("~/.roadseg/config.toml", global_exists);
    print_source_line(".roadseg.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "ROADSEG_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source_line(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.roadseg/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Listen address for `roadseg serve`: the flag, else the config.
pub fn serve_addr(flag: Option<String>, cfg: &RoadsegConfig) -> String {
    flag.unwrap_or_else(|| cfg.web.addr.clone())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// A colored block in the bucket's stroke color.
fn bucket_swatch(bucket: DensityBucket) -> ColoredString {
    let (r, g, b) = hex_rgb(bucket.color()).unwrap_or((255, 255, 255));
    "■".truecolor(r, g, b)
}

/// Parse `#RRGGBB`.
fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Format a number with comma separators for readability.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
