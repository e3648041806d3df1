use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kiai::analyzer;
use kiai::cache;
use kiai::format;
use kiai::models::{BeatmapReport, SetResult};
use kiai::AnalysisConfig;

#[derive(Parser)]
#[command(name = "kiai", version, about = "BPM section and kiai interval analyzer for osu! beatmaps")]
struct Cli {
    /// Beatmap file, beatmap set directory, or "-" for STDIN
    path: Option<String>,

    /// Output as JSON instead of table
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output as CSV instead of table
    #[arg(long)]
    csv: bool,

    /// Launch interactive TUI
    #[arg(long)]
    tui: bool,

    /// Number of parallel analysis jobs (default: number of CPU cores)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Re-analyze even if a cached report exists
    #[arg(long)]
    regenerate: bool,

    /// Analyze all immediate subdirectories as separate beatmap sets
    #[arg(long)]
    bulk: bool,

    /// Write a text report (kiai_report.txt) alongside JSON
    #[arg(long)]
    txt: bool,

    /// Largest gap in milliseconds between kiai intervals that still merges them
    #[arg(long, value_name = "MS")]
    merge_threshold: Option<u32>,

    /// TOML config file with analysis settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn render_single(&self, report: &BeatmapReport, merge_threshold_ms: u32) -> String {
        if self.json {
            format::format_json_single(report)
        } else if self.csv {
            format::format_csv(&SetResult {
                beatmaps: vec![report.clone()],
                set_name: None,
                merge_threshold_ms,
            })
        } else {
            format::format_table_single(report)
        }
    }

    fn render_set(&self, result: &SetResult) -> String {
        if self.json {
            format::format_json(result)
        } else if self.csv {
            format::format_csv(result)
        } else {
            format::format_table(result)
        }
    }
}

fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "kiai=info",
        1 => "kiai=debug",
        _ => "kiai=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Flag value wins over the config file, which wins over the built-in default.
fn resolve_merge_threshold(cli: &Cli) -> Result<u32> {
    let config = match cli.config {
        Some(ref path) => AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    Ok(cli.merge_threshold.unwrap_or(config.merge_threshold_ms))
}

fn log_benchmark(result: &SetResult, elapsed: std::time::Duration) {
    let total_bytes: u64 = result.beatmaps.iter().map(|b| b.file_bytes).sum();
    let total_kb = total_bytes as f64 / 1024.0;

    info!(
        "Processed {} beatmaps ({:.1} KB) in {:.3}s",
        result.beatmaps.len(),
        total_kb,
        elapsed.as_secs_f64(),
    );
}

fn run_bulk(
    base_path: &Path,
    jobs: usize,
    merge_threshold_ms: u32,
    write_json: bool,
    write_txt: bool,
    regenerate: bool,
) -> Result<()> {
    let mut subdirs: Vec<_> = std::fs::read_dir(base_path)
        .with_context(|| format!("Failed to read directory: {}", base_path.display()))?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            if entry.path().is_dir() {
                Some(entry.path())
            } else {
                None
            }
        })
        .collect();

    subdirs.sort();

    if subdirs.is_empty() {
        anyhow::bail!("No subdirectories found in '{}'", base_path.display());
    }

    let total = subdirs.len();
    let mut analyzed = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for (i, subdir) in subdirs.iter().enumerate() {
        let set_name = subdir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| subdir.display().to_string());

        if !regenerate && cache::reports_exist(subdir, write_json, write_txt, merge_threshold_ms) {
            info!("[{}/{}] Skipping (reports exist): {}", i + 1, total, set_name);
            skipped += 1;
            continue;
        }

        info!("[{}/{}] Analyzing: {}", i + 1, total, set_name);

        match analyzer::analyze_directory(subdir, jobs, merge_threshold_ms) {
            Ok(result) => {
                if write_json {
                    if let Err(e) = cache::save_report(subdir, &result) {
                        warn!("Failed to save JSON report: {}", e);
                    }
                }
                if write_txt {
                    if let Err(e) = cache::save_text_report(subdir, &format::format_table(&result)) {
                        warn!("Failed to save text report: {}", e);
                    }
                }
                analyzed += 1;
            }
            Err(e) => {
                warn!("Failed to analyze {}: {}", set_name, e);
                failed += 1;
            }
        }
    }

    info!(
        "Done: {} analyzed, {} skipped, {} failed (out of {} total)",
        analyzed, skipped, failed, total
    );

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.bulk && cli.tui {
        anyhow::bail!("--bulk and --tui cannot be used together");
    }
    if cli.bulk && !cli.json && !cli.txt {
        anyhow::bail!("--bulk requires at least one output format: --json and/or --txt");
    }

    let merge_threshold_ms = resolve_merge_threshold(&cli)?;
    let jobs = cli.jobs.unwrap_or_else(analyzer::default_jobs);
    let path_str = cli.path.as_deref().unwrap_or(".");

    // STDIN mode
    if path_str == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read beatmap from STDIN")?;
        let report = analyzer::analyze_text(&text, "stdin", merge_threshold_ms);
        println!("{}", cli.render_single(&report, merge_threshold_ms));
        return Ok(());
    }

    let path = Path::new(path_str);

    // Single file mode
    if path.is_file() {
        let report = analyzer::analyze_file(path, merge_threshold_ms)
            .with_context(|| format!("Failed to analyze {}", path.display()))?;
        println!("{}", cli.render_single(&report, merge_threshold_ms));
        return Ok(());
    }

    // Directory mode
    if path.is_dir() {
        if cli.tui {
            return kiai::tui::run(path, jobs, merge_threshold_ms, cli.regenerate);
        }

        if cli.bulk {
            return run_bulk(path, jobs, merge_threshold_ms, cli.json, cli.txt, cli.regenerate);
        }

        // Check for cached report
        if !cli.regenerate {
            if let Some(cached) = cache::load_cached_report(path, merge_threshold_ms) {
                info!("Loaded from cached report");
                println!("{}", cli.render_set(&cached));
                return Ok(());
            }
        }

        let start = Instant::now();
        let result = analyzer::analyze_directory(path, jobs, merge_threshold_ms)?;
        let elapsed = start.elapsed();

        // Auto-save cache
        if let Err(e) = cache::save_report(path, &result) {
            warn!("Failed to save cache: {}", e);
        }

        if cli.txt {
            if let Err(e) = cache::save_text_report(path, &format::format_table(&result)) {
                warn!("Failed to save text report: {}", e);
            }
        }

        println!("{}", cli.render_set(&result));

        log_benchmark(&result, elapsed);

        return Ok(());
    }

    anyhow::bail!("Path '{}' is not a file or directory", path_str);
}
