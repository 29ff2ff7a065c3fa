use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use geoharvest_core::harvest::{HarvestOptions, HarvestSummary, execute_harvest};
use geoharvest_core::model::targets_for_sites;
use geoharvest_core::report::generate_harvest_report;
use geoharvest_core::sink::{GeoJsonSeqSink, prepare_output_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

// Helper functions for the harvest handler

/// Load sites from either a file or the comma separated `--sites` argument
pub fn load_sites_from_source(
    sites: Option<&String>,
    sites_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(sites_file_path) = sites_file {
        load_sites_from_file(sites_file_path)
    } else if let Some(sites) = sites {
        let parsed = parse_site_list(sites);
        if parsed.is_empty() {
            return Err(format!("No valid sites in '{}'", sites));
        }
        Ok(parsed)
    } else {
        Err("Either --sites or --sites-file must be provided".to_string())
    }
}

/// Split a comma separated site list, dropping blanks and invalid entries
pub fn parse_site_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|site| !site.is_empty())
        .filter_map(parse_site_line)
        .collect()
}

/// Load sites from a file, one per line. Blank lines and `#` comments are
/// skipped.
pub fn load_sites_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read sites file {}: {}", path.display(), e))?;

    let sites: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_site_line)
        .collect();

    if sites.is_empty() {
        return Err(format!("No valid sites found in {}", path.display()));
    }

    Ok(sites)
}

/// Parse one site. Bare names pass through; a full URL or hostname such as
/// `https://duluth.craigslist.org/` is reduced to its first label.
pub fn parse_site_line(line: &str) -> Option<String> {
    let host = if line.contains("://") {
        Url::parse(line)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    } else {
        Some(line.to_string())
    };

    let site = host
        .as_deref()
        .and_then(|h| h.split('.').next())
        .map(str::to_lowercase)
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));

    if site.is_none() {
        eprintln!("⚠️  Skipping invalid site '{}'", line);
    }
    site
}

/// Expand `~` in the output path
pub fn expand_output_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// Create the output directory and an empty dataset in it
pub fn open_sink(output: &Path) -> anyhow::Result<GeoJsonSeqSink> {
    prepare_output_dir(output)?;
    let sink = GeoJsonSeqSink::create(output)
        .with_context(|| format!("Failed to create dataset at {}", output.display()))?;
    Ok(sink)
}

fn print_outcome(summary: &HarvestSummary) {
    if summary.is_done() {
        println!(
            "{} Found {} points for this search!",
            "✓".green().bold(),
            summary.records_written.to_string().bright_white()
        );
    } else if let Some(ref error) = summary.error {
        eprintln!("{} Harvest aborted: {}", "✗".red().bold(), error);
        eprintln!(
            "{} {} point(s) written before the failure are kept",
            "ℹ".blue(),
            summary.records_written.to_string().bright_white()
        );
    }
}

pub async fn handle_harvest(matches: &ArgMatches) {
    init_tracing();

    let quiet = matches.get_flag("quiet");
    let raw_output = matches
        .get_one::<String>("output")
        .expect("clap requires --output");
    let output = expand_output_path(raw_output);
    let category = matches
        .get_one::<String>("category")
        .expect("clap supplies a default category");
    let query = matches
        .get_one::<String>("search")
        .map(String::as_str)
        .unwrap_or("");
    let domain = matches
        .get_one::<String>("domain")
        .expect("clap supplies a default domain");
    let concurrency = *matches.get_one::<usize>("concurrency").unwrap_or(&1);
    let timeout_secs = *matches.get_one::<u64>("timeout").unwrap_or(&30);

    let sites = match load_sites_from_source(
        matches.get_one::<String>("sites"),
        matches.get_one::<PathBuf>("sites-file"),
    ) {
        Ok(sites) => sites,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(2);
        }
    };

    debug!("Loaded {} site(s), writing to {}", sites.len(), output.display());

    if !quiet {
        print_divider();
        println!(
            "{} Searching {} site(s): {}",
            "→".blue(),
            sites.len().to_string().cyan(),
            sites.join(", ").bright_white()
        );
        println!("{} Section: {}", "→".blue(), category.bright_white());
        println!(
            "{} Query: {}",
            "→".blue(),
            if query.is_empty() { "(everything)" } else { query }.bright_white()
        );
        println!(
            "{} Output: {}",
            "→".blue(),
            output.display().to_string().bright_white()
        );
        print_divider();
        println!();
    }

    let mut sink = match open_sink(&output) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            std::process::exit(1);
        }
    };

    let options = HarvestOptions {
        targets: targets_for_sites(&sites, category, query),
        domain: domain.clone(),
        concurrency,
        timeout_secs,
        show_progress_bars: !quiet,
    };

    let summary = match execute_harvest(options, &mut sink, None).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("✗ Harvest failed: {}", e);
            std::process::exit(1);
        }
    };

    if !quiet {
        print!("{}", generate_harvest_report(&summary, &output));
        println!();
    }
    print_outcome(&summary);

    if !summary.is_done() {
        std::process::exit(1);
    }
}
