use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{Days, Local, NaiveDate};

use scoreline::catalog;
use scoreline::ids_fetch;
use scoreline::retry::RetryPolicy;
use scoreline::stats_fetch;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args: Vec<String> = std::env::args().skip(1).collect();

    let data_dir = arg_value(&args, "--data")
        .map(PathBuf::from)
        .or_else(|| opt_env("SCORELINE_DATA_DIR").map(PathBuf::from))
        .or_else(catalog::default_data_dir)
        .context("unable to resolve data dir")?;
    let ids_path = data_dir.join(catalog::MATCH_IDS_FILE);
    let stats_path = data_dir.join(catalog::MATCH_STATS_FILE);

    let existing = catalog::load_match_ids(&ids_path)?;

    let to = parse_date_arg(&args, "--to")?.unwrap_or_else(|| Local::now().date_naive());
    let from = match parse_date_arg(&args, "--from")? {
        Some(date) => date,
        None => resume_date(&existing)
            .ok_or_else(|| anyhow!("empty catalog, nothing to resume; pass --from YYYYMMDD"))?,
    };
    if from > to {
        return Err(anyhow!("--from {from} is after --to {to}"));
    }

    let leagues = parse_league_filter(&args);
    let policy = RetryPolicy::default();

    println!("Fetching match ids {from}..{to}");
    let range = ids_fetch::fetch_match_ids_range(from, to, leagues.as_deref(), &policy);
    println!("Dates: {}/{}", range.dates_succeeded, range.dates_total);

    let update = catalog::update_match_ids(existing, range.rows);
    catalog::save_match_ids(&ids_path, &update.rows)?;

    let stats_rows = catalog::load_stats(&stats_path)?;
    let have = catalog::stats_match_ids(&stats_rows);
    let mut wanted: Vec<u64> = update
        .rows
        .iter()
        .map(|r| r.match_id)
        .filter(|id| !have.contains(id))
        .collect();
    wanted.sort_unstable();
    wanted.dedup();

    println!("Fetching stats for {} matches", wanted.len());
    let batch = stats_fetch::fetch_stats_batch(&wanted, &policy);
    let mut melted = Vec::new();
    for stats in &batch.matches {
        melted.extend(stats_fetch::melt_match_stats(stats));
    }
    let appended = catalog::append_stats(&stats_path, melted)?;

    println!("Ingest complete");
    println!("Data: {}", data_dir.display());
    println!(
        "Catalog rows: {} ({} new)",
        update.rows.len(),
        update.added
    );
    println!("Stat rows appended: {appended}");

    let errors: Vec<&String> = range.errors.iter().chain(batch.errors.iter()).collect();
    if !errors.is_empty() {
        println!("  errors: {}", errors.len());
        for err in errors.iter().take(6) {
            println!("   - {err}");
        }
    }

    Ok(())
}

// Refetch a few days back from the newest catalogued kickoff so statuses
// corrected after the fact (abandonments, awarded results) are picked up.
fn resume_date(rows: &[ids_fetch::MatchIdRow]) -> Option<NaiveDate> {
    let latest = catalog::latest_utc_time(rows)?;
    let date = NaiveDate::parse_from_str(latest.get(..10)?, "%Y-%m-%d").ok()?;
    date.checked_sub_days(Days::new(3))
}

fn parse_date_arg(args: &[String], flag: &str) -> Result<Option<NaiveDate>> {
    let Some(raw) = arg_value(args, flag) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(Some)
        .with_context(|| format!("{flag} expects YYYYMMDD, got {raw:?}"))
}

fn parse_league_filter(args: &[String]) -> Option<Vec<u32>> {
    let raw = arg_value(args, "--leagues")
        .map(str::to_string)
        .or_else(|| opt_env("SCORELINE_LEAGUES"))?;
    let ids: Vec<u32> = raw
        .split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .collect();
    if ids.is_empty() { None } else { Some(ids) }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            return iter.next().map(String::as_str);
        }
        if let Some(rest) = arg.strip_prefix(flag) {
            if let Some(value) = rest.strip_prefix('=') {
                return Some(value);
            }
        }
    }
    None
}

fn opt_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|val| !val.trim().is_empty())
}
