use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{Days, Local, NaiveDate};

use scoreline::catalog;
use scoreline::outcome;
use scoreline::poisson_gamma::{self, PoissonGammaConfig};
use scoreline::samples::team_metric_sample;

const DEFAULT_WINDOW_DAYS: u64 = 365;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args: Vec<String> = std::env::args().skip(1).collect();

    let home_id = parse_u32_arg(&args, "--home")?
        .ok_or_else(|| anyhow!("missing --home <team_id>"))?;
    let away_id = parse_u32_arg(&args, "--away")?
        .ok_or_else(|| anyhow!("missing --away <team_id>"))?;
    let metric = arg_value(&args, "--metric").unwrap_or("goals");

    let data_dir = arg_value(&args, "--data")
        .map(PathBuf::from)
        .or_else(|| opt_env("SCORELINE_DATA_DIR").map(PathBuf::from))
        .or_else(catalog::default_data_dir)
        .context("unable to resolve data dir")?;

    let to = parse_date_arg(&args, "--to")?.unwrap_or_else(|| Local::now().date_naive());
    let from = match parse_date_arg(&args, "--from")? {
        Some(date) => date,
        None => to
            .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
            .ok_or_else(|| anyhow!("--to {to} is out of range"))?,
    };

    let defaults = PoissonGammaConfig::default();
    let cfg = PoissonGammaConfig {
        limit: parse_usize_arg(&args, "--limit")?.unwrap_or(defaults.limit),
        alpha: parse_f64_arg(&args, "--alpha")?.unwrap_or(defaults.alpha),
        beta: parse_f64_arg(&args, "--beta")?.unwrap_or(defaults.beta),
    };

    let stats_path = data_dir.join(catalog::MATCH_STATS_FILE);
    let rows = catalog::load_stats(&stats_path)?;
    if rows.is_empty() {
        return Err(anyhow!(
            "no stats at {}; run the ingest binary first",
            stats_path.display()
        ));
    }

    let metric_for = format!("{metric}_for");
    let metric_ag = format!("{metric}_ag");

    // Each side's scoring rate is estimated from what it produced pooled
    // with what its opponent conceded, the two views of the same rate.
    let home_sample = poisson_gamma::pool(
        &team_metric_sample(&rows, home_id, &metric_for, from, to),
        &team_metric_sample(&rows, away_id, &metric_ag, from, to),
    );
    let away_sample = poisson_gamma::pool(
        &team_metric_sample(&rows, away_id, &metric_for, from, to),
        &team_metric_sample(&rows, home_id, &metric_ag, from, to),
    );
    if home_sample.is_empty() {
        return Err(anyhow!(
            "no {metric} observations for team {home_id} vs team {away_id} in {from}..{to}"
        ));
    }
    if away_sample.is_empty() {
        return Err(anyhow!(
            "no {metric} observations for team {away_id} vs team {home_id} in {from}..{to}"
        ));
    }

    let home_pmf = poisson_gamma::fit(&home_sample, &cfg)?;
    let away_pmf = poisson_gamma::fit(&away_sample, &cfg)?;
    let joint = outcome::joint(&home_pmf, &away_pmf)?;

    println!("Fixture: team {home_id} (H) vs team {away_id} (A)");
    println!("Metric: {metric}, window {from}..{to}");
    println!(
        "Samples: home n={}, away n={}",
        home_sample.len(),
        away_sample.len()
    );
    println!(
        "Home win {:.1}%  Draw {:.1}%  Away win {:.1}%",
        joint.home_win * 100.0,
        joint.draw * 100.0,
        joint.away_win * 100.0
    );

    println!();
    println!("Most likely scorelines:");
    let mut cells: Vec<(usize, usize, f64)> = Vec::new();
    for (i, row) in joint.matrix.iter().enumerate() {
        for (j, p) in row.iter().enumerate() {
            cells.push((i, j, *p));
        }
    }
    cells.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    for (h, a, p) in cells.iter().take(5) {
        println!("  {h}-{a}  {:.1}%", p * 100.0);
    }

    if show_matrix(&args) {
        println!();
        print!("H\\A ");
        for j in 0..joint.matrix.len() {
            print!("{j:>7}");
        }
        println!();
        for (i, row) in joint.matrix.iter().enumerate() {
            print!("{i:>3} ");
            for p in row {
                print!("{:>7.4}", p);
            }
            println!();
        }
    }

    Ok(())
}

fn show_matrix(args: &[String]) -> bool {
    args.iter().any(|a| a == "--matrix")
}

fn parse_date_arg(args: &[String], flag: &str) -> Result<Option<NaiveDate>> {
    let Some(raw) = arg_value(args, flag) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(Some)
        .with_context(|| format!("{flag} expects YYYYMMDD, got {raw:?}"))
}

fn parse_u32_arg(args: &[String], flag: &str) -> Result<Option<u32>> {
    let Some(raw) = arg_value(args, flag) else {
        return Ok(None);
    };
    raw.parse::<u32>()
        .map(Some)
        .with_context(|| format!("{flag} expects an integer, got {raw:?}"))
}

fn parse_usize_arg(args: &[String], flag: &str) -> Result<Option<usize>> {
    let Some(raw) = arg_value(args, flag) else {
        return Ok(None);
    };
    raw.parse::<usize>()
        .map(Some)
        .with_context(|| format!("{flag} expects an integer, got {raw:?}"))
}

fn parse_f64_arg(args: &[String], flag: &str) -> Result<Option<f64>> {
    let Some(raw) = arg_value(args, flag) else {
        return Ok(None);
    };
    raw.parse::<f64>()
        .map(Some)
        .with_context(|| format!("{flag} expects a number, got {raw:?}"))
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
