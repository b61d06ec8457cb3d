use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::http_cache::app_cache_dir;
use crate::ids_fetch::{MatchIdRow, Venue};
use crate::stats_fetch::StatRow;

pub const MATCH_IDS_FILE: &str = "match_ids.csv";
pub const MATCH_STATS_FILE: &str = "match_stats.csv";

pub fn default_data_dir() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("database"))
}

#[derive(Debug)]
pub struct CatalogUpdate {
    pub rows: Vec<MatchIdRow>,
    pub added: usize,
}

/// Merges freshly fetched rows into the existing catalog.
///
/// Only finished, non-cancelled fixtures are kept (the catalog is the
/// model's historical record, not a fixture list). Duplicate
/// (match_id, venue) keys resolve to the fetched row, so a refetched date
/// picks up corrected statuses.
pub fn update_match_ids(existing: Vec<MatchIdRow>, fetched: Vec<MatchIdRow>) -> CatalogUpdate {
    let known: HashSet<(u64, Venue)> = existing
        .iter()
        .filter(|r| r.finished && !r.cancelled)
        .map(|r| (r.match_id, r.venue))
        .collect();

    let mut merged: HashMap<(u64, Venue), MatchIdRow> = HashMap::new();
    for row in existing.into_iter().chain(fetched) {
        merged.insert((row.match_id, row.venue), row);
    }

    let mut rows: Vec<MatchIdRow> = merged
        .into_values()
        .filter(|r| r.finished && !r.cancelled)
        .collect();
    rows.sort_by(|a, b| {
        a.utc_time
            .cmp(&b.utc_time)
            .then(a.match_id.cmp(&b.match_id))
            .then((a.venue == Venue::Away).cmp(&(b.venue == Venue::Away)))
    });

    let added = rows
        .iter()
        .filter(|r| !known.contains(&(r.match_id, r.venue)))
        .count();

    CatalogUpdate { rows, added }
}

/// Kickoff time of the newest catalogued fixture; ingest resumes a few days
/// before this to pick up late corrections.
pub fn latest_utc_time(rows: &[MatchIdRow]) -> Option<&str> {
    rows.iter().map(|r| r.utc_time.as_str()).max()
}

pub fn load_match_ids(path: &Path) -> Result<Vec<MatchIdRow>> {
    load_rows(path)
}

pub fn save_match_ids(path: &Path, rows: &[MatchIdRow]) -> Result<()> {
    save_rows(path, rows)
}

pub fn load_stats(path: &Path) -> Result<Vec<StatRow>> {
    load_rows(path)
}

/// Appends stat rows that are not already present, keyed by
/// (match_id, team_id, metric). Returns how many rows were new.
pub fn append_stats(path: &Path, new_rows: Vec<StatRow>) -> Result<usize> {
    let mut rows: Vec<StatRow> = load_rows(path)?;
    let mut seen: HashSet<(u64, u32, String)> = rows
        .iter()
        .map(|r| (r.match_id, r.team_id, r.metric.clone()))
        .collect();

    let before = rows.len();
    for row in new_rows {
        if seen.insert((row.match_id, row.team_id, row.metric.clone())) {
            rows.push(row);
        }
    }
    save_rows(path, &rows)?;
    Ok(rows.len() - before)
}

/// Match ids that already have stats on disk, so an incremental ingest only
/// fetches the gap.
pub fn stats_match_ids(rows: &[StatRow]) -> HashSet<u64> {
    rows.iter().map(|r| r.match_id).collect()
}

// A missing file is an empty table: the first ingest starts from scratch,
// same as a catalog wiped by hand.
fn load_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open csv {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.with_context(|| format!("malformed row in {}", path.display()))?);
    }
    Ok(rows)
}

fn save_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("open csv {}", tmp.display()))?;
        for row in rows {
            writer.serialize(row).context("serialize csv row")?;
        }
        writer.flush().context("flush csv")?;
    }
    fs::rename(&tmp, path).with_context(|| format!("swap csv {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_row(match_id: u64, venue: Venue, team_id: u32, finished: bool) -> MatchIdRow {
        MatchIdRow {
            match_id,
            league_id: 47,
            stage: String::new(),
            utc_time: format!("2026-08-{:02}T15:00", match_id),
            venue,
            team_id,
            finished,
            cancelled: false,
        }
    }

    #[test]
    fn update_keeps_only_finished_fixtures() {
        let fetched = vec![
            id_row(1, Venue::Home, 10, true),
            id_row(1, Venue::Away, 20, true),
            id_row(2, Venue::Home, 30, false),
            id_row(2, Venue::Away, 40, false),
        ];
        let update = update_match_ids(Vec::new(), fetched);
        assert_eq!(update.rows.len(), 2);
        assert_eq!(update.added, 2);
        assert!(update.rows.iter().all(|r| r.match_id == 1));
    }

    #[test]
    fn update_dedups_and_counts_only_new_rows() {
        let existing = vec![id_row(1, Venue::Home, 10, true), id_row(1, Venue::Away, 20, true)];
        let fetched = vec![
            id_row(1, Venue::Home, 10, true),
            id_row(1, Venue::Away, 20, true),
            id_row(3, Venue::Home, 50, true),
            id_row(3, Venue::Away, 60, true),
        ];
        let update = update_match_ids(existing, fetched);
        assert_eq!(update.rows.len(), 4);
        assert_eq!(update.added, 2);
    }

    #[test]
    fn refetched_status_wins_over_the_stored_row() {
        // The fixture was catalogued as finished, then the refetch says it
        // was cancelled after all (e.g. abandoned and voided).
        let existing = vec![id_row(1, Venue::Home, 10, true)];
        let mut cancelled = id_row(1, Venue::Home, 10, true);
        cancelled.cancelled = true;
        let update = update_match_ids(existing, vec![cancelled]);
        assert!(update.rows.is_empty());
    }

    #[test]
    fn rows_are_sorted_by_kickoff() {
        let fetched = vec![
            id_row(9, Venue::Home, 1, true),
            id_row(2, Venue::Home, 2, true),
            id_row(5, Venue::Home, 3, true),
        ];
        let update = update_match_ids(Vec::new(), fetched);
        let times: Vec<&str> = update.rows.iter().map(|r| r.utc_time.as_str()).collect();
        assert_eq!(times, vec!["2026-08-02T15:00", "2026-08-05T15:00", "2026-08-09T15:00"]);
        assert_eq!(latest_utc_time(&update.rows), Some("2026-08-09T15:00"));
    }
}
