use anyhow::{Context, Result};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::retry::{RetryPolicy, with_retry};

const MATCHES_URL: &str = "https://www.fotmob.com/api/data/matches";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "A")]
    Away,
}

/// One side of one fixture in the melted catalog format: every fixture
/// contributes a home row and an away row, so per-team lookups never need
/// to know which column a team sat in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchIdRow {
    pub match_id: u64,
    pub league_id: u32,
    pub stage: String,
    pub utc_time: String,
    pub venue: Venue,
    pub team_id: u32,
    pub finished: bool,
    pub cancelled: bool,
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    leagues: Vec<LeagueBlock>,
}

#[derive(Debug, Deserialize)]
struct LeagueBlock {
    id: u32,
    #[serde(rename = "primaryId")]
    primary_id: Option<u32>,
    #[serde(default)]
    matches: Vec<MatchBlock>,
}

#[derive(Debug, Deserialize)]
struct MatchBlock {
    id: u64,
    #[serde(rename = "tournamentStage")]
    tournament_stage: Option<String>,
    home: TeamBlock,
    away: TeamBlock,
    status: StatusBlock,
}

#[derive(Debug, Deserialize)]
struct TeamBlock {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct StatusBlock {
    #[serde(rename = "utcTime", default)]
    utc_time: String,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    cancelled: bool,
}

pub fn fetch_match_ids_on_date(
    date: NaiveDate,
    leagues: Option<&[u32]>,
) -> Result<Vec<MatchIdRow>> {
    let client = http_client()?;
    let url = format!("{MATCHES_URL}?date={}", date.format("%Y%m%d"));
    let body = fetch_json_cached(client, &url).context("matches request failed")?;
    parse_match_ids_json(&body, leagues)
}

pub fn parse_match_ids_json(raw: &str, leagues: Option<&[u32]>) -> Result<Vec<MatchIdRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: MatchesResponse = serde_json::from_str(trimmed).context("invalid matches json")?;

    let mut rows = Vec::new();
    for league in data.leagues {
        let league_id = league.primary_id.unwrap_or(league.id);
        if let Some(allow) = leagues {
            if !allow.contains(&league_id) {
                continue;
            }
        }
        for fixture in league.matches {
            let utc_time = normalize_utc_time(&fixture.status.utc_time);
            let sides = [
                (Venue::Home, fixture.home.id),
                (Venue::Away, fixture.away.id),
            ];
            for (venue, team_id) in sides {
                rows.push(MatchIdRow {
                    match_id: fixture.id,
                    league_id,
                    stage: fixture.tournament_stage.clone().unwrap_or_default(),
                    utc_time: utc_time.clone(),
                    venue,
                    team_id,
                    finished: fixture.status.finished,
                    cancelled: fixture.status.cancelled,
                });
            }
        }
    }
    Ok(rows)
}

#[derive(Debug, Default)]
pub struct RangeFetchSummary {
    pub rows: Vec<MatchIdRow>,
    pub dates_total: usize,
    pub dates_succeeded: usize,
    pub errors: Vec<String>,
}

/// Fetches the melted id rows for every date in the inclusive range, one
/// independent unit per date. A failing date is recorded and skipped; the
/// batch itself never aborts. Aggregation happens only after the parallel
/// section.
pub fn fetch_match_ids_range(
    from: NaiveDate,
    to: NaiveDate,
    leagues: Option<&[u32]>,
    policy: &RetryPolicy,
) -> RangeFetchSummary {
    let mut dates = Vec::new();
    let mut day = from;
    while day <= to {
        dates.push(day);
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }

    let fetched: Vec<(NaiveDate, Result<Vec<MatchIdRow>>)> = dates
        .par_iter()
        .map(|date| {
            let result = with_retry(policy, || fetch_match_ids_on_date(*date, leagues));
            (*date, result)
        })
        .collect();

    let mut summary = RangeFetchSummary {
        dates_total: dates.len(),
        ..Default::default()
    };
    for (date, result) in fetched {
        match result {
            Ok(mut rows) => {
                summary.dates_succeeded += 1;
                summary.rows.append(&mut rows);
            }
            Err(err) => summary.errors.push(format!("{date}: {err:#}")),
        }
    }
    summary
}

// FotMob serves ISO-ish timestamps ("2026-06-11T19:00:00Z" or with a
// space); minute precision is plenty for ordering and date filters.
fn normalize_utc_time(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('Z').replace(' ', "T");
    if trimmed.len() >= 16 {
        trimmed[..16].to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LEAGUES: &str = r#"{
        "leagues": [
            {
                "id": 9991,
                "primaryId": 47,
                "name": "Premier League",
                "matches": [
                    {
                        "id": 1001,
                        "tournamentStage": "Round 1",
                        "home": {"id": 8650, "name": "Liverpool"},
                        "away": {"id": 8456, "name": "Man City"},
                        "status": {"utcTime": "2026-08-01T14:00:00Z", "started": true, "finished": true, "cancelled": false}
                    }
                ]
            },
            {
                "id": 54,
                "name": "Bundesliga",
                "matches": [
                    {
                        "id": 2002,
                        "home": {"id": 9823, "name": "Bayern"},
                        "away": {"id": 9789, "name": "Dortmund"},
                        "status": {"utcTime": "2026-08-01 17:30:00Z", "finished": false, "cancelled": false}
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn melts_each_fixture_into_two_venue_rows() {
        let rows = parse_match_ids_json(TWO_LEAGUES, None).unwrap();
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[0].match_id, 1001);
        assert_eq!(rows[0].venue, Venue::Home);
        assert_eq!(rows[0].team_id, 8650);
        assert_eq!(rows[1].venue, Venue::Away);
        assert_eq!(rows[1].team_id, 8456);
        assert_eq!(rows[0].league_id, 47);
        assert_eq!(rows[0].stage, "Round 1");
        assert!(rows[0].finished);
        assert_eq!(rows[0].utc_time, "2026-08-01T14:00");
    }

    #[test]
    fn league_allowlist_filters_rows() {
        let rows = parse_match_ids_json(TWO_LEAGUES, Some(&[54])).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.league_id == 54));
        // Space-separated timestamp is normalized too.
        assert_eq!(rows[0].utc_time, "2026-08-01T17:30");
    }

    #[test]
    fn null_body_is_an_empty_day() {
        assert!(parse_match_ids_json("null", None).unwrap().is_empty());
        assert!(parse_match_ids_json("  ", None).unwrap().is_empty());
    }
}
