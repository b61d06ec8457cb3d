use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::ids_fetch::Venue;
use crate::retry::{RetryPolicy, with_retry};

const MATCH_DETAILS_URL: &str = "https://www.fotmob.com/api/data/matchDetails?matchId=";

/// Per-team counts for one finished match. Everything except the score is
/// optional: smaller leagues expose only a subset of the stat blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamStatLine {
    pub goals: i64,
    pub corners: Option<i64>,
    pub shots: Option<i64>,
    pub shots_on_target: Option<i64>,
    pub fouls: Option<i64>,
    pub yellow_cards: Option<i64>,
    pub red_cards: Option<i64>,
    pub xg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchStats {
    pub match_id: u64,
    pub utc_time: String,
    pub referee: Option<String>,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub home_team: String,
    pub away_team: String,
    pub home: TeamStatLine,
    pub away: TeamStatLine,
}

/// One cell of the long-format stats table: a single metric observed for a
/// single team in a single match. The `_for`/`_ag` metric suffix pairs each
/// team's own production with what it conceded, so "corners_ag of team X"
/// is the corners taken by X's opponents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    pub match_id: u64,
    pub utc_time: String,
    pub team_id: u32,
    pub venue: Venue,
    pub metric: String,
    pub value: f64,
}

pub fn fetch_match_stats(match_id: u64) -> Result<MatchStats> {
    let client = http_client()?;
    let url = format!("{MATCH_DETAILS_URL}{match_id}");
    let body = fetch_json_cached(client, &url).context("matchDetails request failed")?;
    parse_match_stats_json(match_id, &body)
}

pub fn parse_match_stats_json(match_id: u64, raw: &str) -> Result<MatchStats> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(anyhow!("empty matchDetails response for match {match_id}"));
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid matchDetails json")?;

    let teams = root
        .get("header")
        .and_then(|h| h.get("teams"))
        .and_then(|t| t.as_array())
        .filter(|t| t.len() >= 2)
        .ok_or_else(|| anyhow!("match {match_id}: header is missing the two teams"))?;
    let (home_id, home_team, home_goals) =
        parse_header_team(&teams[0]).ok_or_else(|| anyhow!("match {match_id}: bad home header"))?;
    let (away_id, away_team, away_goals) =
        parse_header_team(&teams[1]).ok_or_else(|| anyhow!("match {match_id}: bad away header"))?;

    let general = root.get("general").unwrap_or(&Value::Null);
    let utc_time = pick_str(general, &["matchTimeUTCDate", "matchTimeUTC"])
        .map(|t| normalize_utc_time(&t))
        .unwrap_or_default();

    let content = root.get("content").unwrap_or(&Value::Null);
    let referee = content
        .get("matchFacts")
        .and_then(|f| f.get("infoBox"))
        .and_then(|b| b.get("Referee"))
        .and_then(|r| pick_str(r, &["text", "name"]));

    let mut home = TeamStatLine {
        goals: home_goals,
        ..TeamStatLine::default()
    };
    let mut away = TeamStatLine {
        goals: away_goals,
        ..TeamStatLine::default()
    };

    for (title, home_value, away_value) in iter_stat_rows(content.get("stats")) {
        let title = title.to_lowercase();
        if let Some(v) = home_value {
            apply_stat(&mut home, &title, v);
        }
        if let Some(v) = away_value {
            apply_stat(&mut away, &title, v);
        }
    }

    Ok(MatchStats {
        match_id,
        utc_time,
        referee,
        home_team_id: home_id,
        away_team_id: away_id,
        home_team,
        away_team,
        home,
        away,
    })
}

/// Long-format rows for both teams of one match, each team's own counts as
/// `*_for` and its opponent's as `*_ag`.
pub fn melt_match_stats(stats: &MatchStats) -> Vec<StatRow> {
    let sides = [
        (stats.home_team_id, Venue::Home, &stats.home, &stats.away),
        (stats.away_team_id, Venue::Away, &stats.away, &stats.home),
    ];

    let mut rows = Vec::new();
    for (team_id, venue, own, opp) in sides {
        let mut push = |metric: String, value: f64| {
            rows.push(StatRow {
                match_id: stats.match_id,
                utc_time: stats.utc_time.clone(),
                team_id,
                venue,
                metric,
                value,
            });
        };

        for (suffix, line) in [("for", own), ("ag", opp)] {
            push(format!("goals_{suffix}"), line.goals as f64);
            let counts = [
                ("corners", line.corners),
                ("shots", line.shots),
                ("shots_on_target", line.shots_on_target),
                ("fouls", line.fouls),
                ("yellow_cards", line.yellow_cards),
                ("red_cards", line.red_cards),
            ];
            for (name, value) in counts {
                if let Some(v) = value {
                    push(format!("{name}_{suffix}"), v as f64);
                }
            }
            if let Some(xg) = line.xg {
                push(format!("xg_{suffix}"), xg);
            }
        }
    }
    rows
}

#[derive(Debug, Default)]
pub struct StatsBatch {
    pub matches: Vec<MatchStats>,
    pub errors: Vec<String>,
}

/// Fetches match statistics for every id, one independent unit per match,
/// with the bounded retry applied per unit. Failed ids are recorded and
/// skipped so one dead page never sinks the batch.
pub fn fetch_stats_batch(match_ids: &[u64], policy: &RetryPolicy) -> StatsBatch {
    let fetched: Vec<(u64, Result<MatchStats>)> = match_ids
        .par_iter()
        .map(|id| {
            let result = with_retry(policy, || fetch_match_stats(*id));
            (*id, result)
        })
        .collect();

    let mut batch = StatsBatch::default();
    for (id, result) in fetched {
        match result {
            Ok(stats) => batch.matches.push(stats),
            Err(err) => batch.errors.push(format!("match {id}: {err:#}")),
        }
    }
    batch
}

fn parse_header_team(v: &Value) -> Option<(u32, String, i64)> {
    let id = v.get("id")?.as_u64()? as u32;
    let name = pick_str(v, &["name", "shortName"])?;
    let score = v.get("score")?.as_i64()?;
    Some((id, name, score))
}

// The stats payload has drifted over time: older bodies carry a two-element
// "stats" array per row, newer ones homeValue/awayValue fields. Both are
// walked here.
fn iter_stat_rows(stats: Option<&Value>) -> Vec<(String, Option<f64>, Option<f64>)> {
    let mut out = Vec::new();
    let Some(groups) = stats
        .and_then(|s| s.get("stats"))
        .and_then(|s| s.as_array())
    else {
        return out;
    };
    for group in groups {
        let Some(rows) = group.get("stats").and_then(|s| s.as_array()) else {
            continue;
        };
        for row in rows {
            let Some(title) = pick_str(row, &["title", "name"]) else {
                continue;
            };
            let (home, away) = match row.get("stats").and_then(|s| s.as_array()) {
                Some(pair) if pair.len() >= 2 => (stat_value(&pair[0]), stat_value(&pair[1])),
                _ => (
                    row.get("homeValue")
                        .or_else(|| row.get("home"))
                        .and_then(stat_value),
                    row.get("awayValue")
                        .or_else(|| row.get("away"))
                        .and_then(stat_value),
                ),
            };
            out.push((title, home, away));
        }
    }
    out
}

fn apply_stat(line: &mut TeamStatLine, title_lower: &str, value: f64) {
    let count = value as i64;
    if title_lower.contains("xgot")
        || (title_lower.contains("expected goals") && title_lower.contains("target"))
    {
        // On-target xG is not modelled; skip before the headline xG match.
    } else if title_lower.contains("expected goals") || title_lower == "xg" {
        // Only the headline number; the open-play/set-play breakdowns in
        // the same group are not stored.
        line.xg = Some(value);
    } else if title_lower.contains("on target") {
        line.shots_on_target = Some(count);
    } else if title_lower == "shots" || title_lower.contains("total shots") {
        // The shots group also lists off-target, blocked and inside-box
        // breakdowns; only the total is stored.
        line.shots = Some(count);
    } else if title_lower.contains("corner") {
        line.corners = Some(count);
    } else if title_lower.contains("foul") {
        line.fouls = Some(count);
    } else if title_lower.contains("yellow") {
        line.yellow_cards = Some(count);
    } else if title_lower.contains("red card") {
        line.red_cards = Some(count);
    }
}

fn stat_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_stat_cell(s),
        _ => None,
    }
}

fn parse_stat_cell(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let s = s.trim_end_matches('%').replace(',', "");
    s.parse::<f64>().ok()
}

fn pick_str(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = value.get(*key).and_then(|v| v.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn normalize_utc_time(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('Z').replace(' ', "T");
    if trimmed.len() >= 16 {
        trimmed[..16].to_string()
    } else {
        trimmed
    }
}
