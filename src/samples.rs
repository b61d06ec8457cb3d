use chrono::NaiveDate;

use crate::stats_fetch::StatRow;

/// Count sample for one team and one metric over an inclusive date range,
/// ordered by kickoff.
///
/// Integer-count metrics only: fractional rows (xG) are outside the count
/// model's domain and are skipped. Date bounds compare against the date
/// part of the stored kickoff, which is safe because the stored timestamps
/// are ISO-ordered.
pub fn team_metric_sample(
    rows: &[StatRow],
    team_id: u32,
    metric: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<i64> {
    let from_key = from.format("%Y-%m-%d").to_string();
    let to_key = to.format("%Y-%m-%d").to_string();

    let mut picked: Vec<&StatRow> = rows
        .iter()
        .filter(|r| r.team_id == team_id && r.metric == metric)
        .filter(|r| {
            let date = r.utc_time.get(..10).unwrap_or(&r.utc_time);
            date >= from_key.as_str() && date <= to_key.as_str()
        })
        .filter(|r| r.value.fract() == 0.0)
        .collect();
    picked.sort_by(|a, b| a.utc_time.cmp(&b.utc_time).then(a.match_id.cmp(&b.match_id)));
    picked.into_iter().map(|r| r.value as i64).collect()
}
