use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{read_context, write_context};

use super::models::SeedStatistics;

const SEED_COLUMNS: &str = "seed, total_matches_observed, last_processed_at, score_sum, score_count, score_min, score_max, last_analyzed_at, created_at";

pub fn find_seed_stats(conn: &Connection, seed: &str) -> Result<Option<SeedStatistics>> {
    let sql = format!("SELECT {} FROM seed_statistics WHERE seed = ?1", SEED_COLUMNS);

    conn.query_row(&sql, params![seed], parse_seed_stats_row)
        .optional()
        .with_context(|| read_context("seed_statistics", seed))
}

pub fn upsert_seed_stats(conn: &Connection, stats: &SeedStatistics) -> Result<()> {
    let sql = format!(
        "INSERT INTO seed_statistics ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
         ON CONFLICT(seed) DO UPDATE SET total_matches_observed = excluded.total_matches_observed, last_processed_at = excluded.last_processed_at, \
         score_sum = excluded.score_sum, score_count = excluded.score_count, score_min = excluded.score_min, score_max = excluded.score_max, \
         last_analyzed_at = excluded.last_analyzed_at",
        SEED_COLUMNS
    );

    conn.execute(
        &sql,
        params![
            stats.seed,
            stats.total_matches_observed,
            stats.last_processed_at,
            stats.score_sum,
            stats.score_count,
            stats.score_min,
            stats.score_max,
            stats.last_analyzed_at,
            stats.created_at,
        ],
    )
    .with_context(|| write_context("seed_statistics", &stats.seed))
    .map(|_| ())
}

/// Rows with at least `min_samples` scored records, most observed first.
pub fn list_with_min_samples(conn: &Connection, min_samples: i64) -> Result<Vec<SeedStatistics>> {
    let sql = format!(
        "SELECT {} FROM seed_statistics WHERE score_count >= ?1 ORDER BY total_matches_observed DESC, seed ASC",
        SEED_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![min_samples], parse_seed_stats_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to list seed statistics")?;

    Ok(rows)
}

pub fn delete_analyzed_before(conn: &Connection, cutoff: NaiveDateTime) -> Result<usize> {
    conn.execute(
        "DELETE FROM seed_statistics WHERE last_analyzed_at < ?1",
        params![cutoff],
    )
    .context("Failed to delete expired seed statistics")
}

pub fn count_seed_stats(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM seed_statistics", [], |row| row.get(0))
        .context("Failed to count seed statistics")
}

fn parse_seed_stats_row(row: &rusqlite::Row) -> rusqlite::Result<SeedStatistics> {
    Ok(SeedStatistics {
        seed: row.get(0)?,
        total_matches_observed: row.get(1)?,
        last_processed_at: row.get(2)?,
        score_sum: row.get(3)?,
        score_count: row.get(4)?,
        score_min: row.get(5)?,
        score_max: row.get(6)?,
        last_analyzed_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}
