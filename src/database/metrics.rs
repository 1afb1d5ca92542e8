use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{read_context, write_context};
use crate::ranking::types::PerformanceMetrics;

pub fn find_metrics(conn: &Connection, uid: &str) -> Result<Option<PerformanceMetrics>> {
    let sql = "SELECT uid, total_matches, total_wins, total_score_sum, last_match_score, last_match_rank, updated_at FROM performance_metrics WHERE uid = ?1";

    conn.query_row(sql, params![uid], parse_metrics_row)
        .optional()
        .with_context(|| read_context("performance_metrics", uid))
}

pub fn upsert_metrics(conn: &Connection, metrics: &PerformanceMetrics) -> Result<()> {
    let sql = "INSERT INTO performance_metrics (uid, total_matches, total_wins, total_score_sum, last_match_score, last_match_rank, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
               ON CONFLICT(uid) DO UPDATE SET total_matches = excluded.total_matches, total_wins = excluded.total_wins, total_score_sum = excluded.total_score_sum, \
               last_match_score = excluded.last_match_score, last_match_rank = excluded.last_match_rank, updated_at = excluded.updated_at";

    conn.execute(
        sql,
        params![
            metrics.uid,
            metrics.total_matches,
            metrics.total_wins,
            metrics.total_score_sum,
            metrics.last_match_score,
            metrics.last_match_rank,
            metrics.updated_at,
        ],
    )
    .with_context(|| write_context("performance_metrics", &metrics.uid))
    .map(|_| ())
}

fn parse_metrics_row(row: &rusqlite::Row) -> rusqlite::Result<PerformanceMetrics> {
    Ok(PerformanceMetrics {
        uid: row.get(0)?,
        total_matches: row.get(1)?,
        total_wins: row.get(2)?,
        total_score_sum: row.get(3)?,
        last_match_score: row.get(4)?,
        last_match_rank: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
