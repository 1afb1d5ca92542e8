use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, params};

use crate::errors::{read_context, write_context};

use super::models::MatchResultRecord;

const RESULT_COLUMNS: &str = "id, match_id, seed, uid, score, rank, points, segment_tier, created_at";

pub fn insert_match_result(conn: &Connection, record: &MatchResultRecord) -> Result<MatchResultRecord> {
    let sql = format!(
        "INSERT INTO match_results (match_id, seed, uid, score, rank, points, segment_tier, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING {}",
        RESULT_COLUMNS
    );

    conn.query_row(
        &sql,
        params![
            record.match_id,
            record.seed,
            record.uid,
            record.score,
            record.rank,
            record.points,
            record.segment_tier.as_str(),
            record.created_at,
        ],
        parse_match_result_row,
    )
    .with_context(|| write_context("match_results", &format!("{}/{}", record.match_id, record.uid)))
}

/// Records for `seed` strictly newer than the watermark, oldest first.
pub fn list_by_seed_after(
    conn: &Connection,
    seed: &str,
    watermark: Option<NaiveDateTime>,
) -> Result<Vec<MatchResultRecord>> {
    let mut rows = Vec::new();

    match watermark {
        Some(mark) => {
            let sql = format!(
                "SELECT {} FROM match_results WHERE seed = ?1 AND created_at > ?2 ORDER BY created_at ASC, id ASC",
                RESULT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            for row in stmt.query_map(params![seed, mark], parse_match_result_row)? {
                rows.push(row.with_context(|| read_context("match_results", seed))?);
            }
        }
        None => {
            let sql = format!(
                "SELECT {} FROM match_results WHERE seed = ?1 ORDER BY created_at ASC, id ASC",
                RESULT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            for row in stmt.query_map(params![seed], parse_match_result_row)? {
                rows.push(row.with_context(|| read_context("match_results", seed))?);
            }
        }
    }

    Ok(rows)
}

/// Most recent `limit` records for a player, newest first.
pub fn list_by_uid(conn: &Connection, uid: &str, limit: usize) -> Result<Vec<MatchResultRecord>> {
    let sql = format!(
        "SELECT {} FROM match_results WHERE uid = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
        RESULT_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![uid, limit as i64], parse_match_result_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| read_context("match_results", uid))?;

    Ok(rows)
}

pub fn list_distinct_seeds(conn: &Connection) -> Result<Vec<String>> {
    let sql = "SELECT DISTINCT seed FROM match_results ORDER BY seed";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .context("Failed to list seeds from match results")?;

    Ok(rows)
}

pub fn played_seeds(conn: &Connection, uid: &str) -> Result<HashSet<String>> {
    let sql = "SELECT DISTINCT seed FROM match_results WHERE uid = ?1";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![uid], |row| row.get(0))?
        .collect::<rusqlite::Result<HashSet<String>>>()
        .with_context(|| read_context("match_results", uid))?;

    Ok(rows)
}

pub fn match_exists(conn: &Connection, match_id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM match_results WHERE match_id = ?1)",
        params![match_id],
        |row| row.get(0),
    )
    .with_context(|| read_context("match_results", match_id))
}

pub fn count_match_results(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM match_results", [], |row| row.get(0))
        .context("Failed to count match results")
}

fn parse_match_result_row(row: &rusqlite::Row) -> rusqlite::Result<MatchResultRecord> {
    let tier: String = row.get(7)?;

    Ok(MatchResultRecord {
        id: row.get(0)?,
        match_id: row.get(1)?,
        seed: row.get(2)?,
        uid: row.get(3)?,
        score: row.get(4)?,
        rank: row.get(5)?,
        points: row.get(6)?,
        segment_tier: tier
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?,
        created_at: row.get(8)?,
    })
}
