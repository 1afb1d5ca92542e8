use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{RankingError, read_context, write_context};
use crate::ranking::types::{PlayerRankingConfig, ScoreBand};

const CONFIG_COLUMNS: &str = "uid, segment_tier, score_thresholds, max_rank, adaptive_mode, learning_rate, ranking_mode, auto_adjust_learning_rate, created_at, updated_at";

/// A row that no longer parses is reported as `RankingError::NotFound`.
pub fn find_config(conn: &Connection, uid: &str) -> Result<Option<PlayerRankingConfig>> {
    let sql = format!("SELECT {} FROM player_configs WHERE uid = ?1", CONFIG_COLUMNS);

    match conn.query_row(&sql, params![uid], parse_config_row).optional() {
        Ok(found) => Ok(found),
        Err(
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..),
        ) => Err(RankingError::not_found("player_configs", uid).into()),
        Err(e) => Err(e).with_context(|| read_context("player_configs", uid)),
    }
}

/// Inserts the config unless a row for the uid already exists, then returns
/// whichever row is stored.
pub fn insert_config_if_absent(
    conn: &Connection,
    config: &PlayerRankingConfig,
) -> Result<PlayerRankingConfig> {
    let thresholds = serde_json::to_string(&config.score_thresholds)
        .context("Failed to serialize score thresholds")?;
    let sql = format!(
        "INSERT INTO player_configs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) ON CONFLICT(uid) DO NOTHING",
        CONFIG_COLUMNS
    );

    conn.execute(
        &sql,
        params![
            config.uid,
            config.segment_tier.as_str(),
            thresholds,
            config.max_rank as i64,
            config.adaptive_mode.as_str(),
            config.learning_rate,
            config.ranking_mode.as_str(),
            config.auto_adjust_learning_rate,
            config.created_at,
            config.updated_at,
        ],
    )
    .with_context(|| write_context("player_configs", &config.uid))?;

    find_config(conn, &config.uid)?
        .with_context(|| read_context("player_configs", &config.uid))
}

/// Writes the whole row, replacing whatever is stored for the uid.
pub fn replace_config(conn: &Connection, config: &PlayerRankingConfig) -> Result<()> {
    let thresholds = serde_json::to_string(&config.score_thresholds)
        .context("Failed to serialize score thresholds")?;
    let sql = format!(
        "INSERT OR REPLACE INTO player_configs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        CONFIG_COLUMNS
    );

    conn.execute(
        &sql,
        params![
            config.uid,
            config.segment_tier.as_str(),
            thresholds,
            config.max_rank as i64,
            config.adaptive_mode.as_str(),
            config.learning_rate,
            config.ranking_mode.as_str(),
            config.auto_adjust_learning_rate,
            config.created_at,
            config.updated_at,
        ],
    )
    .with_context(|| write_context("player_configs", &config.uid))
    .map(|_| ())
}

/// Overwrites every mutable column; returns false when no row exists.
pub fn update_config(conn: &Connection, config: &PlayerRankingConfig) -> Result<bool> {
    let thresholds = serde_json::to_string(&config.score_thresholds)
        .context("Failed to serialize score thresholds")?;
    let sql = "UPDATE player_configs SET segment_tier = ?2, score_thresholds = ?3, max_rank = ?4, adaptive_mode = ?5, learning_rate = ?6, ranking_mode = ?7, auto_adjust_learning_rate = ?8, updated_at = ?9 WHERE uid = ?1";

    let changed = conn
        .execute(
            sql,
            params![
                config.uid,
                config.segment_tier.as_str(),
                thresholds,
                config.max_rank as i64,
                config.adaptive_mode.as_str(),
                config.learning_rate,
                config.ranking_mode.as_str(),
                config.auto_adjust_learning_rate,
                config.updated_at,
            ],
        )
        .with_context(|| write_context("player_configs", &config.uid))?;

    Ok(changed > 0)
}

pub fn list_uids(conn: &Connection) -> Result<Vec<String>> {
    let sql = "SELECT uid FROM player_configs ORDER BY uid";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .context("Failed to list player config uids")?;

    Ok(rows)
}

pub fn count_configs(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM player_configs", [], |row| row.get(0))
        .context("Failed to count player configs")
}

fn parse_config_row(row: &rusqlite::Row) -> rusqlite::Result<PlayerRankingConfig> {
    let tier: String = row.get(1)?;
    let thresholds: String = row.get(2)?;
    let max_rank: i64 = row.get(3)?;
    let adaptive_mode: String = row.get(4)?;
    let ranking_mode: String = row.get(6)?;

    let score_thresholds: Vec<ScoreBand> = serde_json::from_str(&thresholds)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(PlayerRankingConfig {
        uid: row.get(0)?,
        segment_tier: tier
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?,
        score_thresholds,
        max_rank: max_rank.max(1) as usize,
        adaptive_mode: adaptive_mode
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        learning_rate: row.get(5)?,
        ranking_mode: ranking_mode
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
        auto_adjust_learning_rate: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
