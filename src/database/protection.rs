use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{read_context, write_context};
use crate::ranking::types::ProtectionStatus;

pub fn find_protection(conn: &Connection, uid: &str) -> Result<Option<ProtectionStatus>> {
    let sql = "SELECT uid, protection_level, grace_period, protection_duration_days, is_active, last_update_match FROM protection_status WHERE uid = ?1";

    conn.query_row(sql, params![uid], parse_protection_row)
        .optional()
        .with_context(|| read_context("protection_status", uid))
}

pub fn upsert_protection(conn: &Connection, status: &ProtectionStatus) -> Result<()> {
    let sql = "INSERT INTO protection_status (uid, protection_level, grace_period, protection_duration_days, is_active, last_update_match) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
               ON CONFLICT(uid) DO UPDATE SET protection_level = excluded.protection_level, grace_period = excluded.grace_period, \
               protection_duration_days = excluded.protection_duration_days, is_active = excluded.is_active, last_update_match = excluded.last_update_match";

    conn.execute(
        sql,
        params![
            status.uid,
            status.protection_level,
            status.grace_period,
            status.protection_duration_days,
            status.is_active,
            status.last_update_match,
        ],
    )
    .with_context(|| write_context("protection_status", &status.uid))
    .map(|_| ())
}

fn parse_protection_row(row: &rusqlite::Row) -> rusqlite::Result<ProtectionStatus> {
    Ok(ProtectionStatus {
        uid: row.get(0)?,
        protection_level: row.get(1)?,
        grace_period: row.get(2)?,
        protection_duration_days: row.get(3)?,
        is_active: row.get(4)?,
        last_update_match: row.get(5)?,
    })
}
