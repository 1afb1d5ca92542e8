use anyhow::Result;

use crate::database::{self, DbPool, SystemStatistics, configs, match_results, seed_stats};

pub fn system_statistics(pool: &DbPool) -> Result<SystemStatistics> {
    let conn = database::get_connection(pool)?;

    Ok(SystemStatistics {
        total_players: configs::count_configs(&conn)?,
        total_match_records: match_results::count_match_results(&conn)?,
        tracked_seeds: seed_stats::count_seed_stats(&conn)?,
    })
}
