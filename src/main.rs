use anyhow::Result;

use placement_ranking::cli::Command;
use placement_ranking::{
    handle_cleanup, handle_init_db, handle_recommend, handle_refresh_seeds, handle_serve, handle_settle,
    handle_stats, handle_tune, interpret,
};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let command = interpret();
    execute_command(&command)
}

fn execute_command(command: &Command) -> Result<()> {
    match command {
        Command::Serve { port } => handle_serve(*port),
        Command::InitDb { reset } => handle_init_db(*reset),
        Command::Settle { file } => handle_settle(file),
        Command::Tune { uid } => handle_tune(uid.as_deref()),
        Command::RefreshSeeds { seed } => handle_refresh_seeds(seed.as_deref()),
        Command::Cleanup { days } => handle_cleanup(*days),
        Command::Recommend { uid, difficulty, limit } => handle_recommend(uid, *difficulty, *limit),
        Command::Stats => handle_stats(),
    }
}
