use anyhow::Result;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::AppState;
use crate::api::routes::create_router;
use crate::config::settings::AppConfig;
use crate::database;

use super::queue::SpawnedTuningQueue;
use super::tuning::AdaptiveConfigTuner;

pub struct ServerService {
    port: u16,
    config: AppConfig,
}

impl ServerService {
    pub fn new(port: u16, config: AppConfig) -> Self {
        Self { port, config }
    }

    pub async fn run(&self) -> Result<()> {
        let pool = database::create_pool(&self.config.database_path)?;
        {
            let conn = database::get_connection(&pool)?;
            database::setup::initialize_database(&conn)?;
        }

        let tuner = Arc::new(AdaptiveConfigTuner::new(pool.clone(), self.config.clone()));
        let queue = Arc::new(SpawnedTuningQueue::new(tuner)?);

        let state = Arc::new(AppState {
            pool,
            config: self.config.clone(),
            queue,
        });

        let app = create_router(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Server listening on {} (database: {})", addr, self.config.database_path);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
