use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, create_orm_conn, create_pool, run_migrations},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        let orm = create_orm_conn(&pool);
        Self {
            pool,
            orm,
            config: Arc::new(config),
        }
    }

    /// Connect, migrate and build the state in one go.
    pub async fn connect(config: AppConfig) -> anyhow::Result<Self> {
        let pool = create_pool(&config.database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool, config))
    }
}
