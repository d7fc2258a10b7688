pub mod entity;
pub mod ids;
pub mod models;
use tokio::sync::OnceCell;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::revalidate::{LogRevalidator, Revalidator};
use crate::service::threads::ThreadsService;
use crate::service::users::UsersService;

pub mod service;

pub mod revalidate;

pub mod config;

#[cfg(test)]
pub(crate) mod test_utils;

static WEFT_CORE: OnceCell<Arc<WeftCore>> = OnceCell::const_new();

pub async fn core() -> Arc<WeftCore> {
    WEFT_CORE
        .get_or_init(|| async move { Arc::new(WeftCore::start().await.expect("failed to init")) })
        .await
        .clone()
}

/// Main runtime handle for Weft.
pub struct WeftCore {
    pub config: config::WeftConfig,

    /// Pooled store connection, established once and reused by every call.
    pub db: DatabaseConnection,

    pub threads: ThreadsService,
    pub users: UsersService,
}

impl WeftCore {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_with_revalidator(Arc::new(LogRevalidator)).await
    }

    /// Hosting layers that own a render cache pass their own notifier.
    pub async fn start_with_revalidator(
        revalidator: Arc<dyn Revalidator>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config = config::get_or_init().await?;

        // DB + migrations
        let db = models::open_or_create_db(&config).await;
        models::migrate_up(db.clone()).await;

        let threads = ThreadsService::new(db.clone(), revalidator.clone());
        let users = UsersService::new(db.clone(), revalidator);

        Ok(Self {
            config,
            db,
            threads,
            users,
        })
    }

    pub async fn shutdown(self) -> Result<(), Box<dyn std::error::Error>> {
        self.db.close().await?;
        Ok(())
    }
}

pub mod prelude {
    pub use super::entity;
    pub use super::ids;
    pub use super::models;

    pub use super::service;

    pub use super::revalidate;

    pub use super::config;
}
