use std::sync::Arc;

use crate::catalog::memory::{MemoryCategoryStore, MemoryProductRegistry};
use crate::catalog::CategoryHierarchy;
use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseError, DatabaseManager, PgCategoryStore, PgProductRegistry};

/// Shared handles for every request. Built once in `main` (or a test) and
/// cloned into handlers by axum.
#[derive(Clone)]
pub struct AppState {
    pub hierarchy: Arc<CategoryHierarchy>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(hierarchy: CategoryHierarchy, config: AppConfig) -> Self {
        Self {
            hierarchy: Arc::new(hierarchy),
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.security.jwt_secret
    }

    pub fn audit_enabled(&self) -> bool {
        self.config.security.enable_audit_logging
    }
}

/// Stores selected by `config.store`, wired into a hierarchy manager.
///
/// The database handle is returned for Postgres so the caller can close the
/// pool on shutdown.
pub async fn build_hierarchy(
    config: &AppConfig,
) -> Result<(CategoryHierarchy, Option<DatabaseManager>), DatabaseError> {
    let (hierarchy, db) = match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory category store; data is lost on exit");
            let hierarchy = CategoryHierarchy::new(
                Arc::new(MemoryCategoryStore::new()),
                Arc::new(MemoryProductRegistry::new()),
            );
            (hierarchy, None)
        }
        StoreBackend::Postgres => {
            let db = DatabaseManager::connect(&config.database).await?;
            if config.database.run_migrations {
                db.migrate().await?;
            }
            let hierarchy = CategoryHierarchy::new(
                Arc::new(PgCategoryStore::new(db.pool().clone())),
                Arc::new(PgProductRegistry::new(db.pool().clone())),
            );
            (hierarchy, Some(db))
        }
    };

    let hierarchy = hierarchy.with_limits(config.filter.default_limit, config.filter.max_limit);
    Ok((hierarchy, db))
}
