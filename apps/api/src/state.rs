use std::sync::Arc;

use sqlx::PgPool;

use crate::analysis::analyzer::Analyzer;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Stateless analysis pipeline; one instance serves every request.
    pub analyzer: Arc<Analyzer>,
    pub config: Config,
}
