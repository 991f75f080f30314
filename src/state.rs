use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::ai::{analyzer::ExamAnalyzer, generator::QuestionGenerator};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub generator: Arc<QuestionGenerator>,
    pub analyzer: Arc<ExamAnalyzer>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<QuestionGenerator> {
    fn from_ref(state: &AppState) -> Self {
        state.generator.clone()
    }
}

impl FromRef<AppState> for Arc<ExamAnalyzer> {
    fn from_ref(state: &AppState) -> Self {
        state.analyzer.clone()
    }
}
