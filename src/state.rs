use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    repository::{ProgramCatalog, ResultStore, TestCatalog},
    services::submission::SubmissionDeps,
};

#[derive(Clone)]
pub struct AppState {
    pub tests: Arc<dyn TestCatalog>,
    pub programs: Arc<dyn ProgramCatalog>,
    pub results: Arc<dyn ResultStore>,
    pub config: Config,
}

impl AppState {
    /// Wires every contract to one store (PostgreSQL or in-memory).
    pub fn from_store<S>(store: Arc<S>, config: Config) -> Self
    where
        S: TestCatalog + ProgramCatalog + ResultStore + 'static,
    {
        Self {
            tests: store.clone(),
            programs: store.clone(),
            results: store,
            config,
        }
    }

    pub fn submission_deps(&self) -> SubmissionDeps<'_> {
        SubmissionDeps {
            tests: self.tests.as_ref(),
            programs: self.programs.as_ref(),
            results: self.results.as_ref(),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
