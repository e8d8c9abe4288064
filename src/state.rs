use std::sync::Arc;

use crate::{config::Config, store::AcademyStore};
use axum::extract::FromRef;

/// Store handle shared by every handler.
pub type SharedStore = Arc<dyn AcademyStore>;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Config,
}

impl FromRef<AppState> for SharedStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
