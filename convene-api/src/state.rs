//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use convene_storage::Store;

use crate::auth::SessionAuthority;
use crate::procedures::ProcedureRouter;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub procedures: ProcedureRouter,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, sessions: Arc<dyn SessionAuthority>) -> Self {
        Self {
            procedures: ProcedureRouter::new(store, sessions),
            start_time: Instant::now(),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        self.procedures.store()
    }
}

impl FromRef<AppState> for ProcedureRouter {
    fn from_ref(state: &AppState) -> Self {
        state.procedures.clone()
    }
}
