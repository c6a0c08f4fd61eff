//! Shared application state every handler receives through axum's
//! `State` extractor.

use std::sync::Arc;

use platform_core::Platform;

#[derive(Clone)]
pub struct AppState(pub Arc<Platform>);

impl std::ops::Deref for AppState {
    type Target = Platform;

    fn deref(&self) -> &Platform {
        &self.0
    }
}
