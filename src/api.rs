//! HTTP API for the chat dashboard

mod assets;
mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::config::FeatureFlags;
use crate::dashboard::DashboardLayout;
use crate::runtime::ProductionRuntime;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ProductionRuntime>,
    pub layout: Arc<DashboardLayout>,
}

impl AppState {
    pub fn new(runtime: ProductionRuntime, features: FeatureFlags) -> Self {
        Self {
            runtime: Arc::new(runtime),
            layout: Arc::new(DashboardLayout::new(features)),
        }
    }

    pub fn features(&self) -> FeatureFlags {
        self.layout.features
    }
}
