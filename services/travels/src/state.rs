//! Application state shared across handlers

use std::sync::Arc;

use crate::config::TravelsConfig;
use crate::lifecycle::TravelLifecycle;
use crate::matching::MatchingEngine;
use crate::store::{Registry, RequestTravelStore, TravelStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub requests: Arc<dyn RequestTravelStore>,
    pub travels: Arc<dyn TravelStore>,
    pub registry: Arc<dyn Registry>,
    pub matching: MatchingEngine,
    pub lifecycle: TravelLifecycle,
    pub config: TravelsConfig,
}
