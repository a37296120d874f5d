//! Shared application state injected into every handler.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::services::{Reconciler, ResolverService, Sweeper};
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::MappingRepository;
use crate::infrastructure::cache::CacheService;

/// Handles to the services behind the HTTP surface.
///
/// Cloned per request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ResolverService>,
    pub reconciler: Arc<Reconciler>,
    pub sweeper: Arc<Sweeper>,
    pub repository: Arc<dyn MappingRepository>,
    pub cache: Arc<dyn CacheService>,
    /// Producer side of the analytics queue, kept for health reporting.
    pub click_sender: mpsc::Sender<ClickEvent>,
    /// Read the client IP from proxy headers instead of the peer address.
    pub behind_proxy: bool,
}
