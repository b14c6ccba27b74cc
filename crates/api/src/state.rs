use std::sync::Arc;

use takeone_pipeline::SceneSearchService;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already a handle.
#[derive(Clone)]
pub struct AppState {
    /// The scene search service (segmentation, index, query pipeline).
    pub service: Arc<SceneSearchService>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Cancelled when the server begins shutting down; long-running
    /// segmentation requests observe a child of this token.
    pub shutdown: CancellationToken,
}
