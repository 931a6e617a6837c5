use std::{path::PathBuf, sync::Arc};
use dash_loop::ManifestEngine;

/// Shared, read-only state handed to every request handler.
/// The engine is fully loaded and converted to live before the router is built.
#[derive(Clone, Debug)]
pub struct AppState {
    pub engine: Arc<ManifestEngine>,
    /// Directory holding one sub-directory of fragment files per representation id.
    pub base_dir: Arc<PathBuf>,
}
