//! Application state shared by every handler.

use crate::auth::JwtVerifier;
use crate::services::media::MediaService;
use folio_core::Config;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub media: Arc<MediaService>,
    pub verifier: Arc<JwtVerifier>,
}
