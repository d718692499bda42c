use std::sync::Arc;

use crate::provider::OidcProvider;

/// Shared state of the OIDC handlers.
pub(crate) struct OidcState {
    pub provider: Arc<OidcProvider>,
    /// Public URL the routes are served below, ending with `/`.
    pub root_url: String,
}
