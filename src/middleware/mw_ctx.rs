use crate::config::AppConfig;
use crate::database::client::Database;
use crate::interfaces::identity::IdentityVerifier;
use crate::utils::identity::UpstreamHeaderIdentity;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub struct CtxState {
    pub db: Database,
    pub is_development: bool,
    pub identity: Arc<dyn IdentityVerifier + Send + Sync>,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Debug for CtxState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtxState")
            .field("is_development", &self.is_development)
            .field("default_page_size", &self.default_page_size)
            .field("max_page_size", &self.max_page_size)
            .finish_non_exhaustive()
    }
}

pub fn create_ctx_state(db: Database, config: &AppConfig) -> Arc<CtxState> {
    let ctx_state = CtxState {
        db,
        is_development: config.is_development,
        identity: Arc::new(UpstreamHeaderIdentity::new(&config.identity_header)),
        default_page_size: config.default_page_size,
        max_page_size: config.max_page_size,
    };
    Arc::new(ctx_state)
}
