use std::sync::Arc;

use crate::application::posts::PostAccess;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub posts: Arc<dyn PostAccess>,
    /// Probed by `/healthz` when present.
    pub db: Option<Arc<PostgresRepositories>>,
}

impl ApiState {
    pub fn new(posts: Arc<dyn PostAccess>) -> Self {
        Self { posts, db: None }
    }

    pub fn with_db(mut self, db: Arc<PostgresRepositories>) -> Self {
        self.db = Some(db);
        self
    }
}
