//! # Identity Boundary
//!
//! Every read and write is scoped to the acting owner. The hosted backend's
//! auth internals stay outside this crate; the store only asks for an id.

use async_trait::async_trait;

use crate::error::{DbError, DbResult};

/// Source of the current acting identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Returns the current owner id, or `DbError::Unauthenticated`.
    async fn current_owner(&self) -> DbResult<String>;
}

/// Identity fixed at construction, from configuration or a CLI flag.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    owner_id: Option<String>,
}

impl StaticIdentity {
    pub fn new(owner_id: impl Into<String>) -> Self {
        StaticIdentity {
            owner_id: Some(owner_id.into()),
        }
    }

    /// No one is signed in. Every scoped operation fails.
    pub fn anonymous() -> Self {
        StaticIdentity { owner_id: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_owner(&self) -> DbResult<String> {
        match self.owner_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(DbError::Unauthenticated),
        }
    }
}
