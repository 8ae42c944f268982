//! Mentor client listing with an explicit fallback strategy.

use crate::models::Principal;
use crate::services::principal_store::PrincipalStoreError;
use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

/// One way of listing a mentor's clients.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Short name for logs.
    fn strategy_name(&self) -> &'static str;

    async fn clients_of(&self, mentor_id: Uuid) -> Result<Vec<Principal>, PrincipalStoreError>;
}

/// Which strategy produced a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedBy {
    Primary,
    Fallback,
}

impl ServedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServedBy::Primary => "primary",
            ServedBy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ServedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tries `primary`, then `fallback`. Order is fixed.
pub struct FallbackClientDirectory<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackClientDirectory<P, F>
where
    P: ClientDirectory,
    F: ClientDirectory,
{
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    pub async fn list_clients(
        &self,
        mentor_id: Uuid,
    ) -> Result<(Vec<Principal>, ServedBy), PrincipalStoreError> {
        match self.primary.clients_of(mentor_id).await {
            Ok(clients) => Ok((clients, ServedBy::Primary)),
            Err(e) => {
                tracing::warn!(
                    mentor_id = %mentor_id,
                    strategy = self.primary.strategy_name(),
                    fallback = self.fallback.strategy_name(),
                    error = %e,
                    "Primary client directory failed, using fallback"
                );
                let clients = self.fallback.clients_of(mentor_id).await?;
                Ok((clients, ServedBy::Fallback))
            }
        }
    }
}
