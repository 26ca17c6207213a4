//! Read/write authorisation hooks.
//!
//! Membership and tenancy are enforced outside this pipeline; these checks are
//! the narrow interface through which the pipeline asks before it writes.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("access denied: {0}")]
pub struct AccessError(pub String);

#[async_trait]
pub trait AccessGuard: Send + Sync {
  async fn assert_read_access(&self, search_id: Uuid) -> Result<(), AccessError>;

  async fn assert_write_allowed(&self, organization_id: Uuid) -> Result<(), AccessError>;
}

/// Guard for deployments where an upstream gateway already authorised the
/// request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AccessGuard for AllowAll {
  async fn assert_read_access(&self, _search_id: Uuid) -> Result<(), AccessError> { Ok(()) }

  async fn assert_write_allowed(&self, _organization_id: Uuid) -> Result<(), AccessError> {
    Ok(())
  }
}
