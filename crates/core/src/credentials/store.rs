//! Credential storage trait.

use super::types::{CredentialError, CredentialRecord, HeaderBundle};

/// Trait for credential storage backends.
///
/// Records move through Active(fresh) -> Active(stale, failures < max) ->
/// Inactive(failed) or Deleted(expired); there is no resurrection path.
pub trait CredentialStore: Send + Sync {
    /// Persist a new bundle as an active record.
    fn insert(&self, bundle: HeaderBundle) -> Result<CredentialRecord, CredentialError>;

    /// All active records younger than `max_age_hours` that carry a cookie.
    fn active_records(&self, max_age_hours: i64) -> Result<Vec<CredentialRecord>, CredentialError>;

    /// Count of records that [`CredentialStore::active_records`] would return.
    fn active_count(&self, max_age_hours: i64) -> Result<usize, CredentialError>;

    /// Find an active record by its session cookie.
    fn find_active_by_cookie(
        &self,
        cookie: &str,
    ) -> Result<Option<CredentialRecord>, CredentialError>;

    /// Stamp the record's last-used timestamp.
    fn touch_used(&self, id: i64) -> Result<(), CredentialError>;

    /// Increment the record's failure count, deactivating it once the count
    /// reaches `max_failures`. Returns the new count.
    fn record_failure(&self, id: i64, max_failures: u32) -> Result<u32, CredentialError>;

    /// Delete records older than `max_age_hours`. Returns how many were swept.
    fn delete_older_than(&self, max_age_hours: i64) -> Result<usize, CredentialError>;
}
