//! Typed wrappers over the CRM REST endpoints.
//!
//! Each group borrows an [`ApiClient`] and inherits its auth behaviour:
//! bearer injection, one refresh-and-retry on `401`, and session teardown
//! when the session cannot be recovered.

pub mod analytics;
pub mod auth;
pub mod leads;
pub mod proposals;
pub mod provinces;
pub mod types;
pub mod users;

use crate::client::ApiClient;

pub use analytics::AnalyticsApi;
pub use auth::AuthApi;
pub use leads::LeadsApi;
pub use proposals::ProposalsApi;
pub use provinces::ProvincesApi;
pub use users::UsersApi;

/// Build `/{collection}/{id}{suffix}` with `id` percent-encoded as one segment.
pub(crate) fn resource_path(collection: &str, id: &str, suffix: &str) -> String {
    format!("{}/{}{}", collection, urlencoding::encode(id), suffix)
}

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn leads(&self) -> LeadsApi<'_> {
        LeadsApi::new(self)
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(self)
    }

    pub fn provinces(&self) -> ProvincesApi<'_> {
        ProvincesApi::new(self)
    }

    pub fn proposals(&self) -> ProposalsApi<'_> {
        ProposalsApi::new(self)
    }

    pub fn analytics(&self) -> AnalyticsApi<'_> {
        AnalyticsApi::new(self)
    }
}
