use crate::api::resource_path;
use crate::api::types::Province;
use crate::client::ApiClient;
use crate::errors::CrmResult;
use serde::{Deserialize, Serialize};

const PROVINCES: &str = "/provinces";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedResponse {
    pub message: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ProvincesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ProvincesApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> CrmResult<Vec<Province>> {
        self.client.get(PROVINCES).await
    }

    pub async fn get(&self, id: &str) -> CrmResult<Province> {
        self.client.get(&resource_path(PROVINCES, id, "")).await
    }

    /// Populate the province table with the built-in list.
    pub async fn seed(&self) -> CrmResult<SeedResponse> {
        self.client.post_empty("/provinces/seed").await
    }
}
