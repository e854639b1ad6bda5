use crate::api::resource_path;
use crate::api::types::{Lead, LeadStatus, Rating};
use crate::client::ApiClient;
use crate::errors::CrmResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const LEADS: &str = "/leads";

/// Filters for `GET /leads`. Unset fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeadQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Sent as repeated `status=` keys.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<LeadStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadsPage {
    pub data: Vec<Lead>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadStats {
    pub total: u64,
    pub contacted: u64,
    pub interested: u64,
    pub deal: u64,
}

/// Distinct filter values known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadFacets {
    pub cities: Vec<String>,
    pub categories: Vec<String>,
}

/// Partial update for `PATCH /leads/{id}`; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeadUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    /// `Some(None)` clears the website.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(rename = "provinceId", skip_serializing_if = "Option::is_none")]
    pub province_id: Option<String>,
}

#[derive(Serialize)]
struct StatusBody {
    status: LeadStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct LeadsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> LeadsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &LeadQuery) -> CrmResult<LeadsPage> {
        self.client.get_with(LEADS, query).await
    }

    pub async fn get(&self, id: &str) -> CrmResult<Lead> {
        self.client.get(&resource_path(LEADS, id, "")).await
    }

    /// Create a lead. Any `id` on `lead` is ignored by the backend.
    pub async fn create(&self, lead: &Lead) -> CrmResult<Lead> {
        self.client.post(LEADS, lead).await
    }

    pub async fn update(&self, id: &str, update: &LeadUpdate) -> CrmResult<Lead> {
        self.client.patch(&resource_path(LEADS, id, ""), update).await
    }

    pub async fn update_status(&self, id: &str, status: LeadStatus) -> CrmResult<Lead> {
        self.client
            .patch(&resource_path(LEADS, id, "/status"), &StatusBody { status })
            .await
    }

    pub async fn delete(&self, id: &str) -> CrmResult<()> {
        let _: Value = self.client.delete(&resource_path(LEADS, id, "")).await?;
        Ok(())
    }

    pub async fn stats(&self) -> CrmResult<LeadStats> {
        self.client.get("/leads/stats").await
    }

    pub async fn facets(&self) -> CrmResult<LeadFacets> {
        self.client.get("/leads/meta").await
    }
}
