//! Read-only reporting endpoints under `/analytics`.

use crate::client::ApiClient;
use crate::errors::CrmResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityCount {
    pub city: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionFunnel {
    pub new: u64,
    pub contacted: u64,
    pub interested: u64,
    pub deal: u64,
    /// Pre-formatted percentage, e.g. `"2.50"`.
    #[serde(rename = "conversionRate")]
    pub conversion_rate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub total: u64,
    pub new: u64,
    pub contacted: u64,
    pub interested: u64,
    pub deal: u64,
    #[serde(rename = "conversionRate")]
    pub conversion_rate: f64,
    #[serde(rename = "topCities", default)]
    pub top_cities: Vec<CityCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub total: u64,
    pub deal: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessInsight {
    #[serde(rename = "type")]
    pub kind: String,
    pub total: u64,
    pub new: u64,
    pub contacted: u64,
    pub interested: u64,
    pub deal: u64,
    #[serde(rename = "conversionRate")]
    pub conversion_rate: f64,
    #[serde(rename = "avgDaysToConversion")]
    pub avg_days_to_conversion: f64,
}

/// Window and category filter for `/analytics/trends`. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrendQuery {
    #[serde(rename = "startDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct AnalyticsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AnalyticsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn cities(&self) -> CrmResult<Vec<CityCount>> {
        self.client.get("/analytics/cities").await
    }

    pub async fn categories(&self) -> CrmResult<Vec<CategoryCount>> {
        self.client.get("/analytics/categories").await
    }

    pub async fn statuses(&self) -> CrmResult<Vec<StatusCount>> {
        self.client.get("/analytics/status").await
    }

    pub async fn funnel(&self) -> CrmResult<ConversionFunnel> {
        self.client.get("/analytics/funnel").await
    }

    pub async fn category_breakdown(&self) -> CrmResult<Vec<CategoryBreakdown>> {
        self.client.get("/analytics/categories/detailed").await
    }

    pub async fn trends(&self, query: &TrendQuery) -> CrmResult<Vec<TrendPoint>> {
        self.client.get_with("/analytics/trends", query).await
    }

    pub async fn business_insights(&self) -> CrmResult<Vec<BusinessInsight>> {
        self.client.get("/analytics/business-insights").await
    }
}
