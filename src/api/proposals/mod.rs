use crate::api::resource_path;
use crate::client::ApiClient;
use crate::errors::CrmResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const PROPOSALS: &str = "/proposals";
const TEMPLATES: &str = "/proposals/templates";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub lead_id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub generated_by: String,
    pub status: ProposalStatus,
    pub created_at: String,
    pub updated_at: String,
    /// Joined lead row, when the backend includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leads: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_templates: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProposalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProposalStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub content: String,
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateProposal {
    #[serde(rename = "leadId")]
    pub lead_id: String,
    #[serde(rename = "templateId", skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTemplate {
    pub name: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "isDefault", skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "isDefault", skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

#[derive(Serialize)]
struct ProposalFilter<'a> {
    #[serde(rename = "leadId", skip_serializing_if = "Option::is_none")]
    lead_id: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct ProposalsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ProposalsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Draft a proposal for a lead, optionally from a specific template.
    pub async fn generate(&self, request: &GenerateProposal) -> CrmResult<Proposal> {
        self.client.post("/proposals/generate", request).await
    }

    pub async fn list(&self, lead_id: Option<&str>) -> CrmResult<Vec<Proposal>> {
        self.client
            .get_with(PROPOSALS, &ProposalFilter { lead_id })
            .await
    }

    pub async fn get(&self, id: &str) -> CrmResult<Proposal> {
        self.client.get(&resource_path(PROPOSALS, id, "")).await
    }

    pub async fn update(&self, id: &str, update: &ProposalUpdate) -> CrmResult<Proposal> {
        self.client
            .patch(&resource_path(PROPOSALS, id, ""), update)
            .await
    }

    pub async fn delete(&self, id: &str) -> CrmResult<()> {
        let _: Value = self
            .client
            .delete(&resource_path(PROPOSALS, id, ""))
            .await?;
        Ok(())
    }

    pub async fn templates(&self) -> CrmResult<Vec<ProposalTemplate>> {
        self.client.get("/proposals/templates/list").await
    }

    pub async fn template(&self, id: &str) -> CrmResult<ProposalTemplate> {
        self.client.get(&resource_path(TEMPLATES, id, "")).await
    }

    pub async fn create_template(&self, template: &NewTemplate) -> CrmResult<ProposalTemplate> {
        self.client.post(TEMPLATES, template).await
    }

    pub async fn update_template(
        &self,
        id: &str,
        update: &TemplateUpdate,
    ) -> CrmResult<ProposalTemplate> {
        self.client
            .patch(&resource_path(TEMPLATES, id, ""), update)
            .await
    }

    pub async fn delete_template(&self, id: &str) -> CrmResult<()> {
        let _: Value = self
            .client
            .delete(&resource_path(TEMPLATES, id, ""))
            .await?;
        Ok(())
    }
}
