use super::{
    AnalyticsCommands, LeadCommands, ProposalCommands, ProvinceCommands, UserCommands, print_json,
};
use crate::api::analytics::TrendQuery;
use crate::api::leads::LeadQuery;
use crate::api::proposals::GenerateProposal;
use crate::auth::AuthManager;
use crate::client::ApiClient;
use crate::config::{Config, get_config_path};
use anyhow::Result;
use serde_json::json;

pub(super) fn status(config: &Config, auth: &AuthManager) -> Result<()> {
    let config_path = get_config_path()?;
    let session_path = config.storage.resolved_path()?;
    print_json(&json!({
        "version": crate::VERSION,
        "config": {
            "path": config_path.display().to_string(),
            "exists": config_path.exists(),
        },
        "api": {
            "baseUrl": config.api.base_url,
            "timeoutSecs": config.api.timeout_secs,
        },
        "session": {
            "path": session_path.display().to_string(),
            "authenticated": auth.is_authenticated(),
            "user": auth.current_user(),
        },
    }))
}

pub(super) async fn leads(client: &ApiClient, cmd: LeadCommands) -> Result<()> {
    let api = client.leads();
    match cmd {
        LeadCommands::List {
            page,
            limit,
            search,
            city,
            category,
            status,
        } => {
            let query = LeadQuery {
                page,
                limit,
                search,
                city,
                category,
                status,
            };
            print_json(&api.list(&query).await?)?;
        }
        LeadCommands::Get { id } => print_json(&api.get(&id).await?)?,
        LeadCommands::Stats => print_json(&api.stats().await?)?,
        LeadCommands::Meta => print_json(&api.facets().await?)?,
        LeadCommands::SetStatus { id, status } => {
            print_json(&api.update_status(&id, status).await?)?;
        }
        LeadCommands::Delete { id } => {
            api.delete(&id).await?;
            println!("Deleted lead {}", id);
        }
    }
    Ok(())
}

pub(super) async fn users(client: &ApiClient, cmd: UserCommands) -> Result<()> {
    let api = client.users();
    match cmd {
        UserCommands::List => print_json(&api.list().await?)?,
        UserCommands::AssignProvince {
            user_id,
            province_id,
        } => print_json(&api.assign_province(&user_id, &province_id).await?)?,
    }
    Ok(())
}

pub(super) async fn provinces(client: &ApiClient, cmd: ProvinceCommands) -> Result<()> {
    let api = client.provinces();
    match cmd {
        ProvinceCommands::List => print_json(&api.list().await?)?,
        ProvinceCommands::Seed => print_json(&api.seed().await?)?,
    }
    Ok(())
}

pub(super) async fn proposals(client: &ApiClient, cmd: ProposalCommands) -> Result<()> {
    let api = client.proposals();
    match cmd {
        ProposalCommands::List { lead } => print_json(&api.list(lead.as_deref()).await?)?,
        ProposalCommands::Generate { lead, template } => {
            let request = GenerateProposal {
                lead_id: lead,
                template_id: template,
            };
            print_json(&api.generate(&request).await?)?;
        }
        ProposalCommands::Templates => print_json(&api.templates().await?)?,
    }
    Ok(())
}

pub(super) async fn analytics(client: &ApiClient, cmd: AnalyticsCommands) -> Result<()> {
    let api = client.analytics();
    match cmd {
        AnalyticsCommands::Cities => print_json(&api.cities().await?)?,
        AnalyticsCommands::Categories => print_json(&api.categories().await?)?,
        AnalyticsCommands::Status => print_json(&api.statuses().await?)?,
        AnalyticsCommands::Funnel => print_json(&api.funnel().await?)?,
        AnalyticsCommands::Detailed => print_json(&api.category_breakdown().await?)?,
        AnalyticsCommands::Trends { from, to, category } => {
            let query = TrendQuery {
                start_date: from,
                end_date: to,
                category,
            };
            print_json(&api.trends(&query).await?)?;
        }
        AnalyticsCommands::Insights => print_json(&api.business_insights().await?)?,
    }
    Ok(())
}
