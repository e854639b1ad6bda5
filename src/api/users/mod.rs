use crate::api::resource_path;
use crate::api::types::{Role, User};
use crate::client::ApiClient;
use crate::errors::CrmResult;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

const USERS: &str = "/users";

#[derive(Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
    pub role: Role,
    #[serde(rename = "provinceId", skip_serializing_if = "Option::is_none")]
    pub province_id: Option<String>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("province_id", &self.province_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "provinceId", skip_serializing_if = "Option::is_none")]
    pub province_id: Option<String>,
    #[serde(rename = "isActive", skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Serialize)]
struct AssignProvinceBody<'a> {
    #[serde(rename = "provinceId")]
    province_id: &'a str,
}

/// `/users` administration. The backend restricts these to superadmins.
#[derive(Debug, Clone, Copy)]
pub struct UsersApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UsersApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> CrmResult<Vec<User>> {
        self.client.get(USERS).await
    }

    pub async fn get(&self, id: &str) -> CrmResult<User> {
        self.client.get(&resource_path(USERS, id, "")).await
    }

    pub async fn create(&self, user: &NewUser) -> CrmResult<User> {
        self.client.post(USERS, user).await
    }

    pub async fn update(&self, id: &str, update: &UserUpdate) -> CrmResult<User> {
        self.client.patch(&resource_path(USERS, id, ""), update).await
    }

    pub async fn assign_province(&self, user_id: &str, province_id: &str) -> CrmResult<User> {
        self.client
            .patch(
                &resource_path(USERS, user_id, "/province"),
                &AssignProvinceBody { province_id },
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> CrmResult<()> {
        let _: Value = self.client.delete(&resource_path(USERS, id, "")).await?;
        Ok(())
    }
}
