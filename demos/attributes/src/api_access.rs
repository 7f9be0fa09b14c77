use std::sync::Arc;

use chrono::{DateTime, Utc};
use opbind_sdk::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Store, Tables};

pub const MAX_CLIENT_ID_LENGTH: usize = 255;
pub const MAX_CLIENT_NAME_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 21_844;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EditableApiAccess {
    pub api_access_id: i64,
    pub client_id: String,
    pub client_name: String,
    pub enabled: bool,
    pub description: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct ApiAccessResource {
    pub api_access_id: i64,
    pub client_id: String,
    pub client_name: String,
    pub enabled: bool,
    pub description: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A broken API access constraint.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ApiAccessConstraint {
    #[error("client id {0:?} is already used")]
    ClientIdAlreadyUsed(String),
    #[error("client name {0:?} is already used")]
    ClientNameAlreadyUsed(String),
    #[error("client id is invalid")]
    InvalidClientId,
    #[error("client name is invalid")]
    InvalidClientName,
    #[error("client id cannot be longer than {MAX_CLIENT_ID_LENGTH} characters")]
    ClientIdTooLarge,
    #[error("client name cannot be longer than {MAX_CLIENT_NAME_LENGTH} characters")]
    ClientNameTooLarge,
    #[error("description cannot be longer than {MAX_DESCRIPTION_LENGTH} characters")]
    DescriptionTooLarge,
}

impl From<ApiAccessConstraint> for OperationError {
    fn from(err: ApiAccessConstraint) -> Self {
        match err {
            ApiAccessConstraint::ClientIdAlreadyUsed(_)
            | ApiAccessConstraint::ClientNameAlreadyUsed(_) => {
                OperationError::rejected(err.to_string())
            }
            _ => OperationError::invalid_input(err.to_string()),
        }
    }
}

/// Gets API access for editing.
#[derive(Debug, Operation)]
#[operation(query, domain = "ApiAccess")]
pub struct GetApiAccessForEditing {
    pub api_access_id: i64,
}

/// Adds an API access (client credentials).
#[derive(Debug, Operation)]
#[operation(command, domain = "ApiAccess")]
pub struct AddApiAccess {
    pub client_id: String,
    pub client_name: String,
    #[param(default = true)]
    pub enabled: bool,
    #[param(default)]
    pub description: String,
    #[param(default)]
    pub scopes: Vec<String>,
    #[setter]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Edits an API access.
#[derive(Debug, Operation)]
#[operation(command, domain = "ApiAccess")]
pub struct EditApiAccess {
    pub api_access_id: i64,
    #[setter]
    pub client_name: Option<String>,
    #[setter]
    pub enabled: Option<bool>,
    #[setter]
    pub description: Option<String>,
    #[setter]
    pub scopes: Option<Vec<String>>,
    #[setter(with = "expire_at")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl EditApiAccess {
    fn expire_at(&mut self, expires_at: DateTime<Utc>) {
        self.expires_at = Some(expires_at);
    }
}

#[derive(Clone, Debug)]
pub struct ApiAccessHandlers {
    store: Arc<Store>,
}

impl ApiAccessHandlers {
    pub fn new(store: Arc<Store>) -> Self {
        ApiAccessHandlers { store }
    }
}

impl Handler<GetApiAccessForEditing> for ApiAccessHandlers {
    type Output = EditableApiAccess;

    async fn handle(&self, query: GetApiAccessForEditing) -> Result<EditableApiAccess, OperationError> {
        self.store
            .read()
            .await
            .api_accesses
            .get(&query.api_access_id)
            .cloned()
            .ok_or_else(|| api_access_not_found(query.api_access_id))
    }
}

impl Handler<AddApiAccess> for ApiAccessHandlers {
    type Output = EditableApiAccess;

    async fn handle(&self, command: AddApiAccess) -> Result<EditableApiAccess, OperationError> {
        validate_client_id(&command.client_id)?;
        validate_client_name(&command.client_name)?;
        validate_description(&command.description)?;

        let mut tables = self.store.write().await;
        if tables
            .api_accesses
            .values()
            .any(|access| access.client_id == command.client_id)
        {
            return Err(ApiAccessConstraint::ClientIdAlreadyUsed(command.client_id).into());
        }
        ensure_client_name_unused(&tables, &command.client_name, None)?;

        let access = EditableApiAccess {
            api_access_id: tables.next_api_access_id(),
            client_id: command.client_id,
            client_name: command.client_name,
            enabled: command.enabled,
            description: command.description,
            scopes: command.scopes,
            expires_at: command.expires_at,
        };
        tables
            .api_accesses
            .insert(access.api_access_id, access.clone());

        Ok(access)
    }
}

impl Handler<EditApiAccess> for ApiAccessHandlers {
    type Output = EditableApiAccess;

    async fn handle(&self, command: EditApiAccess) -> Result<EditableApiAccess, OperationError> {
        let mut tables = self.store.write().await;
        let Some(current) = tables.api_accesses.get(&command.api_access_id) else {
            return Err(api_access_not_found(command.api_access_id));
        };

        let mut access = current.clone();
        if let Some(client_name) = command.client_name {
            validate_client_name(&client_name)?;
            ensure_client_name_unused(&tables, &client_name, Some(access.api_access_id))?;
            access.client_name = client_name;
        }
        if let Some(enabled) = command.enabled {
            access.enabled = enabled;
        }
        if let Some(description) = command.description {
            validate_description(&description)?;
            access.description = description;
        }
        if let Some(scopes) = command.scopes {
            access.scopes = scopes;
        }
        if command.expires_at.is_some() {
            access.expires_at = command.expires_at;
        }

        tables
            .api_accesses
            .insert(access.api_access_id, access.clone());
        Ok(access)
    }
}

fn api_access_not_found(api_access_id: i64) -> OperationError {
    OperationError::not_found(format!("API access {api_access_id} not found"))
}

fn ensure_client_name_unused(
    tables: &Tables,
    client_name: &str,
    except: Option<i64>,
) -> Result<(), ApiAccessConstraint> {
    let used = tables.api_accesses.values().any(|access| {
        Some(access.api_access_id) != except && access.client_name == client_name
    });
    if used {
        return Err(ApiAccessConstraint::ClientNameAlreadyUsed(client_name.to_string()));
    }
    Ok(())
}

fn validate_client_id(client_id: &str) -> Result<(), ApiAccessConstraint> {
    if client_id.chars().count() > MAX_CLIENT_ID_LENGTH {
        return Err(ApiAccessConstraint::ClientIdTooLarge);
    }
    let valid = !client_id.is_empty()
        && client_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(ApiAccessConstraint::InvalidClientId);
    }
    Ok(())
}

fn validate_client_name(client_name: &str) -> Result<(), ApiAccessConstraint> {
    if client_name.chars().count() > MAX_CLIENT_NAME_LENGTH {
        return Err(ApiAccessConstraint::ClientNameTooLarge);
    }
    if client_name.trim().is_empty() || client_name.contains(['<', '>', '{', '}']) {
        return Err(ApiAccessConstraint::InvalidClientName);
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ApiAccessConstraint> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiAccessConstraint::DescriptionTooLarge);
    }
    Ok(())
}
