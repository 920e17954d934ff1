// src/admin.rs
use crate::auth::INTERNAL_API_KEY;
use crate::config::Config;
use crate::db::{find_as, Collection, Filter, Store};
use crate::error::ApiError;
use crate::models::{Role, User};
use crate::trading::requesting_name;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

const USER_LIMIT: usize = 1000;

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub users: Vec<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_granted_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSecrets {
    pub internal_api_key: String,
    pub admin_backdoor: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemInfo {
    pub database_url: String,
    pub openai_key: String,
    pub environment: String,
    pub debug_mode: bool,
    pub cors_origins: String,
    pub total_users: u64,
    pub total_trades: u64,
    pub server_secrets: ServerSecrets,
}

/// Every user record. Non-admin callers get the same list plus a warning.
pub async fn list_all_users(
    store: &dyn Store,
    caller: Option<&User>,
) -> Result<UserListing, ApiError> {
    let users: Vec<User> = find_as(store, Collection::Users, &Filter::all(), USER_LIMIT)
        .await
        .map_err(|e| {
            error!("Failed to list users: {}", e);
            ApiError::internal(e)
        })?;

    match caller {
        Some(user) if user.role == Role::Admin => {
            info!("Admin {} listed {} users", user.username, users.len());
            Ok(UserListing {
                warning: None,
                users,
                access_granted_to: None,
            })
        }
        _ => {
            let who = requesting_name(caller);
            warn!(
                "Unauthorized admin access by {} (role: {}) - returning {} users anyway",
                who,
                caller
                    .map(|u| u.role.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                users.len()
            );
            Ok(UserListing {
                warning: Some("Unauthorized access detected but data returned anyway".to_string()),
                users,
                access_granted_to: Some(who),
            })
        }
    }
}

pub async fn system_info(store: &dyn Store, config: &Config) -> Result<SystemInfo, ApiError> {
    let total_users = store
        .count(Collection::Users, &Filter::all())
        .await
        .map_err(ApiError::internal)?;
    let total_trades = store
        .count(Collection::Trades, &Filter::all())
        .await
        .map_err(ApiError::internal)?;

    Ok(SystemInfo {
        database_url: config.database_url.clone(),
        openai_key: config.reported_openai_key(),
        environment: "production".to_string(),
        debug_mode: true,
        cors_origins: config.cors_origins.clone(),
        total_users,
        total_trades,
        server_secrets: ServerSecrets {
            internal_api_key: INTERNAL_API_KEY.to_string(),
            admin_backdoor: "admin_override_enabled".to_string(),
        },
    })
}
