//! Token normalization
//!
//! Turns the account payload from a provider exchange into canonical
//! [`SessionClaims`]. Pure: the clock and session lifetime are inputs.

use crate::models::{AuthType, ProviderAccount, SessionClaims, Workspace};
use crate::session::SessionError;
use chrono::{DateTime, Duration, Utc};

/// Build session claims from a provider account
///
/// When no account is given, or the account carries no access token, no
/// authentication event happened and `existing` is returned untouched.
///
/// # Errors
///
/// Returns [`SessionError::InvalidProviderResponse`] when an access token is
/// present but the bot id, workspace id, or workspace name is missing.
pub fn normalize(
    existing: Option<SessionClaims>,
    account: Option<&ProviderAccount>,
    now: DateTime<Utc>,
    lifetime: Duration,
) -> Result<Option<SessionClaims>, SessionError> {
    let Some(account) = account else {
        return Ok(existing);
    };
    let Some(access_token) = account.access_token() else {
        log::debug!(
            "Account from provider '{}' carries no access token, keeping existing claims",
            account.provider
        );
        return Ok(existing);
    };

    let bot_id = account
        .bot_id
        .as_ref()
        .map(ToString::to_string)
        .ok_or_else(|| missing("bot_id"))?;
    let workspace_id = account
        .workspace_id
        .as_ref()
        .map(ToString::to_string)
        .ok_or_else(|| missing("workspace_id"))?;
    let workspace_name = account
        .workspace_name
        .clone()
        .ok_or_else(|| missing("workspace_name"))?;

    Ok(Some(SessionClaims {
        access_token: access_token.to_string(),
        bot_id,
        auth_type: AuthType::from_provider(&account.provider),
        workspace: Workspace {
            id: workspace_id,
            name: workspace_name,
            icon: account.workspace_icon.clone(),
        },
        authenticated_at: now,
        expires_at: now + lifetime,
    }))
}

fn missing(field: &str) -> SessionError {
    SessionError::InvalidProviderResponse(format!("account is missing `{field}`"))
}
