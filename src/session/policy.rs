//! Client-facing session projection
//!
//! [`project`] derives the [`ClientSession`] view from server-side claims and
//! refuses to return it if anything secret is still attached.

use crate::models::{ClientSession, SessionClaims, WorkspaceView};
use crate::session::SessionError;
use serde::Serialize;
use serde_json::Value;

/// Field names that must never appear on a value sent to a client
pub const SECRET_FIELD_NAMES: &[&str] = &["access_token", "accessToken"];

/// Shorter secrets are only caught by field name; matching them inside values
/// would flag ordinary workspace names
pub const MIN_SCANNED_SECRET_LEN: usize = 8;

/// Project claims into the public session view
///
/// Drops the access token, bot id and workspace id. An absent auth type stays
/// absent.
///
/// # Errors
///
/// Returns [`SessionError::SecurityInvariantViolation`] if the projected view
/// still exposes the access token.
pub fn project(claims: &SessionClaims) -> Result<ClientSession, SessionError> {
    let session = ClientSession {
        auth_type: claims.auth_type,
        workspace: WorkspaceView {
            name: claims.workspace.name.clone(),
            icon: claims.workspace.icon.clone(),
        },
        expires: claims.expires_at,
    };

    ensure_no_secrets(&session, &claims.access_token)?;
    Ok(session)
}

/// Fail closed if `view` names a secret field or contains `secret` anywhere
///
/// Values are only scanned for secrets of at least [`MIN_SCANNED_SECRET_LEN`]
/// characters.
///
/// # Errors
///
/// Returns [`SessionError::SecurityInvariantViolation`] with the JSON path of
/// the offending value.
pub fn ensure_no_secrets<T: Serialize>(view: &T, secret: &str) -> Result<(), SessionError> {
    let value = serde_json::to_value(view).map_err(|e| {
        SessionError::SecurityInvariantViolation(format!("outbound value is not inspectable: {e}"))
    })?;

    let secret = if secret.len() >= MIN_SCANNED_SECRET_LEN {
        secret
    } else {
        ""
    };
    if let Some(path) = find_secret(&value, secret, "$") {
        log::error!("SECURITY: secret material found at {path} on an outbound session view");
        return Err(SessionError::SecurityInvariantViolation(format!(
            "access token exposed at {path}"
        )));
    }

    Ok(())
}

fn find_secret(value: &Value, secret: &str, path: &str) -> Option<String> {
    match value {
        Value::Object(map) => map.iter().find_map(|(key, child)| {
            let child_path = format!("{path}.{key}");
            if SECRET_FIELD_NAMES.contains(&key.as_str()) {
                Some(child_path)
            } else {
                find_secret(child, secret, &child_path)
            }
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(index, child)| find_secret(child, secret, &format!("{path}[{index}]"))),
        Value::String(text) if !secret.is_empty() && text.contains(secret) => {
            Some(path.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthType;
    use crate::testing::TestFixtures;
    use serde_json::json;

    #[test]
    fn test_project_drops_secret_and_workspace_id() {
        let claims = TestFixtures::claims();
        let session = project(&claims).unwrap();

        assert_eq!(session.auth_type, Some(AuthType::Notion));
        assert_eq!(session.workspace.name, claims.workspace.name);
        assert_eq!(session.workspace.icon, claims.workspace.icon);
        assert_eq!(session.expires, claims.expires_at);

        let value = serde_json::to_value(&session).unwrap();
        let rendered = value.to_string();
        assert!(!rendered.contains(&claims.access_token));
        assert!(!rendered.contains(&claims.workspace.id));
        assert!(!rendered.contains(&claims.bot_id));
        assert!(value["workspace"].get("id").is_none());
    }

    #[test]
    fn test_absent_auth_type_stays_absent() {
        let mut claims = TestFixtures::claims();
        claims.auth_type = None;

        let session = project(&claims).unwrap();
        assert_eq!(session.auth_type, None);
    }

    #[test]
    fn test_adversarial_workspace_name_fails_closed() {
        let mut claims = TestFixtures::claims();
        claims.workspace.name = format!("leak {}", claims.access_token);

        let err = project(&claims).unwrap_err();
        assert!(matches!(err, SessionError::SecurityInvariantViolation(_)));
        assert!(err.to_string().contains("$.workspace.name"));
    }

    #[test]
    fn test_adversarial_icon_fails_closed() {
        let mut claims = TestFixtures::claims();
        claims.workspace.icon = Some(claims.access_token.clone());

        assert!(matches!(
            project(&claims),
            Err(SessionError::SecurityInvariantViolation(_))
        ));
    }

    #[test]
    fn test_secret_field_name_is_detected() {
        let leaking = json!({
            "workspace": { "name": "Docs" },
            "user": [{ "accessToken": "whatever" }]
        });

        let err = ensure_no_secrets(&leaking, "unrelated").unwrap_err();
        assert!(err.to_string().contains("$.user[0].accessToken"));

        let leaking = json!({ "access_token": null });
        assert!(ensure_no_secrets(&leaking, "").is_err());
    }

    #[test]
    fn test_clean_view_passes() {
        let clean = json!({ "workspace": { "name": "Docs", "icon": null }, "authType": "notion" });
        assert!(ensure_no_secrets(&clean, "secret_notion_token").is_ok());
    }

    #[test]
    fn test_empty_secret_only_checks_field_names() {
        let mut claims = TestFixtures::claims();
        claims.access_token = String::new();

        assert!(project(&claims).is_ok());
    }

    #[test]
    fn test_short_secret_does_not_flag_ordinary_names() {
        let mut claims = TestFixtures::claims();
        claims.access_token = "am".to_string();
        claims.workspace.name = "Team Docs".to_string();

        assert!(project(&claims).is_ok());

        let leaking = json!({ "accessToken": "am" });
        assert!(ensure_no_secrets(&leaking, "am").is_err());
    }
}
