use super::{require, string_or_number, ActionError, ActionRequest};
use crate::services::{ActionServices, SharedLink};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;

const TOKEN_LENGTH: usize = 32;
const MAX_EXPIRY_DAYS: f64 = 3650.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LinkRequest {
    link_type: Option<String>,
    title: Option<String>,
    description: Option<String>,
    expires_in_days: Option<f64>,
    password: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    resource_id: Option<String>,
}

impl ActionRequest for LinkRequest {
    fn validate(&self) -> Result<(), ActionError> {
        require(&self.link_type, "linkType")?;
        require(&self.title, "title")?;
        if let Some(days) = self.expires_in_days {
            if days < 1.0 || days.fract() != 0.0 {
                return Err(ActionError::Validation(
                    "expiresInDays must be a whole number of at least 1".to_string(),
                ));
            }
            if days > MAX_EXPIRY_DAYS {
                return Err(ActionError::Validation(format!(
                    "expiresInDays must be at most {}",
                    MAX_EXPIRY_DAYS
                )));
            }
        }
        Ok(())
    }
}

/// Random URL-safe token
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Join a base URL and an absolute path with exactly one slash between them
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn hash_password(password: &str) -> Result<String, ActionError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ActionError::Internal(format!("password hashing failed: {}", e)))
}

/// Check a candidate password against a link. Links without a password
/// accept anything.
pub fn verify_password(link: &SharedLink, candidate: &str) -> bool {
    let Some(hash) = &link.password_hash else {
        return true;
    };
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub(crate) async fn handle(
    services: &ActionServices,
    request: LinkRequest,
) -> Result<serde_json::Value, ActionError> {
    let settings = &services.link_settings;
    let days = request
        .expires_in_days
        .map(|d| d as i64)
        .unwrap_or(settings.default_expiry_days as i64);

    let password_hash = match request.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let now = Utc::now();
    let expires_at = Duration::try_days(days)
        .and_then(|validity| now.checked_add_signed(validity))
        .ok_or_else(|| ActionError::Validation(format!("expiresInDays {} is out of range", days)))?;
    let link = SharedLink {
        token: generate_token(),
        link_type: require(&request.link_type, "linkType")?.to_string(),
        resource_id: request.resource_id,
        title: require(&request.title, "title")?.to_string(),
        description: request.description,
        password_hash,
        created_at: now,
        expires_at,
    };

    services.links.save(&link).await?;

    let path = link.path();
    tracing::info!("Issued {} link {} valid for {} days", link.link_type, path, days);

    let mut payload = json!({
        "token": link.token,
        "path": path,
        "expiresAt": link.expires_at.to_rfc3339(),
        "expiresInDays": days,
        "passwordProtected": link.password_hash.is_some(),
    });
    if let Some(base) = &settings.base_url {
        payload["url"] = json!(join_url(base, &path));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(
            join_url("https://crm.example.com/", "/share/abc"),
            "https://crm.example.com/share/abc"
        );
        assert_eq!(
            join_url("https://crm.example.com", "share/abc"),
            "https://crm.example.com/share/abc"
        );
    }

    #[test]
    fn tokens_are_alphanumeric_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn password_round_trip() {
        let now = Utc::now();
        let link = SharedLink {
            token: generate_token(),
            link_type: "offer".into(),
            resource_id: None,
            title: "Boiler replacement".into(),
            description: None,
            password_hash: Some(hash_password("s3cret").unwrap()),
            created_at: now,
            expires_at: now + Duration::days(14),
        };
        assert!(verify_password(&link, "s3cret"));
        assert!(!verify_password(&link, "guess"));
    }
}
