use crate::utils::error::{Result, TimeEntryError};
use crate::utils::validation::{
    validate_non_empty_string, validate_required_field, validate_url, Validate,
};
use std::fmt;

/// Public client id registered for Dataverse sample and tooling apps.
pub const DEFAULT_CLIENT_ID: &str = "51f81489-12ee-4a9e-aaae-a2591f45987d";
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/organizations/oauth2/token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// No `Authorization` header, e.g. a local emulator.
    None,
    /// Use the `Token` value as a bearer token.
    Token,
    /// Resource owner password grant with `Username` / `Password`.
    OAuth,
}

/// `Key=Value;Key=Value` connection string. Keys are case-insensitive.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub url: String,
    pub auth_type: AuthType,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub client_id: String,
    pub authority: String,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut url = None;
        let mut auth_type = None;
        let mut username = None;
        let mut password = None;
        let mut token = None;
        let mut client_id = None;
        let mut authority = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                TimeEntryError::InvalidConfigValueError {
                    field: "connection".to_string(),
                    value: redact_segment(part),
                    reason: "expected Key=Value".to_string(),
                }
            })?;
            let value = value.trim().to_string();

            match key.trim().to_ascii_lowercase().as_str() {
                "url" | "serviceuri" | "service uri" => url = Some(value),
                "authtype" => auth_type = Some(parse_auth_type(&value)?),
                "username" | "user name" => username = Some(value),
                "password" => password = Some(value),
                "token" | "accesstoken" => token = Some(value),
                "clientid" | "appid" => client_id = Some(value),
                "authority" => authority = Some(value),
                other => tracing::debug!("Ignoring connection string key '{}'", other),
            }
        }

        let url = url.ok_or_else(|| TimeEntryError::MissingConfigError {
            field: "Url".to_string(),
        })?;

        let auth_type = auth_type.unwrap_or(if token.is_some() {
            AuthType::Token
        } else {
            AuthType::None
        });

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            auth_type,
            username,
            password,
            token,
            client_id: client_id.unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            authority: authority.unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
        })
    }

    /// Base URL of the Web API, e.g. `https://org.crm.dynamics.com/api/data/v9.2`.
    pub fn api_base(&self) -> String {
        format!("{}/api/data/v9.2", self.url)
    }
}

fn parse_auth_type(value: &str) -> Result<AuthType> {
    match value.to_ascii_lowercase().as_str() {
        "none" | "" => Ok(AuthType::None),
        "token" | "bearer" => Ok(AuthType::Token),
        "oauth" => Ok(AuthType::OAuth),
        other => Err(TimeEntryError::InvalidConfigValueError {
            field: "AuthType".to_string(),
            value: other.to_string(),
            reason: "supported values are None, Token and OAuth".to_string(),
        }),
    }
}

fn redact_segment(segment: &str) -> String {
    let lower = segment.to_ascii_lowercase();
    if lower.contains("password") || lower.contains("token") {
        "***".to_string()
    } else {
        segment.to_string()
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("url", &self.url)
            .field("auth_type", &self.auth_type)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("client_id", &self.client_id)
            .field("authority", &self.authority)
            .finish()
    }
}

impl Validate for ConnectionString {
    fn validate(&self) -> Result<()> {
        validate_url("Url", &self.url)?;

        match self.auth_type {
            AuthType::None => {}
            AuthType::Token => {
                let token = validate_required_field("Token", &self.token)?;
                validate_non_empty_string("Token", token)?;
            }
            AuthType::OAuth => {
                if self.token.is_none() {
                    validate_url("Authority", &self.authority)?;
                    let username = self.username.as_deref().unwrap_or_default();
                    let password = self.password.as_deref().unwrap_or_default();
                    validate_non_empty_string("Username", username)?;
                    validate_non_empty_string("Password", password)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_oauth_connection() {
        let conn = ConnectionString::parse(
            "AuthType=OAuth;Username = jane@contoso.onmicrosoft.com;Password = pass;Url = https://org.crm11.dynamics.com/;",
        )
        .unwrap();

        assert_eq!(conn.auth_type, AuthType::OAuth);
        assert_eq!(conn.url, "https://org.crm11.dynamics.com");
        assert_eq!(conn.username.as_deref(), Some("jane@contoso.onmicrosoft.com"));
        assert_eq!(conn.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(conn.api_base(), "https://org.crm11.dynamics.com/api/data/v9.2");
        assert!(conn.validate().is_ok());
    }

    #[test]
    fn test_token_implies_token_auth() {
        let conn = ConnectionString::parse("url=http://127.0.0.1:7071;token=abc").unwrap();
        assert_eq!(conn.auth_type, AuthType::Token);
        assert!(conn.validate().is_ok());
    }

    #[test]
    fn test_missing_url() {
        let err = ConnectionString::parse("AuthType=None").unwrap_err();
        assert!(matches!(err, TimeEntryError::MissingConfigError { .. }));
    }

    #[test]
    fn test_unknown_auth_type() {
        assert!(ConnectionString::parse("Url=http://localhost;AuthType=Kerberos").is_err());
    }

    #[test]
    fn test_oauth_without_credentials_fails_validation() {
        let conn = ConnectionString::parse("Url=https://org.crm.dynamics.com;AuthType=OAuth").unwrap();
        assert!(conn.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let conn = ConnectionString::parse(
            "Url=https://org.crm.dynamics.com;AuthType=OAuth;Username=jane;Password=hunter2",
        )
        .unwrap();
        let printed = format!("{:?}", conn);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("jane"));
    }
}
