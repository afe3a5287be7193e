// src/models/auth.rs

use serde::{Deserialize, Serialize};

/// Claims carried in the optional bearer token. Only consumed for the audit
/// trail; requests without a (valid) token proceed as Anonymous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
}

/// Resolved caller identity for the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn anonymous() -> Self {
        Self {
            username: "Anonymous".to_string(),
            roles: Vec::new(),
        }
    }

    /// Comma-joined role list, or the UNKNOWN sentinel when none are present.
    pub fn role_string(&self) -> String {
        if self.roles.is_empty() {
            "UNKNOWN".to_string()
        } else {
            self.roles.join(", ")
        }
    }
}

/// Per-request metadata every pipeline call receives explicitly: who is
/// calling and from where. Built by the middleware extractor; constructed
/// directly in tests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: CurrentUser,
    pub ip_address: String,
}

impl RequestContext {
    pub fn anonymous(ip_address: impl Into<String>) -> Self {
        Self {
            user: CurrentUser::anonymous(),
            ip_address: ip_address.into(),
        }
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            roles: claims.roles,
        }
    }
}
