//! Authentication data models

use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

/// JWT claims structure. Tokens are issued by the back-office login service;
/// this API only verifies them.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

impl Claims {
    pub fn has_admin_role(&self) -> bool {
        self.role
            .as_deref()
            .map(|r| r.eq_ignore_ascii_case(ADMIN_ROLE))
            .unwrap_or(false)
    }
}
