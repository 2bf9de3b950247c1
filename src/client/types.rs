use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::survey::types::UserId;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterData {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// OAuth2 password-flow fields; sent form-encoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegisterReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageReceipt {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TempPassword {
    pub temp_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PasswordChange<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PasswordReset<'a> {
    pub email: &'a str,
}

/// Result of a CSV export written to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}
