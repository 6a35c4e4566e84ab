use serde::{Deserialize, Serialize};

use super::{password, repo_types::PublicUser};
use crate::{
    error::ApiError,
    validation::{is_valid_email, is_valid_phone, normalize_email, FieldErrors},
};

/// Request body for registration and login.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    /// Normalizes the email and checks both fields are present.
    pub fn normalized(mut self) -> Result<Self, ApiError> {
        self.email = normalize_email(&self.email);
        if self.email.is_empty() || self.password.trim().is_empty() {
            return Err(ApiError::validation("Email & password fields are required"));
        }
        Ok(self)
    }

    pub fn validate_for_registration(&self) -> Result<(), ApiError> {
        FieldErrors::new()
            .check(is_valid_email(&self.email), "\"email\" must be a valid email")
            .check(
                (password::MIN_LEN..=password::MAX_LEN).contains(&self.password.chars().count()),
                format!(
                    "\"password\" length must be between {} and {} characters",
                    password::MIN_LEN,
                    password::MAX_LEN
                ),
            )
            .finish("Invalid registration data")
    }
}

/// Request body for token refresh, when the cookie is not available.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(alias = "firstname")]
    pub first_name: Option<String>,
    #[serde(alias = "lastname")]
    pub last_name: Option<String>,
    #[serde(alias = "phoneNumber")]
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateProfileRequest {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.password.is_none()
    }

    /// Trims text fields, lowercases the email and validates whatever was supplied.
    pub fn normalized(mut self) -> Result<Self, ApiError> {
        if self.is_empty() {
            return Err(ApiError::validation("Content can not be empty"));
        }
        self.first_name = self.first_name.map(|s| s.trim().to_string());
        self.last_name = self.last_name.map(|s| s.trim().to_string());
        self.phone = self.phone.map(|s| s.trim().to_string());
        self.email = self.email.as_deref().map(normalize_email);

        let mut v = FieldErrors::new();
        if let Some(name) = &self.first_name {
            v.check(name.chars().count() >= 3, "\"firstName\" must be at least 3 characters");
        }
        if let Some(name) = &self.last_name {
            v.check(name.chars().count() >= 3, "\"lastName\" must be at least 3 characters");
        }
        if let Some(phone) = &self.phone {
            v.check(is_valid_phone(phone), "\"phone\" must be a 10 digit number");
        }
        if let Some(email) = &self.email {
            v.check(is_valid_email(email), "\"email\" must be a valid email");
        }
        if let Some(pw) = &self.password {
            v.check(
                (password::MIN_LEN..=password::MAX_LEN).contains(&pw.chars().count()),
                format!(
                    "\"password\" length must be between {} and {} characters",
                    password::MIN_LEN,
                    password::MAX_LEN
                ),
            );
        }
        v.finish("Invalid profile data")?;
        Ok(self)
    }
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct Empty {}
