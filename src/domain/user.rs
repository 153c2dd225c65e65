use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Every contact a donation could have been filed under.
    pub fn contacts(&self) -> Vec<String> {
        self.email.iter().chain(self.phone.iter()).cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Editor,
    #[serde(alias = "donors")]
    Donor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Donor => "donor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "donor" | "donors" => Ok(Role::Donor),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// How a payer can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Email,
    Phone,
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("static email regex"))
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]\d{7,14}$").expect("static phone regex"))
}

pub fn classify_contact(contact: &str) -> Option<ContactKind> {
    let contact = contact.trim();
    if email_regex().is_match(contact) {
        Some(ContactKind::Email)
    } else if phone_regex().is_match(contact) {
        Some(ContactKind::Phone)
    } else {
        None
    }
}

pub fn validate_contact(contact: &str) -> Result<(), ValidationError> {
    match classify_contact(contact) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("contact")
            .with_message("Contact must be a valid email or phone number".into())),
    }
}

/// Lowercases emails; phones are kept as typed (trimmed).
pub fn normalize_contact(contact: &str) -> String {
    let contact = contact.trim();
    match classify_contact(contact) {
        Some(ContactKind::Email) => contact.to_lowercase(),
        _ => contact.to_string(),
    }
}
