use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::{
    auth::AuthService,
    domain::{classify_contact, normalize_contact, ContactKind, NewUser, Role, User},
    error::{AppError, Result},
    notify::NotificationService,
    repository::UserRepository,
};

/// Creates donor accounts for first-time payers.
pub struct AccountService {
    user_repo: Arc<dyn UserRepository>,
    notifications: Arc<NotificationService>,
}

impl AccountService {
    pub fn new(user_repo: Arc<dyn UserRepository>, notifications: Arc<NotificationService>) -> Self {
        Self { user_repo, notifications }
    }

    /// Returns the newly created account, or `None` when the contact already
    /// has one.
    pub async fn ensure_account_for_contact(
        &self,
        contact: &str,
        name: Option<&str>,
    ) -> Result<Option<User>> {
        let contact = normalize_contact(contact);
        let kind = classify_contact(&contact)
            .ok_or_else(|| AppError::Validation(format!("Unusable contact: {}", contact)))?;

        if self.user_repo.find_by_identifier(&contact).await?.is_some() {
            tracing::debug!("Account already exists for {}", contact);
            return Ok(None);
        }

        let password = derive_password(&contact, kind);
        let full_name = derive_display_name(&contact, kind, name);
        let password_hash = AuthService::hash_password(&password).await?;

        let (email, phone) = match kind {
            ContactKind::Email => (Some(contact.clone()), None),
            ContactKind::Phone => (None, Some(contact.clone())),
        };

        let user = self
            .user_repo
            .create(NewUser {
                full_name: full_name.clone(),
                email,
                phone,
                password_hash,
                role: Role::Donor,
            })
            .await?;

        match kind {
            ContactKind::Email => {
                self.notifications
                    .send_credentials(&contact, &full_name, &password)
                    .await;
            }
            ContactKind::Phone => {
                // No SMS channel; operators relay the password by hand
                tracing::info!(
                    "Created donor account {} for phone {} with password {}",
                    user.id,
                    contact,
                    password
                );
            }
        }

        tracing::info!("Provisioned donor account {} for {}", user.id, contact);
        Ok(Some(user))
    }
}

fn digits_of(contact: &str) -> String {
    contact.chars().filter(char::is_ascii_digit).collect()
}

fn last_n(s: &str, n: usize) -> &str {
    &s[s.len().saturating_sub(n)..]
}

/// Four digits derived from the contact itself, for contacts with no digits.
fn hashed_digits(contact: &str) -> String {
    let digest = Sha256::digest(contact.as_bytes());
    let value = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    format!("{:04}", value % 10_000)
}

/// Memorable first password: `John1234!` for emails, `User345678!` for phones.
pub fn derive_password(contact: &str, kind: ContactKind) -> String {
    let digits = digits_of(contact);
    let tail4 = if digits.is_empty() {
        hashed_digits(contact)
    } else {
        last_n(&digits, 4).to_string()
    };

    match kind {
        ContactKind::Email => {
            let local = contact.split('@').next().unwrap_or_default();
            let letters: String = local
                .chars()
                .filter(char::is_ascii_alphabetic)
                .take(6)
                .collect();
            let base = if letters.is_empty() {
                "User".to_string()
            } else {
                let mut chars = letters.chars();
                let first = chars.next().map(|c| c.to_ascii_uppercase()).unwrap_or('U');
                std::iter::once(first)
                    .chain(chars.map(|c| c.to_ascii_lowercase()))
                    .collect()
            };
            format!("{}{}!", base, tail4)
        }
        ContactKind::Phone => {
            let tail = if digits.is_empty() {
                tail4
            } else {
                last_n(&digits, 6).to_string()
            };
            format!("User{}!", tail)
        }
    }
}

pub fn derive_display_name(contact: &str, kind: ContactKind, name: Option<&str>) -> String {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    match kind {
        ContactKind::Email => {
            let local = contact.split('@').next().unwrap_or_default();
            let words: Vec<String> = local
                .split(|c: char| c == '.' || c == '_' || c == '-')
                .filter(|w| !w.is_empty())
                .map(|w| {
                    let mut chars = w.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                })
                .collect();
            if words.is_empty() {
                "User".to_string()
            } else {
                words.join(" ")
            }
        }
        ContactKind::Phone => format!("User {}", last_n(contact, 4)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_password_uses_local_part_and_digits() {
        assert_eq!(derive_password("john.doe1234@example.com", ContactKind::Email), "Johndo1234!");
        assert_eq!(derive_password("AB99@example.com", ContactKind::Email), "Ab99!");
    }

    #[test]
    fn test_email_without_letters_falls_back_to_user() {
        assert_eq!(derive_password("12345@example.com", ContactKind::Email), "User2345!");
    }

    #[test]
    fn test_email_without_digits_is_deterministic() {
        let first = derive_password("donor@example.com", ContactKind::Email);
        let second = derive_password("donor@example.com", ContactKind::Email);
        assert_eq!(first, second);
        assert!(first.starts_with("Donor"));
        assert!(first.ends_with('!'));
        assert_eq!(first.len(), "Donor".len() + 4 + 1);
    }

    #[test]
    fn test_phone_password_uses_last_six_digits() {
        assert_eq!(derive_password("01712345678", ContactKind::Phone), "User345678!");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            derive_display_name("john.doe@example.com", ContactKind::Email, None),
            "John Doe"
        );
        assert_eq!(
            derive_display_name("john.doe@example.com", ContactKind::Email, Some("  Jane ")),
            "Jane"
        );
        assert_eq!(derive_display_name("01712345678", ContactKind::Phone, None), "User 5678");
    }
}
