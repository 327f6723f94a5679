//! Users and login sessions.
//!
//! Passwords never appear in these types except as an argon2 PHC string on
//! [`NewUser`] and [`UserCredentials`]. Session tokens are likewise stored only
//! as a digest; the plaintext token exists solely in the login response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

const MAX_USERNAME: usize = 64;
const MAX_EMAIL: usize = 254;

// ─── User ────────────────────────────────────────────────────────────────────

/// A registered account as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  pub username:   String,
  pub email:      String,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn author_ref(&self) -> AuthorRef {
    AuthorRef { user_id: self.user_id, username: self.username.clone() }
  }
}

/// The public face of a user attached to forums and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
  pub user_id:  Uuid,
  pub username: String,
}

/// Input to [`crate::store::ForumStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub email:         String,
  /// Argon2 PHC string, e.g. `$argon2id$v=19$…`.
  pub password_hash: String,
}

impl NewUser {
  /// Trim the username, lowercase the email, and reject blank or malformed
  /// values.
  pub fn normalized(self) -> Result<Self> {
    let username = self.username.trim().to_owned();
    let email = self.email.trim().to_lowercase();

    if username.is_empty() {
      return Err(Error::EmptyField("username"));
    }
    if username.chars().count() > MAX_USERNAME {
      return Err(Error::TooLong { field: "username", max: MAX_USERNAME });
    }
    if email.is_empty() {
      return Err(Error::EmptyField("email"));
    }
    if email.len() > MAX_EMAIL {
      return Err(Error::TooLong { field: "email", max: MAX_EMAIL });
    }
    match email.split_once('@') {
      Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
      _ => return Err(Error::InvalidEmail(email)),
    }

    Ok(Self { username, email, password_hash: self.password_hash })
  }
}

/// A user together with the stored password hash; only ever read during login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
  pub user:          User,
  pub password_hash: String,
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// A bearer-token session. The token itself is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  /// Lowercase hex SHA-256 digest of the bearer token.
  pub token_hash: String,
  pub user_id:    Uuid,
  pub issued_at:  DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
      username:      username.into(),
      email:         email.into(),
      password_hash: "$argon2id$stub".into(),
    }
  }

  #[test]
  fn normalizes_username_and_email() {
    let u = new_user("  alice ", " Alice@Example.COM ").normalized().unwrap();
    assert_eq!(u.username, "alice");
    assert_eq!(u.email, "alice@example.com");
  }

  #[test]
  fn rejects_blank_username() {
    assert!(matches!(
      new_user("   ", "a@b.c").normalized(),
      Err(Error::EmptyField("username"))
    ));
  }

  #[test]
  fn rejects_email_without_domain() {
    assert!(matches!(
      new_user("alice", "alice@").normalized(),
      Err(Error::InvalidEmail(_))
    ));
  }

  #[test]
  fn session_expiry_is_inclusive() {
    let now = Utc::now();
    let session = Session {
      token_hash: "00".into(),
      user_id:    Uuid::new_v4(),
      issued_at:  now - Duration::hours(24),
      expires_at: now,
    };
    assert!(session.is_expired(now));
    assert!(!session.is_expired(now - Duration::seconds(1)));
  }
}
