//! Account records and their identifier value objects.
//!
//! An account's canonical key is its ID string. The national ID and email are
//! alternate identifiers, resolvable through the secondary identity index.
//! Password storage uses the application's historical substitution cipher;
//! cryptographic strength is explicitly out of scope.

use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::storage::Record;

fn national_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{7,8}[A-Za-z]$").expect("valid literal pattern"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("valid literal pattern")
    })
}

fn password_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9#%&*+@$!?_-]{5,35}$").expect("valid literal pattern"))
}

/// A national identity document number: 7-8 digits plus a check letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NationalId(String);

impl NationalId {
    /// Parses and normalizes (uppercases) a national ID.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidNationalId`] on format mismatch.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        if national_id_re().is_match(text) {
            Ok(Self(text.to_uppercase()))
        } else {
            Err(ValidationError::InvalidNationalId {
                text: text.to_string(),
            })
        }
    }

    /// The normalized text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An email address, stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Parses and normalizes (lowercases) an email address.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidEmail`] on format mismatch.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        if email_re().is_match(text) {
            Ok(Self(text.to_lowercase()))
        } else {
            Err(ValidationError::InvalidEmail {
                text: text.to_string(),
            })
        }
    }

    /// The normalized text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Alphabet the substitution cipher rotates within. Characters outside the
/// alphabet pass through unchanged.
const CIPHER_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789#%&*+@$!?_-";
const CIPHER_SHIFT: usize = 4;

fn cipher(text: &str) -> String {
    let alphabet: Vec<char> = CIPHER_ALPHABET.chars().collect();
    text.chars()
        .map(|ch| {
            alphabet
                .iter()
                .position(|&a| a == ch)
                .map_or(ch, |i| alphabet[(i + CIPHER_SHIFT) % alphabet.len()])
        })
        .collect()
}

/// A stored credential. Only the ciphered form is kept; comparison happens by
/// ciphering the candidate and matching the stored text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    /// Validates a plain-text password and stores its ciphered form.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidPassword`] on format mismatch. The
    /// rejected text is never echoed into the error.
    pub fn new(plain: &str) -> Result<Self, ValidationError> {
        if password_re().is_match(plain) {
            Ok(Self(cipher(plain)))
        } else {
            Err(ValidationError::InvalidPassword)
        }
    }

    /// True if `plain` ciphers to the stored text.
    #[must_use]
    pub fn matches(&self, plain: &str) -> bool {
        cipher(plain) == self.0
    }

    /// The ciphered text (what gets persisted).
    #[must_use]
    pub fn ciphered(&self) -> &str {
        &self.0
    }
}

/// Postal address of an account holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Postal code.
    pub postal_code: String,
    /// Street name.
    pub street: String,
    /// Street number.
    pub number: String,
    /// City.
    pub city: String,
    /// Country.
    pub country: String,
}

impl Address {
    /// Builds an address from its parts.
    #[must_use]
    pub fn new(postal_code: &str, street: &str, number: &str, city: &str, country: &str) -> Self {
        Self {
            postal_code: postal_code.to_string(),
            street: street.to_string(),
            number: number.to_string(),
            city: city.to_string(),
            country: country.to_string(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}, {} ({})",
            self.postal_code, self.street, self.number, self.city, self.country
        )
    }
}

/// Role attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Regular user.
    Normal,
    /// Restricted demo access.
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Normal => write!(f, "normal"),
            Self::Guest => write!(f, "guest"),
        }
    }
}

/// A user account. The natural key is `id`, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Canonical account ID.
    pub id: String,
    /// National identity document number (alternate identifier).
    pub national_id: NationalId,
    /// Email address (alternate identifier).
    pub email: Email,
    /// Given name.
    pub name: String,
    /// Surname(s).
    pub surname: String,
    /// Postal address.
    pub address: Address,
    /// Date of birth.
    pub birth_date: NaiveDate,
    /// Date the account was created.
    pub signup_date: NaiveDate,
    /// Stored credential.
    pub password: Password,
    /// Access role.
    pub role: Role,
}

impl Account {
    /// Builds an account after validating its natural key.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyKey`] when `id` is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &str,
        national_id: NationalId,
        email: Email,
        name: &str,
        surname: &str,
        address: Address,
        birth_date: NaiveDate,
        signup_date: NaiveDate,
        password: Password,
        role: Role,
    ) -> Result<Self, ValidationError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError::EmptyKey { field: "id" });
        }
        Ok(Self {
            id: id.to_string(),
            national_id,
            email,
            name: name.trim().to_string(),
            surname: surname.trim().to_string(),
            address,
            birth_date,
            signup_date,
            password,
            role,
        })
    }

    /// Derives the canonical ID from personal data: the initial of the name,
    /// the initial of every surname word, then the last two characters of the
    /// national ID, all uppercased.
    #[must_use]
    pub fn derive_id(name: &str, surname: &str, national_id: &NationalId) -> String {
        let mut id = String::new();
        if let Some(ch) = name.trim().chars().next() {
            id.push(ch);
        }
        for word in surname.split_whitespace() {
            if let Some(ch) = word.chars().next() {
                id.push(ch);
            }
        }
        let nid = national_id.as_str();
        let tail: String = nid.chars().skip(nid.chars().count().saturating_sub(2)).collect();
        id.push_str(&tail);
        id.to_uppercase()
    }
}

impl Record for Account {
    fn key(&self) -> &str {
        &self.id
    }

    fn absorb(&mut self, other: Self) {
        self.national_id = other.national_id;
        self.email = other.email;
        self.name = other.name;
        self.surname = other.surname;
        self.address = other.address;
        self.birth_date = other.birth_date;
        self.signup_date = other.signup_date;
        self.password = other.password;
        self.role = other.role;
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Account [id={}, national_id={}, name={} {}, email={}, address={}, born={}, signup={}, role={}]",
            self.id,
            self.national_id,
            self.name,
            self.surname,
            self.email,
            self.address,
            self.birth_date,
            self.signup_date,
            self.role
        )
    }
}
