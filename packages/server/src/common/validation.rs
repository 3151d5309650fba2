//! Field validation for request payloads.
//!
//! A `Validator` collects messages per field so one response can report every
//! problem at once, rendered as `{"field": ["message", ...]}`.

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^\w+$").expect("valid username regex");
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex");
}

pub const MISSING_FIELD: &str = "Missing data for required field.";
pub const INVALID_EMAIL: &str = "Not a valid email address.";
pub const INVALID_USERNAME: &str = "Username must be letters, numbers and underscores only.";

/// Usernames that collide with static admin routes under `/users/`
pub const RESERVED_USERNAMES: &[&str] = &["bulk_delete"];

/// Field name → messages.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present and non-blank, or record a missing-field error.
    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value {
            Some(v) if !v.trim().is_empty() => Some(v),
            _ => {
                self.errors.add(field, MISSING_FIELD);
                None
            }
        }
    }

    /// Length in characters, inclusive on both ends.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> bool {
        let len = value.chars().count();
        let ok = (min..=max).contains(&len);
        if !ok {
            self.errors
                .add(field, format!("Length must be between {} and {}.", min, max));
        }
        ok
    }

    pub fn email(&mut self, field: &str, value: &str) -> bool {
        let ok = EMAIL_RE.is_match(value);
        if !ok {
            self.errors.add(field, INVALID_EMAIL);
        }
        ok
    }

    pub fn username(&mut self, field: &str, value: &str) -> bool {
        if !USERNAME_RE.is_match(value) {
            self.errors.add(field, INVALID_USERNAME);
            return false;
        }
        if RESERVED_USERNAMES.contains(&value) {
            self.errors.add(field, format!("{} is a reserved username.", value));
            return false;
        }
        true
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
