use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::contact::{Contact, ContactId};

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 180;
const MAX_MESSAGE_LEN: usize = 2000;

/// Raw field values as submitted by the contact form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

/// At most one inline message per form field.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub name: Option<&'static str>,
    pub email: Option<&'static str>,
    pub phone: Option<&'static str>,
    pub message: Option<&'static str>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.message.is_none()
    }
}

impl From<&Contact> for ContactForm {
    fn from(contact: &Contact) -> Self {
        Self {
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone().unwrap_or_default(),
            message: contact.message.clone().unwrap_or_default(),
        }
    }
}

impl ContactForm {
    pub fn validate(&self, id: Option<ContactId>) -> Result<Contact, FormErrors> {
        let mut errors = FormErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.name = Some("Please enter a name.");
        } else if name.chars().count() > MAX_NAME_LEN {
            errors.name = Some("The name must not be longer than 100 characters.");
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.email = Some("Please enter an email address.");
        } else if email.chars().count() > MAX_EMAIL_LEN {
            errors.email = Some("The email address must not be longer than 180 characters.");
        } else if !EMAIL.is_match(email) {
            errors.email = Some("Please enter a valid email address.");
        }

        let phone = optional(&self.phone);
        if let Some(phone) = &phone {
            if !PHONE.is_match(phone) || !phone.chars().any(|c| c.is_ascii_digit()) {
                errors.phone = Some("Please enter a valid phone number.");
            }
        }

        let message = optional(&self.message);
        if let Some(message) = &message {
            if message.chars().count() > MAX_MESSAGE_LEN {
                errors.message = Some("The message must not be longer than 2000 characters.");
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Contact {
            id,
            name: name.to_owned(),
            email: email.to_owned(),
            phone,
            message,
        })
    }
}

fn optional(val: &str) -> Option<String> {
    let val = val.trim();

    if val.is_empty() {
        None
    } else {
        Some(val.to_owned())
    }
}

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").unwrap());

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9 +()/-]{3,32}$").unwrap());
