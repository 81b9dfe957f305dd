use serde::{Deserialize, Serialize};

pub type ContactId = u64;

/// A person's contact information as kept by the [`Contacts`][crate::store::Contacts] store.
///
/// The identifier is `None` until the contact has been persisted for the first time and never changes afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Contact {
    pub id: Option<ContactId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
}
