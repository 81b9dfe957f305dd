use std::collections::BTreeMap;
use std::io::{BufReader, ErrorKind, Write};

use anyhow::{ensure, Context, Result};
use bincode::config::{DefaultOptions, Options};
use cap_std::fs::Dir;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::contact::{Contact, ContactId};

/// Durable collection of all contacts, kept in a single `contacts` file inside the data directory.
///
/// Each mutation is applied to a copy of the table which is written to disk before it replaces the in-memory state,
/// so a failed write leaves the store unchanged.
pub struct Contacts {
    dir: Dir,
    table: Mutex<Table>,
}

#[derive(Default, Clone, Deserialize, Serialize)]
struct Table {
    next_id: ContactId,
    contacts: BTreeMap<ContactId, Contact>,
}

impl Contacts {
    pub fn open(dir: Dir) -> Result<Self> {
        let table = match dir.open("contacts") {
            Ok(file) => options()
                .deserialize_from(BufReader::new(file))
                .context("Failed to deserialize contacts")?,
            Err(err) if err.kind() == ErrorKind::NotFound => Default::default(),
            Err(err) => return Err(err).context("Failed to open contacts"),
        };

        Ok(Self {
            dir,
            table: Mutex::new(table),
        })
    }

    /// All contacts in the order they were created.
    pub fn find_all(&self) -> Vec<Contact> {
        self.table.lock().contacts.values().cloned().collect()
    }

    pub fn find(&self, id: ContactId) -> Option<Contact> {
        self.table.lock().contacts.get(&id).cloned()
    }

    pub fn count(&self) -> usize {
        self.table.lock().contacts.len()
    }

    /// Inserts the contact if it has no identifier yet, otherwise replaces the record stored under its identifier.
    ///
    /// On insertion, the newly assigned identifier is written back into `contact`.
    /// An update of a contact removed in the meantime stores it again, i.e. the last writer wins.
    pub fn persist(&self, contact: &mut Contact) -> Result<ContactId> {
        let mut table = self.table.lock();
        let mut new_table = table.clone();

        let id = match contact.id {
            Some(id) => {
                ensure!(
                    id != 0 && id <= table.next_id,
                    "Contact {} was never assigned by this store",
                    id
                );

                id
            }
            None => {
                new_table.next_id += 1;
                new_table.next_id
            }
        };

        let mut record = contact.clone();
        record.id = Some(id);
        new_table.contacts.insert(id, record);

        self.write(&new_table)?;
        *table = new_table;

        contact.id = Some(id);

        Ok(id)
    }

    /// Permanently removes the contact, yielding `None` if no such contact exists.
    pub fn remove(&self, id: ContactId) -> Result<Option<Contact>> {
        let mut table = self.table.lock();

        if !table.contacts.contains_key(&id) {
            return Ok(None);
        }

        let mut new_table = table.clone();
        let contact = new_table.contacts.remove(&id);

        self.write(&new_table)?;
        *table = new_table;

        Ok(contact)
    }

    fn write(&self, table: &Table) -> Result<()> {
        let buf = options().serialize(table)?;

        let mut file = self.dir.create("contacts.new")?;
        file.write_all(&buf)?;
        self.dir.rename("contacts.new", &self.dir, "contacts")?;

        Ok(())
    }
}

fn options() -> impl Options {
    DefaultOptions::new().with_fixint_encoding()
}

#[cfg(test)]
mod tests {
    use super::*;

    use cap_std::ambient_authority;
    use tempfile::{tempdir, TempDir};

    fn open_store() -> (TempDir, Contacts) {
        let temp_dir = tempdir().unwrap();
        let contacts = reopen_store(&temp_dir);

        (temp_dir, contacts)
    }

    fn reopen_store(temp_dir: &TempDir) -> Contacts {
        let dir = Dir::open_ambient_dir(temp_dir.path(), ambient_authority()).unwrap();

        Contacts::open(dir).unwrap()
    }

    fn contact(name: &str, email: &str) -> Contact {
        Contact {
            name: name.to_owned(),
            email: email.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_file_yields_empty_store() {
        let (_temp_dir, contacts) = open_store();

        assert_eq!(contacts.count(), 0);
        assert!(contacts.find_all().is_empty());
        assert_eq!(contacts.find(1), None);
    }

    #[test]
    fn persist_assigns_identifiers_in_creation_order() {
        let (_temp_dir, contacts) = open_store();

        let mut jane = contact("Jane Doe", "jane@example.com");
        let mut john = contact("John Doe", "john@example.com");

        assert_eq!(contacts.persist(&mut jane).unwrap(), 1);
        assert_eq!(contacts.persist(&mut john).unwrap(), 2);

        assert_eq!(jane.id, Some(1));
        assert_eq!(john.id, Some(2));

        assert_eq!(contacts.find_all(), vec![jane.clone(), john]);
        assert_eq!(contacts.find(1), Some(jane));
    }

    #[test]
    fn persist_updates_existing_contact_in_place() {
        let (_temp_dir, contacts) = open_store();

        let mut jane = contact("Jane Doe", "jane@example.com");
        contacts.persist(&mut jane).unwrap();

        jane.phone = Some("+49 30 123456".to_owned());
        assert_eq!(contacts.persist(&mut jane).unwrap(), 1);

        assert_eq!(contacts.count(), 1);
        assert_eq!(
            contacts.find(1).unwrap().phone.as_deref(),
            Some("+49 30 123456")
        );
    }

    #[test]
    fn persist_rejects_foreign_identifiers() {
        let (_temp_dir, contacts) = open_store();

        let mut jane = contact("Jane Doe", "jane@example.com");
        jane.id = Some(42);

        contacts.persist(&mut jane).unwrap_err();

        assert_eq!(contacts.count(), 0);
    }

    #[test]
    fn remove_deletes_exactly_one_contact() {
        let (_temp_dir, contacts) = open_store();

        let mut jane = contact("Jane Doe", "jane@example.com");
        let mut john = contact("John Doe", "john@example.com");
        contacts.persist(&mut jane).unwrap();
        contacts.persist(&mut john).unwrap();

        assert_eq!(contacts.remove(1).unwrap(), Some(jane));
        assert_eq!(contacts.remove(1).unwrap(), None);

        assert_eq!(contacts.find_all(), vec![john]);
    }

    #[test]
    fn identifiers_are_not_reused_after_removal() {
        let (_temp_dir, contacts) = open_store();

        let mut jane = contact("Jane Doe", "jane@example.com");
        contacts.persist(&mut jane).unwrap();
        contacts.remove(1).unwrap();

        let mut john = contact("John Doe", "john@example.com");
        assert_eq!(contacts.persist(&mut john).unwrap(), 2);
    }

    #[test]
    fn failed_writes_leave_store_unchanged() {
        let (temp_dir, contacts) = open_store();

        let mut jane = contact("Jane Doe", "jane@example.com");
        contacts.persist(&mut jane).unwrap();

        std::fs::create_dir(temp_dir.path().join("contacts.new")).unwrap();

        let mut john = contact("John Doe", "john@example.com");
        contacts.persist(&mut john).unwrap_err();

        assert_eq!(john.id, None);
        assert_eq!(contacts.count(), 1);

        contacts.remove(1).unwrap_err();

        assert_eq!(contacts.find_all(), vec![jane.clone()]);

        drop(contacts);
        let contacts = reopen_store(&temp_dir);

        assert_eq!(contacts.find_all(), vec![jane]);
    }

    #[test]
    fn contacts_survive_reopening() {
        let (temp_dir, contacts) = open_store();

        let mut jane = contact("Jane Doe", "jane@example.com");
        let mut john = contact("John Doe", "john@example.com");
        contacts.persist(&mut jane).unwrap();
        contacts.persist(&mut john).unwrap();
        contacts.remove(1).unwrap();

        drop(contacts);
        let contacts = reopen_store(&temp_dir);

        assert_eq!(contacts.find_all(), vec![john]);

        let mut jim = contact("Jim Doe", "jim@example.com");
        assert_eq!(contacts.persist(&mut jim).unwrap(), 3);
    }
}
