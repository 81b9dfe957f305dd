use std::io::{ErrorKind, Read, Write};

use anyhow::{anyhow, Context, Result};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use cap_std::fs::{Dir, File};

const COOKIE_NAME: &str = "flash";

/// One-time notice shown on the contact list after a successful modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Created,
    Updated,
    Deleted,
}

impl Flash {
    pub fn message(self) -> &'static str {
        match self {
            Self::Created => "Contact created successfully!",
            Self::Updated => "Contact updated successfully!",
            Self::Deleted => "Contact deleted successfully!",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    fn parse(val: &str) -> Option<Self> {
        let val = match val {
            "created" => Self::Created,
            "updated" => Self::Updated,
            "deleted" => Self::Deleted,
            _ => return None,
        };

        Some(val)
    }

    pub fn add_to(self, jar: SignedCookieJar) -> SignedCookieJar {
        jar.add(cookie(self.as_str()))
    }

    /// Removes any pending notice from the jar, yielding it if it was valid.
    pub fn take_from(jar: SignedCookieJar) -> (SignedCookieJar, Option<Self>) {
        match jar.get(COOKIE_NAME) {
            Some(pending) => {
                let flash = Self::parse(pending.value());

                (jar.remove(cookie("")), flash)
            }
            None => (jar, None),
        }
    }
}

fn cookie(value: &'static str) -> Cookie<'static> {
    Cookie::build(COOKIE_NAME, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Reads the key signing the notice cookies from the data directory, generating and storing a new one if necessary.
pub fn load_key(dir: &Dir) -> Result<Key> {
    match dir.open("cookie_key") {
        Ok(mut file) => {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)?;

            Key::try_from(&buf[..]).map_err(|err| anyhow!("Invalid cookie key: {}", err))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!("Generating new cookie key");

            let key = Key::generate();

            let mut file = dir.create("cookie_key.new")?;
            restrict_to_owner(&file)?;
            file.write_all(key.master())?;
            dir.rename("cookie_key.new", dir, "cookie_key")?;

            Ok(key)
        }
        Err(err) => Err(err).context("Failed to open cookie key"),
    }
}

#[cfg(unix)]
fn restrict_to_owner(file: &File) -> Result<()> {
    use cap_std::fs::Permissions;
    use std::fs::Permissions as StdPermissions;
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(Permissions::from_std(StdPermissions::from_mode(0o600)))?;

    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &File) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use cap_std::ambient_authority;
    use tempfile::tempdir;

    #[test]
    fn notice_is_consumed_once() {
        let jar = Flash::Updated.add_to(SignedCookieJar::new(Key::generate()));

        let (jar, flash) = Flash::take_from(jar);
        assert_eq!(flash, Some(Flash::Updated));

        let (_jar, flash) = Flash::take_from(jar);
        assert_eq!(flash, None);
    }

    #[test]
    fn unknown_notices_are_ignored() {
        let jar = SignedCookieJar::new(Key::generate()).add(cookie("bogus"));

        let (jar, flash) = Flash::take_from(jar);
        assert_eq!(flash, None);
        assert!(jar.get(COOKIE_NAME).is_none());
    }

    #[test]
    fn key_is_generated_once_and_then_reused() {
        let temp_dir = tempdir().unwrap();
        let dir = Dir::open_ambient_dir(temp_dir.path(), ambient_authority()).unwrap();

        let key = load_key(&dir).unwrap();
        assert!(dir.exists("cookie_key"));

        let reloaded_key = load_key(&dir).unwrap();
        assert_eq!(key.master(), reloaded_key.master());
    }

    #[cfg(unix)]
    #[test]
    fn key_is_only_readable_by_owner() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let dir = Dir::open_ambient_dir(temp_dir.path(), ambient_authority()).unwrap();

        load_key(&dir).unwrap();

        let mode = std::fs::metadata(temp_dir.path().join("cookie_key"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
