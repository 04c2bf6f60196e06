use anyhow::{Context, Result};
use keyring::Entry;
use secrecy::{ExposeSecret, SecretString};

const SERVICE_NAME: &str = "sessiongate";

/// A username/password pair for one login attempt.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

pub struct CredentialStore;

impl CredentialStore {
    /// Store the password for a username in the OS keychain
    pub fn store(credentials: &Credentials) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, &credentials.username)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(credentials.password.expose_secret())
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve stored credentials for a username, if any
    pub fn load(username: &str) -> Option<Credentials> {
        let entry = Entry::new(SERVICE_NAME, username).ok()?;
        let password = entry.get_password().ok()?;
        Some(Credentials::new(username, password))
    }

    /// Delete stored credentials for a username. Nothing stored is not an error.
    pub fn delete(username: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, username)
            .context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_redacts_password() {
        let credentials = Credentials::new("jsmith", "hunter22");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("jsmith"));
        assert!(!debug.contains("hunter22"));
        assert_eq!(credentials.password.expose_secret(), "hunter22");
    }

    #[test]
    fn test_store_then_load_round_trips_through_keychain() {
        let username = format!("sessiongate-test-{}", std::process::id());
        let credentials = Credentials::new(username.as_str(), "hunter22");

        // Headless hosts have no keychain service to talk to
        if CredentialStore::store(&credentials).is_err() {
            eprintln!("skipping: no keychain backend available");
            return;
        }

        let loaded = CredentialStore::load(&username).expect("stored credentials");
        assert_eq!(loaded.username, username);
        assert_eq!(loaded.password.expose_secret(), "hunter22");

        CredentialStore::delete(&username).unwrap();
        assert!(CredentialStore::load(&username).is_none());
        // Deleting again finds nothing and still succeeds
        CredentialStore::delete(&username).unwrap();
    }
}
