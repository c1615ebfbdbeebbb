//! Keyring-based credential storage for USDB

use anyhow::{Context, Result, bail};
use dialoguer::{Input, Password};
use keyring::Entry;
use tracing::{debug, info};

use crate::usdb::{Credentials, UsdbClient};

const KEYRING_SERVICE: &str = "karaoke-sync";

/// Manages authentication credentials storage
pub struct AuthManager;

impl AuthManager {
    /// Authenticate with USDB
    ///
    /// Tries to load credentials from keyring first, or prompts for new ones.
    /// Verifies credentials work before storing.
    pub async fn authenticate(
        username: Option<String>,
        password: Option<String>,
        force: bool,
    ) -> Result<Credentials> {
        if !force {
            if let Ok(creds) = Self::load() {
                info!("Found existing credentials in keyring");
                return Ok(creds);
            }
        } else {
            debug!("Force flag set, ignoring stored credentials");
        }

        let username = match username {
            Some(username) => username,
            None => Input::new()
                .with_prompt("USDB username")
                .interact_text()
                .context("Failed to read username")?,
        };
        let password = match password {
            Some(password) => password,
            None => Password::new()
                .with_prompt("Password")
                .interact()
                .context("Failed to read password")?,
        };

        let creds = Credentials { username, password };
        Self::verify(&creds).await?;
        Self::store(&creds)?;
        info!("Credentials stored in keyring");

        Ok(creds)
    }

    /// Load credentials from keyring
    pub fn load() -> Result<Credentials> {
        let username = Self::get_entry("username")?
            .get_password()
            .context("No USDB username in keyring")?;

        let password = Self::get_entry("password")?
            .get_password()
            .context("No USDB password in keyring")?;

        Ok(Credentials { username, password })
    }

    /// Store credentials in keyring
    pub fn store(creds: &Credentials) -> Result<()> {
        Self::get_entry("username")?
            .set_password(&creds.username)
            .context("Failed to store username in keyring")?;

        Self::get_entry("password")?
            .set_password(&creds.password)
            .context("Failed to store password in keyring")?;

        Ok(())
    }

    /// Clear stored credentials
    pub fn clear() -> Result<()> {
        let _ = Self::get_entry("username")?.delete_credential();
        let _ = Self::get_entry("password")?.delete_credential();
        info!("Credentials cleared from keyring");
        Ok(())
    }

    async fn verify(creds: &Credentials) -> Result<()> {
        debug!("Verifying credentials for user {}", creds.username);

        let client = UsdbClient::new(Some(creds.clone()))?;
        if !client.login().await.context("Failed to reach USDB")? {
            bail!("USDB rejected the credentials for user '{}'", creds.username);
        }
        Ok(())
    }

    fn get_entry(key: &str) -> Result<Entry> {
        let entry_key = format!("usdb:{}", key);
        Entry::new(KEYRING_SERVICE, &entry_key).context("Failed to access keyring")
    }
}
