use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    appliances: BTreeMap<String, ApplianceCredentials>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApplianceCredentials {
    password: String,
}

pub fn credentials_path() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/etc/piholedns/credentials.toml")
    }
    #[cfg(windows)]
    {
        PathBuf::from(r"C:\ProgramData\piholedns\credentials.toml")
    }
}

fn load_credentials_file(path: &Path) -> Result<CredentialsFile> {
    if !path.exists() {
        return Ok(CredentialsFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials file: {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse credentials file: {}", path.display()))
}

fn save_credentials_file(path: &Path, creds: &CredentialsFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(creds).context("Failed to serialize credentials")?;

    fs::write(path, &content)
        .with_context(|| format!("Failed to write credentials file: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms)
            .with_context(|| format!("Failed to set permissions on: {}", path.display()))?;
    }

    Ok(())
}

pub fn store_password(id: &str, password: &str) -> Result<()> {
    store_password_in(&credentials_path(), id, password)
}

pub fn get_password(id: &str) -> Result<String> {
    get_password_in(&credentials_path(), id)
}

pub fn delete_password(id: &str) -> Result<()> {
    delete_password_in(&credentials_path(), id)
}

pub fn store_password_in(path: &Path, id: &str, password: &str) -> Result<()> {
    let mut creds_file = load_credentials_file(path)?;

    creds_file.appliances.insert(
        id.to_string(),
        ApplianceCredentials {
            password: password.to_string(),
        },
    );

    save_credentials_file(path, &creds_file)
}

pub fn get_password_in(path: &Path, id: &str) -> Result<String> {
    let creds_file = load_credentials_file(path)?;

    creds_file
        .appliances
        .get(id)
        .map(|creds| creds.password.clone())
        .ok_or_else(|| {
            anyhow!(
                "Password not found for Pi-hole: {}. Use 'piholedns set-password {}' to store it.",
                id,
                id
            )
        })
}

pub fn delete_password_in(path: &Path, id: &str) -> Result<()> {
    let mut creds_file = load_credentials_file(path)?;

    if creds_file.appliances.remove(id).is_none() {
        return Err(anyhow!("No password found for Pi-hole: {}", id));
    }

    save_credentials_file(path, &creds_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.toml");

        store_password_in(&path, "pihole", "hunter2").unwrap();
        store_password_in(&path, "backup", "swordfish").unwrap();
        assert_eq!(get_password_in(&path, "pihole").unwrap(), "hunter2");
        assert_eq!(get_password_in(&path, "backup").unwrap(), "swordfish");

        delete_password_in(&path, "pihole").unwrap();
        let err = get_password_in(&path, "pihole").unwrap_err();
        assert!(err.to_string().contains("set-password pihole"));
        assert!(delete_password_in(&path, "pihole").is_err());
    }

    #[test]
    fn test_missing_file_has_no_passwords() {
        let dir = tempfile::tempdir().unwrap();
        assert!(get_password_in(&dir.path().join("none.toml"), "pihole").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        store_password_in(&path, "pihole", "hunter2").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
