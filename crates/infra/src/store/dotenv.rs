//! Dotenv-file credential store
//!
//! Credentials live in the project's `.env` file. `load` parses the file;
//! `persist` rewrites only the managed keys in place, preserving every
//! unrelated line, and appends keys that are not present yet. Persisting the
//! same credentials twice rewrites identical content.
//!
//! Stored formats match the historical contract: the access-token expiry is
//! float seconds since the epoch; the refresh-token expiry is ISO-8601 with
//! a space instead of the `T` separator.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use bibsync_core::ports::TokenStore;
use bibsync_domain::constants::STORED_EXPIRY_FORMAT;
use bibsync_domain::{BibsyncError, Credentials, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

const KEY_CLIENT_ID: &str = "WORLDCAT_METADATA_API_KEY";
const KEY_CLIENT_SECRET: &str = "WORLDCAT_METADATA_API_SECRET";
const KEY_ACCESS_TOKEN: &str = "WORLDCAT_METADATA_API_ACCESS_TOKEN";
const KEY_ACCESS_TOKEN_TYPE: &str = "WORLDCAT_METADATA_API_ACCESS_TOKEN_TYPE";
const KEY_ACCESS_TOKEN_EXPIRES_AT: &str = "WORLDCAT_METADATA_API_ACCESS_TOKEN_EXPIRES_AT";
const KEY_REFRESH_TOKEN: &str = "WORLDCAT_METADATA_API_REFRESH_TOKEN";
const KEY_REFRESH_TOKEN_EXPIRES_AT: &str = "WORLDCAT_METADATA_API_REFRESH_TOKEN_EXPIRES_AT";

/// Token store backed by a `.env`-style file.
pub struct DotenvTokenStore {
    path: PathBuf,
}

impl DotenvTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_contents(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|err| {
            BibsyncError::Storage(format!(
                "failed to read credential file {}: {err}",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl TokenStore for DotenvTokenStore {
    async fn load(&self) -> Result<Credentials> {
        let contents = self.read_contents()?;
        let vars = parse_env(&contents);

        let required = |key: &str| {
            vars.get(key).cloned().ok_or_else(|| {
                BibsyncError::Storage(format!(
                    "missing {key} in credential file {}",
                    self.path.display()
                ))
            })
        };

        let refresh_token_expires_at = vars
            .get(KEY_REFRESH_TOKEN_EXPIRES_AT)
            .map(|raw| parse_stored_expiry(raw))
            .transpose()?;

        Ok(Credentials {
            client_id: required(KEY_CLIENT_ID)?,
            client_secret: required(KEY_CLIENT_SECRET)?,
            access_token: required(KEY_ACCESS_TOKEN)?,
            token_type: required(KEY_ACCESS_TOKEN_TYPE)?,
            access_token_expires_at: parse_epoch_seconds(
                &required(KEY_ACCESS_TOKEN_EXPIRES_AT)?,
            )?,
            refresh_token: vars.get(KEY_REFRESH_TOKEN).cloned(),
            refresh_token_expires_at,
        })
    }

    async fn persist(&self, credentials: &Credentials) -> Result<()> {
        let contents = self.read_contents()?;
        let mut lines: Vec<String> = contents.lines().map(ToString::to_string).collect();

        let mut updates: Vec<(&str, String)> = vec![
            (KEY_ACCESS_TOKEN, credentials.access_token.clone()),
            (KEY_ACCESS_TOKEN_TYPE, credentials.token_type.clone()),
            (
                KEY_ACCESS_TOKEN_EXPIRES_AT,
                format_epoch_seconds(credentials.access_token_expires_at),
            ),
        ];
        if let Some(refresh_token) = &credentials.refresh_token {
            updates.push((KEY_REFRESH_TOKEN, refresh_token.clone()));
        }
        if let Some(expires_at) = credentials.refresh_token_expires_at {
            updates.push((
                KEY_REFRESH_TOKEN_EXPIRES_AT,
                expires_at.format(STORED_EXPIRY_FORMAT).to_string(),
            ));
        }

        for (key, value) in updates {
            upsert_line(&mut lines, key, &value);
        }

        let mut rewritten = lines.join("\n");
        rewritten.push('\n');
        fs::write(&self.path, rewritten).map_err(|err| {
            BibsyncError::Storage(format!(
                "failed to write credential file {}: {err}",
                self.path.display()
            ))
        })?;

        debug!(path = %self.path.display(), "persisted renewed credentials");
        Ok(())
    }
}

/// Replace the `KEY=...` line in place, or append one.
fn upsert_line(lines: &mut Vec<String>, key: &str, value: &str) {
    let formatted = format!("{key}='{value}'");
    match lines.iter_mut().find(|line| line.trim_start().starts_with(&format!("{key}="))) {
        Some(line) => *line = formatted,
        None => lines.push(formatted),
    }
}

/// Minimal `.env` parsing: `KEY=value` lines, `#` comments, optional single
/// or double quotes around the value.
fn parse_env(contents: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();
            let value = value
                .strip_prefix('\'')
                .and_then(|rest| rest.strip_suffix('\''))
                .or_else(|| {
                    value.strip_prefix('"').and_then(|rest| rest.strip_suffix('"'))
                })
                .unwrap_or(value);
            vars.insert(key.trim().to_string(), value.to_string());
        }
    }
    vars
}

/// Parse float seconds since the epoch.
fn parse_epoch_seconds(raw: &str) -> Result<DateTime<Utc>> {
    let seconds: f64 = raw.parse().map_err(|_| {
        BibsyncError::Storage(format!("'{raw}' is not a valid epoch-seconds timestamp"))
    })?;

    let whole = seconds.trunc() as i64;
    let nanos = (seconds.fract() * 1e9).round() as u32;
    DateTime::<Utc>::from_timestamp(whole, nanos).ok_or_else(|| {
        BibsyncError::Storage(format!("epoch-seconds timestamp '{raw}' is out of range"))
    })
}

fn format_epoch_seconds(instant: DateTime<Utc>) -> String {
    let seconds =
        instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_micros()) / 1e6;
    format!("{seconds:.6}")
}

/// Parse the stored refresh-token expiry (`%Y-%m-%d %H:%M:%SZ`).
fn parse_stored_expiry(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, STORED_EXPIRY_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|err| {
            BibsyncError::Storage(format!("'{raw}' is not a valid stored expiry: {err}"))
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    use super::*;

    fn seed_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn sample_credentials() -> Credentials {
        Credentials {
            client_id: "api-key".into(),
            client_secret: "api-secret".into(),
            access_token: "tk_new".into(),
            token_type: "bearer".into(),
            access_token_expires_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0)
                .expect("valid timestamp"),
            refresh_token: Some("rt_new".into()),
            refresh_token_expires_at: Utc.with_ymd_and_hms(2026, 9, 30, 22, 43, 7).single(),
        }
    }

    const SEED: &str = "\
# credentials\n\
WORLDCAT_METADATA_API_KEY='api-key'\n\
WORLDCAT_METADATA_API_SECRET='api-secret'\n\
WORLDCAT_METADATA_API_ACCESS_TOKEN='tk_old'\n\
WORLDCAT_METADATA_API_ACCESS_TOKEN_TYPE='bearer'\n\
WORLDCAT_METADATA_API_ACCESS_TOKEN_EXPIRES_AT='1600000000.000000'\n\
UNRELATED_SETTING='keep me'\n";

    /// Persisting renewed credentials and reloading them yields identical
    /// token fields.
    #[tokio::test]
    async fn round_trips_persisted_credentials() {
        let file = seed_file(SEED);
        let store = DotenvTokenStore::new(file.path());

        let credentials = sample_credentials();
        store.persist(&credentials).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded, credentials);
    }

    #[tokio::test]
    async fn persist_preserves_unrelated_lines_and_comments() {
        let file = seed_file(SEED);
        let store = DotenvTokenStore::new(file.path());

        store.persist(&sample_credentials()).await.unwrap();

        let contents = fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("# credentials"));
        assert!(contents.contains("UNRELATED_SETTING='keep me'"));
        assert!(contents.contains("WORLDCAT_METADATA_API_ACCESS_TOKEN='tk_new'"));
        assert!(!contents.contains("tk_old"));
    }

    #[tokio::test]
    async fn persist_is_idempotent() {
        let file = seed_file(SEED);
        let store = DotenvTokenStore::new(file.path());

        let credentials = sample_credentials();
        store.persist(&credentials).await.unwrap();
        let first = fs::read_to_string(file.path()).unwrap();

        store.persist(&credentials).await.unwrap();
        let second = fs::read_to_string(file.path()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn load_without_refresh_token_yields_none() {
        let file = seed_file(SEED);
        let store = DotenvTokenStore::new(file.path());

        let credentials = store.load().await.unwrap();
        assert_eq!(credentials.access_token, "tk_old");
        assert!(credentials.refresh_token.is_none());
        assert!(credentials.refresh_token_expires_at.is_none());
    }

    #[tokio::test]
    async fn load_reports_missing_keys() {
        let file = seed_file("WORLDCAT_METADATA_API_KEY='api-key'\n");
        let store = DotenvTokenStore::new(file.path());

        let err = store.load().await.expect_err("incomplete file");
        assert!(matches!(err, BibsyncError::Storage(_)));
    }

    #[test]
    fn stored_expiry_round_trip() {
        let parsed = parse_stored_expiry("2021-09-30 22:43:07Z").unwrap();
        assert_eq!(parsed.format(STORED_EXPIRY_FORMAT).to_string(), "2021-09-30 22:43:07Z");
    }

    #[test]
    fn epoch_seconds_parses_fractions() {
        let parsed = parse_epoch_seconds("1635551899.500000").unwrap();
        assert_eq!(parsed.timestamp(), 1_635_551_899);
        assert_eq!(parsed.timestamp_subsec_millis(), 500);
    }
}
