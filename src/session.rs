//! Claude Code's live config document. ccswitch only ever reads and replaces
//! its `oauthAccount` field; everything else is carried through untouched.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::{fs, io, path::PathBuf};

use crate::{error::SwitchError, files, paths::Paths};

const OAUTH_ACCOUNT: &str = "oauthAccount";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    path: PathBuf,
    doc: Value,
}

impl SessionConfig {
    pub fn load(paths: &Paths) -> Result<SessionConfig> {
        let path = paths.session_config_path();
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SwitchError::NoSession.into());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Cannot read Claude config at {}", path.display()));
            }
        };
        let doc = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        Ok(SessionConfig { path, doc })
    }

    pub fn email(&self) -> Option<&str> {
        self.doc.get(OAUTH_ACCOUNT)?.get("emailAddress")?.as_str()
    }

    pub fn uuid(&self) -> Option<&str> {
        self.doc.get(OAUTH_ACCOUNT)?.get("accountUuid")?.as_str()
    }

    /// The logged-in email, or `NoSession` when nobody is logged in.
    pub fn require_email(&self) -> Result<&str, SwitchError> {
        self.email().ok_or(SwitchError::NoSession)
    }

    pub fn to_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.doc)?)
    }

    /// Replace only `oauthAccount`, then write the document back to the path
    /// it was loaded from with the atomic-write discipline.
    pub fn merge_oauth_account(mut self, account: Value) -> Result<()> {
        match self.doc.as_object_mut() {
            Some(map) => {
                map.insert(OAUTH_ACCOUNT.to_string(), account);
            }
            None => bail!("Claude config at {} is not a JSON object", self.path.display()),
        }
        let content = serde_json::to_string_pretty(&self.doc)?;
        files::write_atomic(&self.path, &content)
    }
}

/// `oauthAccount` of an arbitrary config document, if present and not null.
pub fn oauth_account(doc: &Value) -> Option<&Value> {
    doc.get(OAUTH_ACCOUNT).filter(|v| !v.is_null())
}

/// Logged-in email for display purposes; any failure reads as "nobody".
pub fn current_email(paths: &Paths) -> Option<String> {
    SessionConfig::load(paths)
        .ok()
        .and_then(|s| s.email().map(String::from))
}
