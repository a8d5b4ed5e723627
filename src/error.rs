use thiserror::Error;

/// Conditions an account operation can stop on. Wrapped in `anyhow::Error`
/// at the call sites, so callers that care can downcast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwitchError {
    #[error("Cannot determine your home directory")]
    NoHomeDir,

    #[error("No active Claude account found. Please log in to Claude Code first.")]
    NoSession,

    #[error("No credentials found for the current Claude session")]
    NoCredentials,

    #[error("No account found matching '{0}'")]
    AccountNotFound(String),

    #[error("No account has the alias '{0}'")]
    AliasNotFound(String),

    #[error("Invalid alias '{alias}': {reason}")]
    InvalidAlias { alias: String, reason: &'static str },

    #[error("Alias '{alias}' is already used by Account {owner}")]
    AliasTaken { alias: String, owner: u32 },

    #[error("No keychain entry holds the current Claude credentials")]
    NoServiceName,

    #[error("Backup for Account {0} is incomplete: missing {1}")]
    IncompleteBackup(u32, &'static str),

    #[error("Config backup for Account {0} has no oauthAccount")]
    MissingOauthAccount(u32),

    #[error("Active account '{0}' is not managed. Run `ccswitch add-account` first.")]
    UnmanagedSession(String),

    #[error("{backend} backend is unavailable: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },

    #[error("Refusing to write an invalid registry: {0}")]
    InvalidRegistry(String),
}
