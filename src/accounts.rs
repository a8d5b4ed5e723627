use anyhow::{bail, Result};
use colored::Colorize;
use log::{debug, info, warn};
use std::io::{self, BufRead, Write};

use crate::{
    alias,
    backend::{self, SecretBackend, DEFAULT_SERVICE},
    backup::ConfigBackups,
    error::SwitchError,
    paths::Paths,
    platform::Platform,
    registry::{now_utc, AccountEntry, Registry, RegistryStore},
    session::{self, SessionConfig},
    usage,
};

/// Everything resolved once at startup.
pub struct Context {
    pub platform: Platform,
    pub paths: Paths,
}

impl Context {
    fn store(&self) -> RegistryStore {
        registry_store(&self.paths)
    }

    fn connect(&self) -> Result<Box<dyn SecretBackend>> {
        let backend = backend::connect(self.platform, &self.paths)?;
        debug!("using the {} backend", backend.kind());
        Ok(backend)
    }
}

fn registry_store(paths: &Paths) -> RegistryStore {
    RegistryStore::new(paths.registry_path())
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AddOutcome {
    Added { num: u32, email: String },
    AlreadyManaged { num: u32, email: String },
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SwitchOutcome {
    AlreadyActive { num: u32, email: String },
    Switched { from: String, num: u32, email: String },
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct AccountRow {
    pub num: u32,
    pub email: String,
    pub alias: Option<String>,
    pub active: bool,
}

// ── Core functions (no stdout) ────────────────────────────────────────────────

/// Capture the live session as a new managed account.
pub(crate) fn core_add(paths: &Paths, backend: &dyn SecretBackend) -> Result<AddOutcome> {
    paths.setup_dirs()?;

    let session = SessionConfig::load(paths)?;
    let email = session.require_email()?.to_string();
    let store = registry_store(paths);
    let seq = store.load()?;

    if let Some(num) = seq.find_by_email(&email) {
        return Ok(AddOutcome::AlreadyManaged { num, email });
    }

    let live_creds = backend.read_active()?.ok_or(SwitchError::NoCredentials)?;
    let service_name = backend
        .active_service_name()?
        .ok_or(SwitchError::NoServiceName)?;

    let num = seq.next_account_number();
    backend.write_account(num, &email, &live_creds)?;
    ConfigBackups::new(paths).write(num, &email, &session.to_pretty()?)?;

    let entry = AccountEntry {
        email: email.clone(),
        uuid: session.uuid().unwrap_or_default().to_string(),
        service_name,
        added: now_utc(),
        alias: None,
    };
    store.replace(|mut seq| {
        seq.accounts.insert(num, entry);
        seq.sequence.push(num);
        seq.active_account_number = Some(num);
        Ok(seq)
    })?;

    info!("added {email} as account {num}");
    Ok(AddOutcome::Added { num, email })
}

/// Save the live session under its own account, then materialise `target_num`.
pub(crate) fn core_switch(
    paths: &Paths,
    backend: &dyn SecretBackend,
    target_num: u32,
) -> Result<SwitchOutcome> {
    paths.setup_dirs()?;
    let store = registry_store(paths);
    let seq = store.load()?;
    let backups = ConfigBackups::new(paths);

    let target = seq
        .get(target_num)
        .cloned()
        .ok_or_else(|| SwitchError::AccountNotFound(target_num.to_string()))?;

    let session = SessionConfig::load(paths)?;
    let current_email = session.require_email()?.to_string();
    let current_num = seq
        .find_by_email(&current_email)
        .ok_or_else(|| SwitchError::UnmanagedSession(current_email.clone()))?;

    if current_num == target_num {
        return Ok(SwitchOutcome::AlreadyActive {
            num: target_num,
            email: target.email,
        });
    }

    // Step 1: Snapshot current account
    let live_creds = backend.read_active()?.ok_or(SwitchError::NoCredentials)?;
    backend.write_account(current_num, &current_email, &live_creds)?;
    backups.write(current_num, &current_email, &session.to_pretty()?)?;
    debug!("captured account {current_num} before switching");

    // Step 2: Load target backup; nothing live has changed yet
    let target_creds = backend
        .read_account(target_num, &target.email)?
        .ok_or(SwitchError::IncompleteBackup(target_num, "credentials"))?;
    let target_config = backups
        .read(target_num, &target.email)?
        .ok_or(SwitchError::IncompleteBackup(target_num, "config"))?;
    let target_oauth = session::oauth_account(&target_config)
        .cloned()
        .ok_or(SwitchError::MissingOauthAccount(target_num))?;

    // Step 3: Activate, credentials before config
    let service_name = if target.service_name.is_empty() {
        DEFAULT_SERVICE
    } else {
        target.service_name.as_str()
    };
    backend.write_active(&target_creds, service_name)?;
    session.merge_oauth_account(target_oauth)?;

    // Step 4: Persist updated state
    store.replace(|mut seq| {
        seq.active_account_number = Some(target_num);
        Ok(seq)
    })?;

    info!("switched from account {current_num} to {target_num}");
    Ok(SwitchOutcome::Switched {
        from: current_email,
        num: target_num,
        email: target.email,
    })
}

/// Drop an account and its backups. Clears the active pointer if it pointed here.
pub(crate) fn core_remove(
    paths: &Paths,
    backend: &dyn SecretBackend,
    num: u32,
) -> Result<AccountEntry> {
    let store = registry_store(paths);
    let entry = store
        .load()?
        .get(num)
        .cloned()
        .ok_or_else(|| SwitchError::AccountNotFound(num.to_string()))?;

    if let Err(e) = backend.delete_account(num, &entry.email) {
        warn!("could not delete stored credentials for account {num}: {e:#}");
    }
    ConfigBackups::new(paths).delete(num, &entry.email)?;

    store.replace(|mut seq| {
        seq.accounts.remove(&num);
        seq.sequence.retain(|&n| n != num);
        if seq.active_account_number == Some(num) {
            seq.active_account_number = None;
        }
        Ok(seq)
    })?;

    info!("removed account {num}");
    Ok(entry)
}

pub(crate) fn core_alias(paths: &Paths, identifier: &str, name: &str) -> Result<u32> {
    alias::validate(name)?;

    let store = registry_store(paths);
    let seq = store.load()?;
    let num = seq.require(identifier)?;
    if let Some(owner) = seq.find_by_alias(name) {
        if owner != num {
            return Err(SwitchError::AliasTaken {
                alias: name.to_string(),
                owner,
            }
            .into());
        }
    }

    store.replace(|mut seq| {
        if let Some(entry) = seq.accounts.get_mut(&num) {
            entry.alias = Some(name.to_string());
        }
        Ok(seq)
    })?;
    Ok(num)
}

/// Clear an alias. Takes the alias itself, not an email or number.
pub(crate) fn core_unalias(paths: &Paths, name: &str) -> Result<u32> {
    let store = registry_store(paths);
    let num = store
        .load()?
        .find_by_alias(name)
        .ok_or_else(|| SwitchError::AliasNotFound(name.to_string()))?;

    store.replace(|mut seq| {
        if let Some(entry) = seq.accounts.get_mut(&num) {
            entry.alias = None;
        }
        Ok(seq)
    })?;
    Ok(num)
}

/// The live account: by logged-in email, else whatever the registry last set.
fn active_num(seq: &Registry, live_email: Option<&str>) -> Option<u32> {
    live_email
        .and_then(|e| seq.find_by_email(e))
        .or(seq.active_account_number)
}

pub(crate) fn core_list(paths: &Paths) -> Result<Vec<AccountRow>> {
    let seq = registry_store(paths).load()?;
    let active = active_num(&seq, session::current_email(paths).as_deref());

    Ok(seq
        .sequence
        .iter()
        .filter_map(|&num| {
            seq.get(num).map(|entry| AccountRow {
                num,
                email: entry.email.clone(),
                alias: entry.alias.clone(),
                active: active == Some(num),
            })
        })
        .collect())
}

// ── Add current account ───────────────────────────────────────────────────────

pub fn add(ctx: &Context) -> Result<()> {
    let backend = ctx.connect()?;
    match core_add(&ctx.paths, backend.as_ref())? {
        AddOutcome::AlreadyManaged { num, email } => {
            println!(
                "  {} {} is already managed (Account {num}).",
                "·".yellow(),
                email
            );
        }
        AddOutcome::Added { num, email } => {
            println!(
                "  {} Added {} as Account {}",
                "✓".green().bold(),
                email,
                num
            );
        }
    }
    Ok(())
}

// ── Remove account ────────────────────────────────────────────────────────────

pub fn remove(ctx: &Context, identifier: &str, assume_yes: bool) -> Result<()> {
    let stdin = io::stdin();
    remove_with(ctx, identifier, assume_yes, &mut stdin.lock())
}

fn remove_with<R: BufRead>(
    ctx: &Context,
    identifier: &str,
    assume_yes: bool,
    input: &mut R,
) -> Result<()> {
    let seq = ctx.store().load()?;

    if seq.accounts.is_empty() {
        bail!("No accounts are managed yet. Run `ccswitch add-account` first.");
    }

    let account_num = seq.require(identifier)?;
    let email = seq
        .get(account_num)
        .map(|e| e.email.clone())
        .unwrap_or_default();

    if active_num(&seq, session::current_email(&ctx.paths).as_deref()) == Some(account_num) {
        println!(
            "  {} Account {} ({}) is currently active.",
            "!".yellow().bold(),
            account_num,
            email
        );
    }

    if !assume_yes {
        print!(
            "\n  Remove {} ({})? [y/N] ",
            format!("Account {account_num}").bold(),
            email
        );
        io::stdout().flush()?;

        if !confirm(input)? {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let backend = ctx.connect()?;
    let entry = core_remove(&ctx.paths, backend.as_ref(), account_num)?;
    println!(
        "\n  {} Removed Account {} ({})",
        "✓".green().bold(),
        account_num,
        entry.email
    );
    Ok(())
}

/// Only an explicit `y`/`Y` proceeds; anything else, EOF included, is no.
fn confirm<R: BufRead>(input: &mut R) -> Result<bool> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y"))
}

// ── List accounts ─────────────────────────────────────────────────────────────

pub fn list(ctx: &Context) -> Result<()> {
    let rows = core_list(&ctx.paths)?;

    if rows.is_empty() {
        println!("\n  {}\n", "No accounts managed yet.".dimmed());
        println!(
            "  Run {} to add the current account.\n",
            "ccswitch add-account".cyan().bold()
        );
        return Ok(());
    }

    println!("\n  {}", "Managed Accounts".bold());
    println!("  {}", "─".repeat(40).dimmed());

    for row in rows {
        let alias = row
            .alias
            .as_deref()
            .map(|a| format!(" [{a}]"))
            .unwrap_or_default();

        if row.active {
            println!(
                "  {}  {}{}  {}",
                format!("▶ {:>2}", row.num).green().bold(),
                row.email.green().bold(),
                alias.green(),
                "(active)".green().dimmed()
            );
        } else {
            println!(
                "  {}  {}{}",
                format!("  {:>2}", row.num).dimmed(),
                row.email,
                alias.cyan()
            );
        }
    }

    println!("  {}\n", "─".repeat(40).dimmed());
    Ok(())
}

// ── Status ────────────────────────────────────────────────────────────────────

pub fn status(ctx: &Context, show_usage: bool) -> Result<()> {
    let seq = ctx.store().load()?;

    let Some(email) = session::current_email(&ctx.paths) else {
        println!("\n  {} Not logged in to Claude Code.\n", "✗".red().bold());
        return Ok(());
    };

    match seq.find_by_email(&email).and_then(|n| seq.get(n).map(|e| (n, e))) {
        Some((num, entry)) => {
            let label = match &entry.alias {
                Some(a) => format!("(Account {num}, alias {a})"),
                None => format!("(Account {num})"),
            };
            println!(
                "\n  {} {} {}\n",
                "▶".green().bold(),
                email.bold(),
                label.dimmed()
            );
        }
        None => println!(
            "\n  {} {} {}\n",
            "▶".yellow().bold(),
            email.bold(),
            "(not managed — run `ccswitch add-account`)".dimmed()
        ),
    }

    if show_usage {
        // Best effort: any failure just means no usage lines.
        let report = ctx
            .connect()
            .ok()
            .and_then(|b| b.read_active().ok().flatten())
            .and_then(|creds| usage::fetch(&creds));
        if let Some(report) = report {
            for (label, window) in report.windows() {
                println!(
                    "  {:<8} {:>5.1}% used{}",
                    label,
                    window.utilization,
                    window
                        .resets_at
                        .as_deref()
                        .map(|t| format!("  (resets {t})"))
                        .unwrap_or_default()
                        .dimmed()
                );
            }
            println!();
        }
    }
    Ok(())
}

// ── Alias ─────────────────────────────────────────────────────────────────────

pub fn set_alias(ctx: &Context, identifier: &str, name: &str) -> Result<()> {
    let num = core_alias(&ctx.paths, identifier, name)?;
    println!(
        "  {} Account {} is now also known as {}",
        "✓".green().bold(),
        num,
        name.cyan().bold()
    );
    Ok(())
}

pub fn unalias(ctx: &Context, name: &str) -> Result<()> {
    let num = core_unalias(&ctx.paths, name)?;
    println!(
        "  {} Removed alias {} from Account {}",
        "✓".green().bold(),
        name,
        num
    );
    Ok(())
}

// ── Switch (rotate to next) ───────────────────────────────────────────────────

pub fn switch_next(ctx: &Context) -> Result<()> {
    let seq = ctx.store().load()?;

    if seq.accounts.is_empty() {
        bail!("No accounts managed yet. Run `ccswitch add-account` first.");
    }

    let session = SessionConfig::load(&ctx.paths)?;
    let current_email = session.require_email()?;

    let Some(current_num) = seq.find_by_email(current_email) else {
        println!(
            "\n  {} Active account '{}' is not managed — adding it...",
            "·".yellow(),
            current_email
        );
        add(ctx)?;
        println!(
            "\n  Run {} again to switch to the next account.\n",
            "ccswitch switch".cyan().bold()
        );
        return Ok(());
    };

    if seq.sequence.len() < 2 {
        bail!("Only one account managed. Add another with `ccswitch add-account`.");
    }

    match seq.next_in_sequence(current_num) {
        Some(next) => do_switch(ctx, next),
        None => bail!("No account to rotate to"),
    }
}

// ── Switch to specific account ────────────────────────────────────────────────

pub fn switch_to(ctx: &Context, identifier: &str) -> Result<()> {
    let seq = ctx.store().load()?;

    if seq.accounts.is_empty() {
        bail!("No accounts managed yet. Run `ccswitch add-account` first.");
    }

    let target_num = seq.require(identifier)?;
    do_switch(ctx, target_num)
}

// ── CLI switch wrapper ────────────────────────────────────────────────────────

fn do_switch(ctx: &Context, target_num: u32) -> Result<()> {
    let backend = ctx.connect()?;

    match core_switch(&ctx.paths, backend.as_ref(), target_num)? {
        SwitchOutcome::AlreadyActive { num, email } => {
            println!(
                "\n  {} Already using {} (Account {num}).\n",
                "·".cyan(),
                email.bold()
            );
        }
        SwitchOutcome::Switched { from, num, email } => {
            println!(
                "\n  {} {}  {}  {} (Account {num})",
                "→".cyan().bold(),
                from.dimmed(),
                "→".dimmed(),
                email.cyan().bold()
            );
            list(ctx)?;
            println!("  {} Restart Claude Code to apply.\n", "→".cyan().bold());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use serde_json::{json, Value};
    use std::{fs, io::Cursor};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        paths: Paths,
        backend: MemoryBackend,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let paths = Paths::under(tmp.path());
            Fixture {
                _tmp: tmp,
                paths,
                backend: MemoryBackend::new(),
            }
        }

        /// What Claude Code does on login: rewrite oauthAccount and the creds.
        fn login(&self, email: &str, creds: &str) {
            let path = self.paths.home.join(".claude.json");
            let mut doc: Value = fs::read_to_string(&path)
                .ok()
                .and_then(|c| serde_json::from_str(&c).ok())
                .unwrap_or_else(|| json!({"numStartups": 3, "theme": "dark"}));
            doc["oauthAccount"] = json!({
                "emailAddress": email,
                "accountUuid": format!("uuid-{email}"),
                "organizationName": format!("org of {email}"),
            });
            fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
            self.backend.set_active(creds);
        }

        fn live_config(&self) -> Value {
            let path = self.paths.session_config_path();
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
        }

        fn registry(&self) -> Registry {
            registry_store(&self.paths).load().unwrap()
        }

        fn registry_bytes(&self) -> String {
            fs::read_to_string(self.paths.registry_path()).unwrap()
        }

        fn add(&self) -> AddOutcome {
            core_add(&self.paths, &self.backend).unwrap()
        }

        fn switch(&self, identifier: &str) -> Result<SwitchOutcome> {
            let num = self.registry().require(identifier)?;
            core_switch(&self.paths, &self.backend, num)
        }

        fn ctx(&self) -> Context {
            Context {
                platform: Platform::Linux,
                paths: self.paths.clone(),
            }
        }
    }

    fn switch_error<T: std::fmt::Debug>(result: Result<T>) -> SwitchError {
        let err = result.unwrap_err();
        err.downcast_ref::<SwitchError>()
            .cloned()
            .unwrap_or_else(|| panic!("unexpected error: {err:#}"))
    }

    #[test]
    fn add_registers_the_live_session() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");

        assert_eq!(
            fx.add(),
            AddOutcome::Added {
                num: 1,
                email: "a@x.com".into()
            }
        );

        let seq = fx.registry();
        let entry = seq.get(1).unwrap();
        assert_eq!(entry.email, "a@x.com");
        assert_eq!(entry.uuid, "uuid-a@x.com");
        assert_eq!(entry.service_name, DEFAULT_SERVICE);
        assert_eq!(seq.sequence, vec![1]);
        assert_eq!(seq.active_account_number, Some(1));

        assert_eq!(
            fx.backend.read_account(1, "a@x.com").unwrap().as_deref(),
            Some("C1")
        );
        let backup = ConfigBackups::new(&fx.paths).read(1, "a@x.com").unwrap().unwrap();
        assert_eq!(backup["oauthAccount"]["emailAddress"], "a@x.com");
    }

    #[test]
    fn add_is_idempotent_for_a_managed_email() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        let before = fx.registry_bytes();

        assert_eq!(
            fx.add(),
            AddOutcome::AlreadyManaged {
                num: 1,
                email: "a@x.com".into()
            }
        );
        assert_eq!(fx.registry_bytes(), before);
        assert_eq!(fx.registry().accounts.len(), 1);
    }

    #[test]
    fn add_requires_a_session_credentials_and_a_service_name() {
        let fx = Fixture::new();
        assert_eq!(
            switch_error(core_add(&fx.paths, &fx.backend)),
            SwitchError::NoSession
        );

        fx.login("a@x.com", "");
        assert_eq!(
            switch_error(core_add(&fx.paths, &fx.backend)),
            SwitchError::NoCredentials
        );

        fx.backend.set_active("C1");
        fx.backend.clear_service();
        assert_eq!(
            switch_error(core_add(&fx.paths, &fx.backend)),
            SwitchError::NoServiceName
        );
        assert!(!fx.paths.registry_path().exists());
    }

    #[test]
    fn switching_back_and_forth_restores_each_account_exactly() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        let a_oauth = fx.live_config()["oauthAccount"].clone();

        fx.login("b@x.com", "C2");
        fx.add();
        let b_oauth = fx.live_config()["oauthAccount"].clone();

        fx.switch("a@x.com").unwrap();
        assert_eq!(fx.backend.active().as_deref(), Some("C1"));
        assert_eq!(fx.live_config()["oauthAccount"], a_oauth);
        assert_eq!(fx.registry().active_account_number, Some(1));

        fx.switch("b@x.com").unwrap();
        assert_eq!(fx.backend.active().as_deref(), Some("C2"));
        assert_eq!(fx.live_config()["oauthAccount"], b_oauth);

        fx.switch("1").unwrap();
        assert_eq!(fx.backend.active().as_deref(), Some("C1"));
        assert_eq!(fx.live_config()["oauthAccount"], a_oauth);
        assert_eq!(fx.live_config()["numStartups"], 3);
    }

    #[test]
    fn switch_captures_credentials_refreshed_since_the_last_backup() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        fx.login("b@x.com", "C2");
        fx.add();
        fx.switch("1").unwrap();

        // Claude Code refreshed A's token while it was live.
        fx.backend.set_active("C1-refreshed");
        fx.switch("2").unwrap();
        fx.switch("1").unwrap();
        assert_eq!(fx.backend.active().as_deref(), Some("C1-refreshed"));
    }

    #[test]
    fn switch_to_the_active_account_is_a_no_op() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        let before = fx.registry_bytes();

        assert_eq!(
            fx.switch("a@x.com").unwrap(),
            SwitchOutcome::AlreadyActive {
                num: 1,
                email: "a@x.com".into()
            }
        );
        assert_eq!(fx.registry_bytes(), before);
    }

    #[test]
    fn switch_with_an_incomplete_target_backup_leaves_everything_live_alone() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        fx.login("b@x.com", "C2");
        fx.add();
        fx.backend.delete_account(1, "a@x.com").unwrap();

        let live_before = fx.live_config();
        let registry_before = fx.registry_bytes();

        assert_eq!(
            switch_error(fx.switch("1")),
            SwitchError::IncompleteBackup(1, "credentials")
        );
        assert_eq!(fx.backend.active().as_deref(), Some("C2"));
        assert_eq!(fx.live_config(), live_before);
        assert_eq!(fx.registry_bytes(), registry_before);
    }

    #[test]
    fn switch_rejects_a_target_backup_without_oauth_account() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        fx.login("b@x.com", "C2");
        fx.add();
        ConfigBackups::new(&fx.paths)
            .write(1, "a@x.com", r#"{"oauthAccount":null}"#)
            .unwrap();

        let live_before = fx.live_config();
        assert_eq!(
            switch_error(fx.switch("1")),
            SwitchError::MissingOauthAccount(1)
        );
        assert_eq!(fx.backend.active().as_deref(), Some("C2"));
        assert_eq!(fx.live_config(), live_before);
        assert_eq!(fx.registry().active_account_number, Some(2));
    }

    #[test]
    fn switch_refuses_to_overwrite_an_unmanaged_session() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        fx.login("stranger@x.com", "CS");

        assert_eq!(
            switch_error(fx.switch("1")),
            SwitchError::UnmanagedSession("stranger@x.com".into())
        );
        assert_eq!(fx.backend.active().as_deref(), Some("CS"));
    }

    #[test]
    fn switch_moves_the_keychain_entry_to_the_targets_service_name() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        fx.login("b@x.com", "C2");
        fx.add();

        let store = registry_store(&fx.paths);
        store
            .replace(|mut seq| {
                seq.accounts.get_mut(&1).unwrap().service_name = "Claude Code".into();
                Ok(seq)
            })
            .unwrap();

        fx.switch("1").unwrap();
        assert_eq!(fx.backend.service().as_deref(), Some("Claude Code"));
    }

    #[test]
    fn alias_resolves_like_the_email() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        fx.login("b@x.com", "C2");
        fx.add();

        assert_eq!(core_alias(&fx.paths, "a@x.com", "work").unwrap(), 1);
        assert_eq!(fx.registry().get(1).unwrap().alias.as_deref(), Some("work"));

        fx.switch("work").unwrap();
        assert_eq!(fx.backend.active().as_deref(), Some("C1"));
        assert_eq!(fx.live_config()["oauthAccount"]["emailAddress"], "a@x.com");
    }

    #[test]
    fn colliding_alias_is_rejected_without_touching_the_registry() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        fx.login("b@x.com", "C2");
        fx.add();
        core_alias(&fx.paths, "1", "work").unwrap();
        let before = fx.registry_bytes();

        assert_eq!(
            switch_error(core_alias(&fx.paths, "b@x.com", "work")),
            SwitchError::AliasTaken {
                alias: "work".into(),
                owner: 1
            }
        );
        assert!(matches!(
            switch_error(core_alias(&fx.paths, "b@x.com", "123")),
            SwitchError::InvalidAlias { .. }
        ));
        assert_eq!(fx.registry_bytes(), before);

        // Re-applying the same alias to its owner is fine.
        core_alias(&fx.paths, "work", "work").unwrap();
    }

    #[test]
    fn unalias_matches_alias_values_only() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        core_alias(&fx.paths, "a@x.com", "work").unwrap();

        assert_eq!(
            switch_error(core_unalias(&fx.paths, "a@x.com")),
            SwitchError::AliasNotFound("a@x.com".into())
        );
        assert_eq!(core_unalias(&fx.paths, "work").unwrap(), 1);
        assert_eq!(fx.registry().get(1).unwrap().alias, None);
        assert_eq!(fx.registry().resolve("work"), None);
    }

    #[test]
    fn numbers_are_not_reused_after_removal() {
        let fx = Fixture::new();
        for (email, creds) in [("a@x.com", "C1"), ("b@x.com", "C2"), ("c@x.com", "C3")] {
            fx.login(email, creds);
            fx.add();
        }

        core_remove(&fx.paths, &fx.backend, 2).unwrap();
        fx.login("d@x.com", "C4");
        assert_eq!(
            fx.add(),
            AddOutcome::Added {
                num: 4,
                email: "d@x.com".into()
            }
        );
        assert_eq!(fx.registry().sequence, vec![1, 3, 4]);
    }

    #[test]
    fn removing_the_newest_account_does_not_free_its_number() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        fx.login("b@x.com", "C2");
        fx.add();

        core_remove(&fx.paths, &fx.backend, 2).unwrap();
        fx.login("c@x.com", "C3");
        assert_eq!(
            fx.add(),
            AddOutcome::Added {
                num: 3,
                email: "c@x.com".into()
            }
        );
        assert_eq!(fx.registry().sequence, vec![1, 3]);
        assert!(!fx.backend.has_account(2, "c@x.com"));
    }

    #[test]
    fn removing_the_active_account_deletes_its_backups_and_clears_the_pointer() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        fx.login("b@x.com", "C2");
        fx.add();

        let removed = core_remove(&fx.paths, &fx.backend, 2).unwrap();
        assert_eq!(removed.email, "b@x.com");
        assert!(!fx.backend.has_account(2, "b@x.com"));
        assert!(!fx.paths.config_backup_path(2, "b@x.com").exists());

        let seq = fx.registry();
        assert_eq!(seq.active_account_number, None);
        assert_eq!(seq.sequence, vec![1]);
        assert!(seq.get(2).is_none());
    }

    #[test]
    fn declining_the_removal_prompt_changes_nothing() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        core_alias(&fx.paths, "1", "work").unwrap();
        let before = fx.registry_bytes();

        remove_with(&fx.ctx(), "work", false, &mut Cursor::new("n\n")).unwrap();
        assert_eq!(fx.registry_bytes(), before);
        assert!(fx.backend.has_account(1, "a@x.com"));
    }

    #[test]
    fn only_y_confirms() {
        let cases = [
            ("y\n", true),
            ("Y\n", true),
            ("n\n", false),
            ("\n", false),
            ("yes\n", false),
            ("", false),
        ];
        for (answer, expected) in cases {
            assert_eq!(confirm(&mut Cursor::new(answer)).unwrap(), expected, "{answer:?}");
        }
    }

    #[test]
    fn list_follows_sequence_and_marks_the_live_account() {
        let fx = Fixture::new();
        fx.login("a@x.com", "C1");
        fx.add();
        fx.login("b@x.com", "C2");
        fx.add();
        core_alias(&fx.paths, "1", "work").unwrap();
        fx.switch("work").unwrap();

        let rows = core_list(&fx.paths).unwrap();
        assert_eq!(
            rows,
            vec![
                AccountRow {
                    num: 1,
                    email: "a@x.com".into(),
                    alias: Some("work".into()),
                    active: true
                },
                AccountRow {
                    num: 2,
                    email: "b@x.com".into(),
                    alias: None,
                    active: false
                },
            ]
        );
    }
}
