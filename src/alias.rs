use crate::error::SwitchError;

/// Check that `alias` can never be confused with an account number or an
/// email. Uniqueness is the caller's job.
pub fn validate(alias: &str) -> Result<(), SwitchError> {
    let reject = |reason| {
        Err(SwitchError::InvalidAlias {
            alias: alias.to_string(),
            reason,
        })
    };

    // Email shape first: the charset rule rejects it too, but this reason is
    // the one that tells the user what went wrong.
    if looks_like_email(alias) {
        return reject("it would be mistaken for an email address");
    }
    if alias.is_empty()
        || !alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return reject("only letters, digits, '_' and '-' are allowed");
    }
    if alias.chars().all(|c| c.is_ascii_digit()) {
        return reject("it would be mistaken for an account number");
    }
    Ok(())
}

/// `local@domain.tld` with no whitespace and a single `@`.
pub fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || s.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
