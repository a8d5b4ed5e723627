//! Optional plan-usage lookup for `status --usage`. Every failure here is
//! swallowed: no token, no network, unexpected payload all mean "no report".

use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const USAGE_URL: &str = "https://api.anthropic.com/api/oauth/usage";
const OAUTH_BETA: &str = "oauth-2025-04-20";
const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Window {
    pub utilization: f64,
    #[serde(default)]
    pub resets_at: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UsageReport {
    #[serde(default)]
    pub five_hour: Option<Window>,
    #[serde(default)]
    pub seven_day: Option<Window>,
}

impl UsageReport {
    pub fn windows(&self) -> Vec<(&'static str, &Window)> {
        [("5-hour", &self.five_hour), ("7-day", &self.seven_day)]
            .into_iter()
            .filter_map(|(label, w)| w.as_ref().map(|w| (label, w)))
            .collect()
    }
}

/// The OAuth access token inside Claude Code's credentials blob.
fn access_token(credentials: &str) -> Option<String> {
    let v: Value = serde_json::from_str(credentials).ok()?;
    v.get("claudeAiOauth")?
        .get("accessToken")?
        .as_str()
        .filter(|t| !t.is_empty())
        .map(String::from)
}

pub fn fetch(credentials: &str) -> Option<UsageReport> {
    let token = access_token(credentials)?;
    let agent = ureq::AgentBuilder::new().timeout(TIMEOUT).build();

    let response = agent
        .get(USAGE_URL)
        .set("Authorization", &format!("Bearer {token}"))
        .set("anthropic-beta", OAUTH_BETA)
        .call()
        .map_err(|e| debug!("usage fetch failed: {e}"))
        .ok()?;

    response
        .into_json::<UsageReport>()
        .map_err(|e| debug!("usage payload not understood: {e}"))
        .ok()
}
