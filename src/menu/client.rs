use anyhow::Context;
use serde_json::Value;

use crate::menu::MenuEntry;

/// Where a user's menu entries come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSource {
    pub endpoint: String,
    pub user_id: String,
}

impl MenuSource {
    pub fn new(endpoint: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_id: user_id.into(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), self.user_id)
    }

    /// Blocking fetch through `agent`. Runs inside loader jobs, never on the
    /// frame thread.
    pub fn fetch(&self, agent: &ureq::Agent) -> anyhow::Result<Vec<MenuEntry>> {
        let url = self.url();
        log::info!("Fetching menu from {url}");

        let body = agent
            .get(&url)
            .call()
            .with_context(|| format!("Failed to request menu from {url}"))?
            .into_body()
            .read_to_string()
            .with_context(|| format!("Failed to read menu response from {url}"))?;

        parse_entries(&body).with_context(|| format!("Invalid menu content from {url}"))
    }
}

/// Entries of a menu response. Malformed entries are skipped, so only a
/// body that is not a JSON array fails.
pub fn parse_entries(body: &str) -> anyhow::Result<Vec<MenuEntry>> {
    let values: Vec<Value> = serde_json::from_str(body)?;

    Ok(values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping menu entry {index}: {err}");
                None
            }
        })
        .collect())
}
