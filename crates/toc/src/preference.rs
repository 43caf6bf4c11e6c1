//! User preferences, supplied by the host at session creation

use std::collections::BTreeMap;

use dom::Selector;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::Result;
use crate::placement::Offset;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoLoad {
    /// Wait for the first command
    #[default]
    Manual,
    /// Start as soon as the controller is created
    OnLoad,
}

/// Preference object. Unknown keys are ignored, missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preference {
    pub offset: Offset,
    pub remember_position: bool,
    pub show_tip: bool,
    pub auto_load: AutoLoad,
    /// Host name (or parent domain) → article selector
    pub site_selectors: BTreeMap<String, String>,
}

impl Default for Preference {
    fn default() -> Self {
        let site_selectors = [("inoreader.com", ".article_content"), ("feedly.com", ".entryBody")]
            .into_iter()
            .map(|(site, selector)| (site.to_string(), selector.to_string()))
            .collect();
        Self {
            offset: Offset::default(),
            remember_position: true,
            show_tip: true,
            auto_load: AutoLoad::Manual,
            site_selectors,
        }
    }
}

impl Preference {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Offset a new session starts from
    pub fn initial_offset(&self) -> Offset {
        if self.remember_position {
            self.offset
        } else {
            Offset::default()
        }
    }

    /// Article selector configured for `url`'s host, if any
    pub fn selector_for(&self, url: &Url) -> Option<Selector> {
        let host = url.host_str()?.to_ascii_lowercase();
        let (site, selector) = self.site_selectors.iter().find(|(site, _)| {
            let site = site.to_ascii_lowercase();
            host == site || host.ends_with(&format!(".{site}"))
        })?;
        match Selector::parse(selector) {
            Ok(selector) => Some(selector),
            Err(error) => {
                warn!(%site, %selector, %error, "ignoring invalid site selector");
                None
            }
        }
    }
}
