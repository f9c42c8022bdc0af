/*!
 * Per-site enablement policy.
 *
 * In default-enabled mode every site is on except the ones in
 * `disabled_sites`; in default-disabled mode only the sites in
 * `enabled_sites` are on. Toggling a site edits whichever list the current
 * mode consults.
 */

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitePolicy {
    pub default_enabled: bool,
    #[serde(default)]
    pub disabled_sites: Vec<String>,
    #[serde(default)]
    pub enabled_sites: Vec<String>,
}

impl Default for SitePolicy {
    fn default() -> Self {
        Self {
            default_enabled: true,
            disabled_sites: Vec::new(),
            enabled_sites: Vec::new(),
        }
    }
}

impl SitePolicy {
    /// Effective enablement for `hostname`
    pub fn is_enabled_for(&self, hostname: &str) -> bool {
        let hostname = normalize_host(hostname);
        if self.default_enabled {
            !self.disabled_sites.iter().any(|site| normalize_host(site) == hostname)
        } else {
            self.enabled_sites.iter().any(|site| normalize_host(site) == hostname)
        }
    }

    /// Turn `hostname` on or off under the current default mode
    pub fn set_site_enabled(&mut self, hostname: &str, enabled: bool) {
        let hostname = normalize_host(hostname);
        if hostname.is_empty() {
            return;
        }
        let (list, add) = if self.default_enabled {
            (&mut self.disabled_sites, !enabled)
        } else {
            (&mut self.enabled_sites, enabled)
        };

        if add {
            if !list.iter().any(|site| normalize_host(site) == hostname) {
                list.push(hostname);
            }
        } else {
            list.retain(|site| normalize_host(site) != hostname);
        }
    }

    /// Sites that behave differently from the default mode
    pub fn exceptions(&self) -> &[String] {
        if self.default_enabled {
            &self.disabled_sites
        } else {
            &self.enabled_sites
        }
    }
}

/// Hostnames compare case-insensitively and without a trailing dot
pub fn normalize_host(hostname: &str) -> String {
    hostname.trim().trim_end_matches('.').to_ascii_lowercase()
}
