//! Host detection — seeds presence variables from `/etc/issue`.
//!
//! Flags are only ever added: a host that matches nothing gets no variables.
//! Runs once, before parsing.

use super::types::VarStore;
use std::path::Path;

/// Default location of the distribution banner.
pub const ISSUE_PATH: &str = "/etc/issue";

/// A known release banner and the variables it implies.
struct Release {
    banner: &'static str,
    distro: &'static str,
    /// Version key suffix, e.g. `12` in `os.debian.12`
    tag: &'static str,
    version: &'static str,
}

const RELEASES: &[Release] = &[
    Release { banner: "Debian GNU/Linux 11", distro: "debian", tag: "11", version: "11" },
    Release { banner: "Debian GNU/Linux 12", distro: "debian", tag: "12", version: "12" },
    Release { banner: "Debian GNU/Linux 13", distro: "debian", tag: "13", version: "13" },
    Release { banner: "Ubuntu 20.04", distro: "ubuntu", tag: "2004", version: "20.04" },
    Release { banner: "Ubuntu 20.10", distro: "ubuntu", tag: "2010", version: "20.10" },
    Release { banner: "Ubuntu 21.04", distro: "ubuntu", tag: "2104", version: "21.04" },
    Release { banner: "Ubuntu 21.10", distro: "ubuntu", tag: "2110", version: "21.10" },
    Release { banner: "Ubuntu 22.04", distro: "ubuntu", tag: "2204", version: "22.04" },
    Release { banner: "Ubuntu 22.10", distro: "ubuntu", tag: "2210", version: "22.10" },
    Release { banner: "Ubuntu 24.04", distro: "ubuntu", tag: "2404", version: "24.04" },
];

/// Variables implied by an issue banner, in table order.
pub fn scan_issue(issue: &str) -> Vec<(String, String)> {
    let mut found = Vec::new();
    for release in RELEASES.iter().filter(|r| issue.contains(r.banner)) {
        // Every supported distro here uses apt
        found.push(("pkgs.apt".to_string(), "1".to_string()));
        found.push((format!("os.{}", release.distro), "1".to_string()));
        found.push((format!("os.{}.{}", release.distro, release.tag), "1".to_string()));
        found.push((
            format!("os.{}.version", release.distro),
            release.version.to_string(),
        ));
    }
    found
}

/// Seed `vars` from the banner at `issue_path`. A missing or unreadable file
/// seeds nothing. Returns the number of variables written.
pub fn seed_from_issue(vars: &mut VarStore, issue_path: &Path) -> usize {
    let issue = match std::fs::read_to_string(issue_path) {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!("skipping host scan, cannot read {}: {}", issue_path.display(), e);
            return 0;
        }
    };
    let found = scan_issue(&issue);
    for (key, value) in &found {
        tracing::debug!("host scan: {}={}", key, value);
        vars.set(key.as_str(), value.as_str());
    }
    found.len()
}
