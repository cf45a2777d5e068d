//! Release directory model
//!
//! ```text
//! <targetBasePath>/<appName>/
//!   releases/<releaseName>/
//!   current -> releases/<releaseName>
//! ```
//!
//! Switching releases repoints `current` with `ln -snf`; release
//! directories are never copied. Listings are taken per host since hosts
//! may hold different release sets.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

use tracing::debug;

use crate::config::ResolvedConfig;
use crate::errors::BeamError;
use crate::remote::Session;
use crate::utils::shell_quote;

/// Keep real release names from a raw directory listing, oldest first
pub fn release_entries(entries: Vec<String>) -> Vec<String> {
    let mut releases: Vec<String> = entries
        .into_iter()
        .map(|entry| entry.trim_end_matches('/').to_string())
        .filter(|entry| !entry.is_empty() && entry != "." && entry != "..")
        .collect();
    releases.sort_by(|a, b| natural_cmp(a, b));
    releases.dedup();
    releases
}

/// Compare names with digit runs taken as numbers, so `1.0.10` follows `1.0.9`
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = digit_run(&mut a);
                let right = digit_run(&mut b);
                let (l, r) = (left.trim_start_matches('0'), right.trim_start_matches('0'));
                let order = l
                    .len()
                    .cmp(&r.len())
                    .then_with(|| l.cmp(r))
                    .then_with(|| left.len().cmp(&right.len()));
                if order != Ordering::Equal {
                    return order;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn digit_run(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

/// List the releases present on the session's host
pub async fn list_releases(
    session: &mut Session,
    config: &ResolvedConfig,
) -> Result<Vec<String>, BeamError> {
    let entries = session.list_directory(&config.releases_path()).await?;
    let releases = release_entries(entries);
    debug!("Releases on {}: {:?}", session.host(), releases);
    Ok(releases)
}

/// Command pointing `current` at a release directory
pub fn link_command(release_path: &str, current_link_path: &str) -> String {
    format!(
        "ln -snf {} {}",
        shell_quote(release_path),
        shell_quote(current_link_path)
    )
}

/// Command deleting one release directory
pub fn remove_release_command(config: &ResolvedConfig, release: &str) -> String {
    format!("rm -Rf {}", shell_quote(&config.release_path(release)))
}

/// The last rollback target picked in this run
///
/// Carried from host to host so the next rollback prompt can pre-select
/// the same release.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackMemory {
    last: Option<String>,
}

impl RollbackMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    pub fn remember(&mut self, release: impl Into<String>) {
        self.last = Some(release.into());
    }

    /// Index to pre-select: the remembered release when present on this
    /// host, otherwise the newest entry
    pub fn default_index(&self, releases: &[String]) -> Option<usize> {
        if releases.is_empty() {
            return None;
        }
        self.last
            .as_deref()
            .and_then(|last| releases.iter().position(|r| r == last))
            .or(Some(releases.len() - 1))
    }
}
