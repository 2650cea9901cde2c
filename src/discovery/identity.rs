//! Host identity resolution.
//!
//! The identity is a stable string derived from a network interface's
//! hardware address. It names the service in announcements and is passed
//! to every connection handler.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving the host identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No interface exposes a usable hardware address.
    #[error("no network interface with a hardware address")]
    NoHardwareAddress,

    /// Enumerating interfaces failed.
    #[error("failed to enumerate network interfaces: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of the host identity.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self) -> Result<String, IdentityError>;
}

/// A fixed identity, useful for tests and for hosts without stable hardware.
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub String);

impl IdentityResolver for StaticIdentity {
    fn resolve(&self) -> Result<String, IdentityError> {
        Ok(self.0.clone())
    }
}

/// Reads hardware addresses from sysfs (`/sys/class/net/<iface>/address`).
///
/// Interfaces are visited in name order and the last one with a non-zero
/// address wins.
#[derive(Debug, Clone)]
pub struct InterfaceIdentityResolver {
    root: PathBuf,
}

impl InterfaceIdentityResolver {
    pub fn new() -> Self {
        Self::with_root("/sys/class/net")
    }

    /// Use a different directory laid out like `/sys/class/net`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for InterfaceIdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityResolver for InterfaceIdentityResolver {
    fn resolve(&self) -> Result<String, IdentityError> {
        let mut interfaces: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        interfaces.sort();

        let mut found = None;
        for iface in interfaces {
            let Ok(raw) = fs::read_to_string(iface.join("address")) else {
                continue;
            };
            tracing::trace!(interface = %iface.display(), address = raw.trim(), "network interface");
            if let Some(hex) = hardware_hex(&raw) {
                found = Some(hex);
            }
        }

        found.ok_or(IdentityError::NoHardwareAddress)
    }
}

/// Render `aa:bb:cc:dd:ee:ff` as `aabbccddeeff`.
///
/// Returns `None` for empty, malformed or all-zero addresses.
pub fn hardware_hex(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let mut hex = String::with_capacity(raw.len());
    for octet in raw.split([':', '-']) {
        if octet.len() != 2 || !octet.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        hex.push_str(&octet.to_ascii_lowercase());
    }

    if hex.chars().all(|c| c == '0') {
        return None;
    }
    Some(hex)
}
