//! Hash backend abstraction and the process-wide backend selection.

use std::sync::OnceLock;

use crate::aes;

/// Name of the environment variable that overrides backend selection.
pub const HASH_BACKEND_ENV: &str = "COLIDX_HASH_BACKEND";

/// A fingerprint implementation.
///
/// All implementations compute the schedule documented in [`crate::aes`] and must
/// return identical results for identical inputs; they differ only in speed.
pub(crate) trait HashBackend: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn hash32(&self, value: u32, seed: u64) -> u64;

    fn hash64(&self, value: u64, seed: u64) -> u64;

    fn hash128(&self, value: u128, seed: u64) -> u64;

    fn multi_hash32(&self, values: &[u32], seed: u64, hashes: &mut [u64]) {
        for (hash, &value) in hashes.iter_mut().zip(values) {
            *hash = self.hash32(value, seed);
        }
    }

    fn multi_hash64(&self, values: &[u64], seed: u64, hashes: &mut [u64]) {
        for (hash, &value) in hashes.iter_mut().zip(values) {
            *hash = self.hash64(value, seed);
        }
    }

    fn multi_hash128(&self, values: &[u128], seed: u64, hashes: &mut [u64]) {
        for (hash, &value) in hashes.iter_mut().zip(values) {
            *hash = self.hash128(value, seed);
        }
    }
}

/// Software AES backend. Always available; serves as the reference for every
/// hardware backend.
pub(crate) struct PortableBackend;

impl HashBackend for PortableBackend {
    fn name(&self) -> &'static str {
        "portable"
    }

    #[inline]
    fn hash32(&self, value: u32, seed: u64) -> u64 {
        aes::hash_small(value as u64, seed)
    }

    #[inline]
    fn hash64(&self, value: u64, seed: u64) -> u64 {
        aes::hash_small(value, seed)
    }

    #[inline]
    fn hash128(&self, value: u128, seed: u64) -> u64 {
        aes::hash_wide(value, seed)
    }
}

static PORTABLE: PortableBackend = PortableBackend;

/// Backend selection policy, read from [`HASH_BACKEND_ENV`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Use the fastest backend supported by the host.
    #[default]
    Auto,
    /// Always use the software backend.
    Portable,
}

impl BackendPreference {
    /// Parses a preference value. Matching is case-insensitive and ignores surrounding
    /// whitespace; an empty value means `Auto`.
    pub fn parse(value: &str) -> Option<BackendPreference> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Some(BackendPreference::Auto),
            "portable" | "software" => Some(BackendPreference::Portable),
            _ => None,
        }
    }

    pub fn from_env() -> BackendPreference {
        match std::env::var(HASH_BACKEND_ENV) {
            Ok(value) => BackendPreference::parse(&value).unwrap_or_else(|| {
                log::warn!(
                    "unrecognized {HASH_BACKEND_ENV} value '{value}', falling back to 'auto'"
                );
                BackendPreference::Auto
            }),
            Err(_) => BackendPreference::Auto,
        }
    }
}

/// Returns the backend selected for this process.
#[inline]
pub(crate) fn backend() -> &'static dyn HashBackend {
    static BACKEND: OnceLock<&'static dyn HashBackend> = OnceLock::new();
    *BACKEND.get_or_init(|| select_backend(BackendPreference::from_env()))
}

pub(crate) fn select_backend(preference: BackendPreference) -> &'static dyn HashBackend {
    let backend = match preference {
        BackendPreference::Portable => &PORTABLE as &'static dyn HashBackend,
        BackendPreference::Auto => best_available(),
    };
    log::debug!(
        "selected '{}' hash backend (preference: {preference:?})",
        backend.name()
    );
    backend
}

fn best_available() -> &'static dyn HashBackend {
    #[cfg(target_arch = "x86_64")]
    if let Some(backend) = crate::x86::AesNiBackend::get() {
        return backend;
    }
    #[cfg(target_arch = "aarch64")]
    if let Some(backend) = crate::aarch64::ArmAesBackend::get() {
        return backend;
    }
    &PORTABLE
}

/// Every backend usable on this host, the portable one first.
#[cfg(test)]
pub(crate) fn available_backends() -> Vec<&'static dyn HashBackend> {
    #[allow(unused_mut)]
    let mut backends: Vec<&'static dyn HashBackend> = vec![&PORTABLE];
    #[cfg(target_arch = "x86_64")]
    if let Some(backend) = crate::x86::AesNiBackend::get() {
        backends.push(backend);
    }
    #[cfg(target_arch = "aarch64")]
    if let Some(backend) = crate::aarch64::ArmAesBackend::get() {
        backends.push(backend);
    }
    backends
}
