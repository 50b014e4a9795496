//! One-time hardware capability probe.

use std::sync::OnceLock;

/// Hardware features relevant to hash backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// AES round instructions (`AES-NI` on x86_64, the ARMv8 crypto extension on aarch64).
    pub aes: bool,
}

impl Capabilities {
    /// Returns the capabilities of the current host, probed once per process.
    pub fn get() -> &'static Capabilities {
        static CAPABILITIES: OnceLock<Capabilities> = OnceLock::new();
        CAPABILITIES.get_or_init(Capabilities::detect)
    }

    /// Probes the host. Prefer [`Capabilities::get`], which caches the result.
    pub fn detect() -> Capabilities {
        Capabilities { aes: detect_aes() }
    }
}

#[cfg(target_arch = "x86_64")]
fn detect_aes() -> bool {
    std::arch::is_x86_feature_detected!("aes")
}

#[cfg(target_arch = "aarch64")]
fn detect_aes() -> bool {
    std::arch::is_aarch64_feature_detected!("aes")
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_aes() -> bool {
    false
}
