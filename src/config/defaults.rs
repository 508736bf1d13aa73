//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

pub fn r#true() -> bool {
    true
}

// ============================================================================
// [blog] Section Defaults
// ============================================================================

pub mod blog {
    pub fn language() -> String {
        "en".into()
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn source() -> PathBuf {
        "src".into()
    }

    pub fn output() -> PathBuf {
        "dist".into()
    }

    /// `0` means one worker per available CPU.
    pub fn workers() -> usize {
        0
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        8080
    }
}
