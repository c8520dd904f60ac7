//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

// ============================================================================
// [site] Section Defaults
// ============================================================================

pub mod site {
    pub fn language() -> String {
        "en".into()
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn content() -> PathBuf {
        "content".into()
    }

    pub fn output() -> PathBuf {
        "public".into()
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
        5277
    }
}

// ============================================================================
// [insights] Section Defaults
// ============================================================================

pub mod insights {
    pub fn debounce_ms() -> u64 {
        1500
    }

    pub fn user_agent() -> String {
        concat!("docsite/", env!("CARGO_PKG_VERSION")).into()
    }
}

// ============================================================================
// [images] Section Defaults
// ============================================================================

pub mod images {
    pub fn timeout_ms() -> u64 {
        10_000
    }
}

// ============================================================================
// [customization] Section Defaults
// ============================================================================

pub mod customization {
    use super::super::{FontChoice, ThemedValue};

    pub fn primary_color() -> ThemedValue {
        ThemedValue::same("#346ddb")
    }

    pub fn font() -> FontChoice {
        FontChoice::Default("Inter".into())
    }
}
