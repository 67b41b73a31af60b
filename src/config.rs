// In: src/config.rs

//! The single source of truth for all writer configuration.
//!
//! This module defines the unified `WriterConfig` struct, which is designed
//! to be created once at the application boundary (e.g. from a user's YAML
//! file) and then passed down through the system by value. Threading the
//! configuration through the call graph, rather than toggling process-wide
//! state, is what makes the high-compatibility mode scoped and re-entrant.

use serde::{Deserialize, Serialize};

use crate::error::DlisError;

/// Hard bounds on the visible record length imposed by the standard.
pub const MIN_VISIBLE_RECORD_LENGTH: u32 = 20;
pub const MAX_VISIBLE_RECORD_LENGTH: u32 = 16384;

/// Strictness level applied by the pre-write validation pass.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompatLevel {
    /// Enforce the standard's hard rules; report soft issues as warnings.
    #[default]
    Standard,

    /// High-compatibility mode: a fixed list of warnings (unknown units,
    /// lowercase names, non-uniform index spacing, non-standard index
    /// types) becomes fatal, and origins are auto-assigned consecutive
    /// file set numbers. Intended for files that must open in the most
    /// restrictive commercial viewers.
    High,
}

/// The unified configuration for one write operation.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct WriterConfig {
    /// Maximum length of each visible record, in bytes. Even, 20..=16384.
    #[serde(default = "default_max_record_length")]
    pub max_record_length: u32,

    /// Number of source rows materialized per input chunk. Peak memory is
    /// roughly this times the summed channel row widths.
    #[serde(default = "default_input_chunk_size")]
    pub input_chunk_size: usize,

    /// Number of output bytes accumulated before the sink is invoked.
    #[serde(default = "default_output_chunk_size")]
    pub output_chunk_size: usize,

    /// Validation strictness.
    #[serde(default)]
    pub compat: CompatLevel,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_record_length: default_max_record_length(),
            input_chunk_size: default_input_chunk_size(),
            output_chunk_size: default_output_chunk_size(),
            compat: CompatLevel::default(),
        }
    }
}

impl WriterConfig {
    /// A default configuration with high-compatibility validation.
    pub fn high_compatibility() -> Self {
        Self {
            compat: CompatLevel::High,
            ..Self::default()
        }
    }

    pub fn is_high_compat(&self) -> bool {
        self.compat == CompatLevel::High
    }

    /// Check the field values against their hard bounds.
    pub fn validate(&self) -> Result<(), DlisError> {
        let vrl = self.max_record_length;
        if !(MIN_VISIBLE_RECORD_LENGTH..=MAX_VISIBLE_RECORD_LENGTH).contains(&vrl) {
            return Err(DlisError::Config(format!(
                "visible record length must be within {MIN_VISIBLE_RECORD_LENGTH}..={MAX_VISIBLE_RECORD_LENGTH}; got {vrl}"
            )));
        }
        if vrl % 2 != 0 {
            return Err(DlisError::Config(format!(
                "visible record length must be an even number; got {vrl}"
            )));
        }
        if self.input_chunk_size == 0 {
            return Err(DlisError::Config(
                "input chunk size must be at least one row".into(),
            ));
        }
        if self.output_chunk_size < MIN_VISIBLE_RECORD_LENGTH as usize {
            return Err(DlisError::Config(format!(
                "output chunk size must be at least {MIN_VISIBLE_RECORD_LENGTH} bytes; got {}",
                self.output_chunk_size
            )));
        }
        Ok(())
    }
}

fn default_max_record_length() -> u32 {
    8192
}

fn default_input_chunk_size() -> usize {
    65536
}

fn default_output_chunk_size() -> usize {
    1 << 20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        WriterConfig::default().validate().unwrap();
    }

    #[test]
    fn record_length_bounds_are_enforced() {
        let mut cfg = WriterConfig::default();
        cfg.max_record_length = 18;
        assert!(cfg.validate().is_err());
        cfg.max_record_length = 16386;
        assert!(cfg.validate().is_err());
        cfg.max_record_length = 8191;
        assert!(cfg.validate().is_err(), "odd lengths are rejected");
        cfg.max_record_length = 20;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn chunk_sizes_have_minimums() {
        let mut cfg = WriterConfig::default();
        cfg.input_chunk_size = 0;
        assert!(cfg.validate().is_err());
        cfg = WriterConfig::default();
        cfg.output_chunk_size = 19;
        assert!(cfg.validate().is_err());
        cfg.output_chunk_size = 20;
        assert!(cfg.validate().is_ok());
    }
}
