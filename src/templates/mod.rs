//! Embedded templates for codesmith files.

/// Default `codesmith.toml` configuration.
pub(crate) const CODESMITH_TOML: &str = include_str!("codesmith.toml");
