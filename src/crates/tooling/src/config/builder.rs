//! Configuration builder trait
//!
//! Settings structures implement this to get a uniform way of combining
//! defaults, environment variables and explicit overrides, with a single
//! validation step at the end.

use crate::Result;

/// Trait for settings structures that support layering and validation
///
/// Layering order used by the helpers is: environment first, then
/// [`merge`](ConfigBuilder::merge) fills whatever the environment left unset
/// from another source (usually the defaults).
pub trait ConfigBuilder: Default + Clone {
    /// Validate the configuration
    ///
    /// Returns an error if a value is out of range or two values conflict.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Load configuration from environment variables named `{PREFIX}{FIELD}`
    fn from_env(prefix: &str) -> Result<Self>;

    /// Merge another configuration into this one
    ///
    /// Fields already set on `self` win; unset fields are taken from `other`.
    fn merge(&mut self, other: Self) -> &mut Self;

    /// Defaults only, validated
    fn build() -> Result<Self> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Load from environment, fill the gaps from defaults, validate
    fn from_env_with_defaults(prefix: &str) -> Result<Self> {
        let mut config = Self::from_env(prefix)?;
        config.merge(Self::default());
        config.validate()?;
        Ok(config)
    }
}
