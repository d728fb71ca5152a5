//! Configuration management utilities
//!
//! - `ConfigBuilder` trait for layered settings (defaults, environment, overrides)
//! - Environment variable loading with proper error handling
//!
//! # Example
//!
//! ```rust,ignore
//! use tooling::config::{build_env_key, get_env, get_env_bool, ConfigBuilder};
//!
//! #[derive(Clone, Default)]
//! struct RouterSettings {
//!     pub node_name: String,
//!     pub continue_on_fail: bool,
//! }
//!
//! impl ConfigBuilder for RouterSettings {
//!     fn from_env(prefix: &str) -> tooling::Result<Self> {
//!         Ok(Self {
//!             node_name: get_env(&build_env_key(prefix, "node_name"))?.unwrap_or_default(),
//!             continue_on_fail: get_env_bool(&build_env_key(prefix, "continue_on_fail"))?
//!                 .unwrap_or(false),
//!         })
//!     }
//!
//!     fn merge(&mut self, other: Self) -> &mut Self {
//!         if !other.node_name.is_empty() {
//!             self.node_name = other.node_name;
//!         }
//!         self.continue_on_fail |= other.continue_on_fail;
//!         self
//!     }
//! }
//!
//! let settings = RouterSettings::from_env_with_defaults("DYNSWITCH_")?;
//! ```

mod builder;
mod env;

pub use builder::ConfigBuilder;
pub use env::{build_env_key, get_env, get_env_bool, get_env_parse};
