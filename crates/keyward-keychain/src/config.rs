//! Keychain configuration.
//!
//! [`KeychainConfig`] holds the default attributes an application scopes all
//! of its items to: a service name, an access group and a sync preference.
//! Defaults are applied underneath the caller's attributes, so an explicit
//! attribute on a call always wins. The reserved keys (class and payload) are
//! set by the layer after both and cannot be configured.

use serde::{Deserialize, Serialize};

use crate::attributes::{AttrKey, AttributeSet};
use crate::kind::ItemKind;

/// Environment variable holding the default service name.
pub const ENV_SERVICE: &str = "KEYWARD_SERVICE";
/// Environment variable holding the default access group.
pub const ENV_ACCESS_GROUP: &str = "KEYWARD_ACCESS_GROUP";
/// Environment variable holding the default sync preference (`true`/`false`).
pub const ENV_SYNCHRONIZABLE: &str = "KEYWARD_SYNCHRONIZABLE";

/// Errors raised while loading a [`KeychainConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid keychain config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment variable held a value of the wrong type.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Default attributes applied to every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeychainConfig {
    /// Service name applied to generic-password items.
    ///
    /// Default: **none**.
    pub service: Option<String>,

    /// Access group applied to every item.
    ///
    /// Default: **none** (the vault picks the application's default group).
    pub access_group: Option<String>,

    /// Sync preference applied to every item.
    ///
    /// Default: **none** (the vault's own default, not synchronized).
    pub synchronizable: Option<bool>,
}

impl KeychainConfig {
    /// Create a configuration with no defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default service name.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the default access group.
    pub fn with_access_group(mut self, group: impl Into<String>) -> Self {
        self.access_group = Some(group.into());
        self
    }

    /// Set the default sync preference.
    pub fn with_synchronizable(mut self, synchronizable: bool) -> Self {
        self.synchronizable = Some(synchronizable);
        self
    }

    /// Parse a configuration from a TOML document.
    ///
    /// ```
    /// # use keyward_keychain::KeychainConfig;
    /// let cfg = KeychainConfig::from_toml_str(r#"service = "com.example.app""#).unwrap();
    /// assert_eq!(cfg.service.as_deref(), Some("com.example.app"));
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read the configuration from `KEYWARD_*` environment variables.
    /// Unset or empty variables leave the corresponding default unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let synchronizable = match read(ENV_SYNCHRONIZABLE) {
            Some(value) => Some(value.trim().parse::<bool>().map_err(|_| {
                ConfigError::InvalidEnv {
                    var: ENV_SYNCHRONIZABLE,
                    value: value.clone(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            service: read(ENV_SERVICE),
            access_group: read(ENV_ACCESS_GROUP),
            synchronizable,
        })
    }

    /// The configured defaults that are legal for `kind`.
    pub fn defaults_for(&self, kind: ItemKind) -> AttributeSet {
        let mut defaults = AttributeSet::new();
        if let Some(service) = &self.service {
            if kind.accepts(AttrKey::Service) {
                defaults.insert(AttrKey::Service, service.as_str());
            }
        }
        if let Some(group) = &self.access_group {
            defaults.insert(AttrKey::AccessGroup, group.as_str());
        }
        if let Some(sync) = self.synchronizable {
            defaults.insert(AttrKey::Synchronizable, sync);
        }
        defaults
    }

    /// Layer the caller's `attributes` over the defaults for `kind`.
    pub fn scope(&self, kind: ItemKind, attributes: Option<&AttributeSet>) -> AttributeSet {
        let mut scoped = self.defaults_for(kind);
        if let Some(attributes) = attributes {
            scoped.extend(attributes.iter().map(|(key, value)| (key, value.clone())));
        }
        scoped
    }
}
