// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration files and environment variables.
//!
//! These sources sit below command line flags: [ConfigBuilder] merges them
//! into a [ConfigLayer] which the resolver consults for any option not given
//! on the command line.

use {
    crate::{error::PilotError, options::OptionKey},
    figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    },
    log::debug,
    serde_json::Value,
    std::{collections::BTreeMap, path::Path},
};

/// Prefix of environment variables holding option values.
pub const ENV_PREFIX: &str = "PILOT_";

/// Name of configuration files, both in the user config directory and cwd.
pub const CONFIG_FILE_NAME: &str = "rpilot.toml";

/// Option values obtained from configuration files and the environment.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigLayer {
    values: BTreeMap<String, Value>,
}

impl ConfigLayer {
    pub fn get(&self, key: OptionKey) -> Option<&Value> {
        self.values.get(key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Used to instantiate [ConfigLayer] instances.
#[derive(Clone)]
pub struct ConfigBuilder {
    loader: Figment,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            loader: Figment::new(),
        }
    }
}

impl ConfigBuilder {
    /// Add the $XDG_CONFIG/rpilot/rpilot.toml user config file if it exists.
    pub fn with_user_config_file(mut self) -> Self {
        if let Some(base) = dirs::config_dir() {
            let p = base.join("rpilot").join(CONFIG_FILE_NAME);
            debug!("registering user config file: {}", p.display());

            self.loader = self.loader.merge(Toml::file(p).nested());
        }

        self
    }

    /// Merge a config file from `pwd`/rpilot.toml.
    pub fn with_cwd_config_file(mut self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            let p = cwd.join(CONFIG_FILE_NAME);
            debug!("registering cwd config file: {}", p.display());

            self.loader = self.loader.merge(Toml::file(p).nested());
        }

        self
    }

    /// Merge with `PILOT_` environment variables.
    ///
    /// Must be called after [Self::profile()] so the variables override the
    /// selected profile.
    pub fn with_env_prefix(self) -> Self {
        debug!("registering {ENV_PREFIX} environment variable config source");
        self.with_env_vars(std::env::vars())
    }

    /// Merge `PILOT_` prefixed variables from an explicit environment.
    ///
    /// Values are kept as the strings they were given as. Variables without
    /// the prefix or with an empty value are ignored.
    pub fn with_env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let key = name.as_ref().strip_prefix(ENV_PREFIX)?.to_ascii_lowercase();
                let value = value.into();

                (!key.is_empty() && !value.is_empty()).then_some((key, value))
            })
            .collect::<BTreeMap<_, _>>();

        let profile = self.loader.profile().clone();
        self.loader = self.loader.merge(Serialized::from(values, profile));
        self
    }

    /// Add a TOML config file to this instance.
    pub fn toml_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        debug!("registering custom config file: {}", path.display());
        self.loader = self.loader.merge(Toml::file(path).nested());
        self
    }

    /// Add a TOML string config to this instance.
    pub fn toml_string(mut self, data: &str) -> Self {
        debug!("registering TOML string config data");
        self.loader = self.loader.merge(Toml::string(data).nested());
        self
    }

    /// Load the named profile instead of the `[default]` profile.
    pub fn profile(mut self, profile: String) -> Self {
        self.loader = self.loader.select(profile);
        self
    }

    /// Flatten all registered sources for the selected profile.
    pub fn layer(self) -> Result<ConfigLayer, PilotError> {
        let values = self.loader.extract::<BTreeMap<String, Value>>()?;

        Ok(ConfigLayer { values })
    }
}
