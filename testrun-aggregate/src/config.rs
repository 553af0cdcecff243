// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for testrun-aggregate.

use crate::{
    case::{CauseKind, FailureCause, FailureClass},
    errors::ConfigParseError,
};
use camino::Utf8Path;
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Overall configuration for the result collector.
///
/// Repository-specific configuration is layered on top of [`Self::DEFAULT_CONFIG`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CollectorConfig {
    classification: ClassificationConfig,
}

impl CollectorConfig {
    /// The default location of the config within a repository root.
    pub const CONFIG_PATH: &'static str = ".config/testrun-aggregate.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not specified from
    /// `.config/testrun-aggregate.toml` under `root`.
    ///
    /// A file passed in explicitly must exist. If no file is passed in and `root` doesn't have
    /// the config file, the default config is used.
    pub fn from_sources(
        root: impl AsRef<Utf8Path>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let file = root.as_ref().join(Self::CONFIG_PATH);
                let source = File::new(file.as_str(), FileFormat::Toml).required(false);
                (file, source)
            }
        };

        let config = Self::make_default_config()
            .add_source(source)
            .build()
            .map_err(|err| ConfigParseError::new(&config_file, err))?;

        let mut unknown = BTreeSet::new();
        let this: Self = serde_ignored::deserialize(config, |path: serde_ignored::Path| {
            unknown.insert(path.to_string());
        })
        .map_err(|err| ConfigParseError::new(&config_file, err))?;

        if !unknown.is_empty() {
            warn!(
                config_file = %config_file,
                "ignoring unknown configuration keys: {}",
                unknown.iter().join(", "),
            );
        }

        Ok(this)
    }

    /// Returns the default config.
    pub fn default_config() -> Self {
        let config = Self::make_default_config()
            .build()
            .expect("default config is always valid");
        config
            .try_deserialize()
            .expect("default config is always valid")
    }

    /// Returns the failure classification settings.
    pub fn classification(&self) -> &ClassificationConfig {
        &self.classification
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Settings that decide whether a failed test case counts as a failure or as an error.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ClassificationConfig {
    assertion_types: Vec<String>,
}

impl ClassificationConfig {
    /// Creates a new classification config with the given assertion type names.
    pub fn new(assertion_types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            assertion_types: assertion_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the type names that are treated as assertion-style failures.
    pub fn assertion_types(&self) -> &[String] {
        &self.assertion_types
    }

    /// Classifies a failure cause.
    ///
    /// The kind reported by the engine wins. Causes without a kind are failures if their type
    /// name is a configured assertion type, and errors otherwise.
    pub fn classify(&self, cause: &FailureCause) -> FailureClass {
        match cause.kind() {
            CauseKind::Assertion => FailureClass::Failure,
            CauseKind::Other => FailureClass::Error,
            CauseKind::Unclassified => match cause.type_name() {
                Some(type_name) if self.is_assertion_type(type_name) => FailureClass::Failure,
                _ => FailureClass::Error,
            },
        }
    }

    fn is_assertion_type(&self, type_name: &str) -> bool {
        let simple_name = type_name.rsplit(['.', ':']).next().unwrap_or(type_name);
        self.assertion_types
            .iter()
            .any(|known| known == type_name || known == simple_name)
    }
}
