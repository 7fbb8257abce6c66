// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The `Quarry.toml` registry configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::info;
use quarry_core::{FormatSniffer, PluginDescriptor, Signature};
use serde::Deserialize;

use crate::error::ConfigError;

/// The registry configuration, usually read from `Quarry.toml`.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// The filesystem resolver.
    pub filesystem: FileSystemConfig,
    /// Whether to register the JSON, text and blob loaders.
    pub builtin_loaders: bool,
    /// Extra format registrations.
    pub formats: FormatConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            filesystem: FileSystemConfig::default(),
            builtin_loaders: true,
            formats: FormatConfig::default(),
        }
    }
}

/// Settings for the built-in [`FileSystemResolver`](crate::resolvers::FileSystemResolver).
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FileSystemConfig {
    /// Whether to register the resolver at all.
    pub enabled: bool,
    /// The plugin id of the resolver.
    pub id: String,
    /// The identifier namespace it serves.
    pub namespace: String,
    /// Root directories, searched in order.
    pub roots: Vec<PathBuf>,
    /// Resolvers it must run before.
    pub before: Vec<String>,
    /// Resolvers it must run after.
    pub after: Vec<String>,
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            id: "filesystem".to_string(),
            namespace: "file".to_string(),
            roots: vec![PathBuf::from("assets")],
            before: Vec::new(),
            after: Vec::new(),
        }
    }
}

impl FileSystemConfig {
    /// The plugin descriptor described by this section.
    pub fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            id: self.id.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
            blacklist: Vec::new(),
        }
    }
}

/// Format registrations applied on top of the default seed.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct FormatConfig {
    /// Extension to format tag.
    pub extensions: HashMap<String, String>,
    /// MIME type (or subtype) to format tag.
    pub mime: HashMap<String, String>,
    /// Header signatures, registered in file order.
    pub signatures: Vec<SignatureConfig>,
}

/// One header signature.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SignatureConfig {
    /// Byte offset of the magic bytes.
    #[serde(default)]
    pub offset: usize,
    /// The magic bytes.
    pub magic: Vec<u8>,
    /// The format reported on a match.
    pub format: String,
}

impl RegistryConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded registry configuration from '{}'", path.display());
        Ok(config)
    }

    /// Registers this configuration's formats with `formats`.
    pub fn apply_formats(&self, formats: &FormatSniffer) {
        for (extension, tag) in &self.formats.extensions {
            formats.register_extension(extension, tag.as_str());
        }
        for (mime, tag) in &self.formats.mime {
            formats.register_mime(mime, tag.as_str());
        }
        for signature in &self.formats.signatures {
            formats.register_signature(Signature::new(
                signature.offset,
                signature.magic.clone(),
                signature.format.as_str(),
            ));
        }
    }
}
