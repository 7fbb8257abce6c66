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

use std::path::PathBuf;
use thiserror::Error;

/// Why an asset request ended without an answer.
///
/// "Not found" is not an error: requests that exhaust every resolver and
/// loader return `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The caller's cancellation token fired before the request completed.
    #[error("Asset request was cancelled")]
    Cancelled,
    /// No tokio runtime was configured or available to run the pipeline.
    #[error("No tokio runtime available to run the asset pipeline")]
    NoRuntime,
}

/// Errors raised while reading a registry configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration file '{path}'")]
    Io {
        /// The file that failed to load.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for [`crate::RegistryConfig`].
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
