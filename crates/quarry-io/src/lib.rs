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

//! Asset resolution services: the registry that caches and coalesces requests,
//! the resolver and loader plugin contracts, and a set of built-in sources,
//! resolvers and loaders.

pub mod config;
pub mod context;
pub mod error;
pub mod loaders;
pub mod plugin;
pub mod registry;
pub mod resolvers;
pub mod sources;

pub use config::RegistryConfig;
pub use context::ResolveContext;
pub use error::{ConfigError, ResolveError};
pub use plugin::{AssetLoader, AssetResolver, RegistryEvent, RegistryListener};
pub use registry::{AssetRegistry, RegistryOptions};

pub use quarry_core::{
    AssetRef, AssetType, FormatSniffer, FormatTag, Identifier, PluginDescriptor, SourceHandle,
};
pub use tokio_util::sync::CancellationToken;
