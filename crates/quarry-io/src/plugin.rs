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

//! The plugin contracts the registry drives.

use async_trait::async_trait;
use quarry_core::{
    impl_dependency_node, plugin::Plugin, AssetRef, AssetType, Identifier, SourceHandle,
};
use tokio_util::sync::CancellationToken;

use crate::context::ResolveContext;

/// Locates the bytes behind an identifier.
///
/// Resolvers are tried in the order computed from their
/// [`PluginDescriptor`](quarry_core::PluginDescriptor)s; the first one to
/// return a handle wins. Errors and panics are logged by the registry and the
/// next resolver is tried.
#[async_trait]
pub trait AssetResolver: Plugin {
    /// Cheap, synchronous pre-check. The requested type is advisory.
    fn can_resolve(&self, id: &Identifier, requested: AssetType) -> bool;

    /// Produces a fresh handle, or `None` to let the next resolver try.
    ///
    /// Nested requests must go through `ctx` so self-referencing chains are
    /// detected.
    async fn resolve(
        &self,
        id: &Identifier,
        requested: AssetType,
        ctx: &ResolveContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<Box<dyn SourceHandle>>>;
}

impl_dependency_node!(dyn AssetResolver);

/// Turns a handle into an in-memory asset of one declared type.
///
/// Loaders are tried in registration order, restricted to those whose
/// [`output_type`](Self::output_type) satisfies the request.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &str;

    /// The type of every asset this loader produces.
    fn output_type(&self) -> AssetType;

    /// Whether this loader understands the handle, usually from its format hint.
    fn can_load(&self, handle: &dyn SourceHandle) -> bool;

    /// Reads the handle. `None` lets the next loader try.
    async fn load(
        &self,
        handle: &mut dyn SourceHandle,
        ctx: &ResolveContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<AssetRef>>;
}

/// A change to the registry's cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// An asset was registered explicitly.
    Registered {
        /// The identifier it was registered under.
        id: String,
    },
    /// An asset was removed from the cache.
    Unregistered {
        /// The identifier it was registered under.
        id: String,
    },
    /// An asset request finished and its result was cached.
    Resolved {
        /// The requested identifier.
        id: String,
    },
}

/// Observes cache changes. Listeners are notified in dependency order.
pub trait RegistryListener: Plugin {
    /// Called outside the registry lock. Panics are logged and swallowed.
    fn on_event(&self, event: &RegistryEvent);
}

impl_dependency_node!(dyn RegistryListener);
