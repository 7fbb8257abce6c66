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

//! The asset registry: cache, lazy fallback table, plugin lists and the
//! in-flight request table.

mod pipeline;
mod request;
mod state;

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use quarry_core::{plugin::Plugin, AssetRef, AssetType, FormatSniffer};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::config::RegistryConfig;
use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::loaders::{BlobLoader, JsonLoader, TextLoader};
use crate::plugin::{AssetLoader, AssetResolver, RegistryEvent, RegistryListener};
use crate::resolvers::FileSystemResolver;

use state::{LazyEntry, RegistryState};

pub(crate) use state::Outcome;

struct RegistryInner {
    state: Mutex<RegistryState>,
    formats: Arc<FormatSniffer>,
    runtime: Option<Handle>,
    next_flight: AtomicU64,
}

/// Builder for an [`AssetRegistry`].
#[derive(Default)]
pub struct RegistryOptions {
    formats: Option<Arc<FormatSniffer>>,
    runtime: Option<Handle>,
}

impl RegistryOptions {
    /// Default options: the seeded [`FormatSniffer`] and the ambient runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares an existing format sniffer with the registry.
    pub fn formats(mut self, formats: Arc<FormatSniffer>) -> Self {
        self.formats = Some(formats);
        self
    }

    /// Runs pipelines on `runtime` instead of the runtime of the calling task.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the registry.
    pub fn create(self) -> AssetRegistry {
        AssetRegistry {
            inner: Arc::new(RegistryInner {
                state: Mutex::new(RegistryState::default()),
                formats: self.formats.unwrap_or_else(|| Arc::new(FormatSniffer::new())),
                runtime: self.runtime,
                next_flight: AtomicU64::new(0),
            }),
        }
    }
}

/// Resolves identifiers into cached, shared assets.
///
/// The registry is a cheap handle around shared state; clones refer to the same
/// cache. Any thread may issue requests. Asynchronous requests for the same
/// identifier are coalesced into a single pipeline run whose result every
/// caller observes.
#[derive(Clone)]
pub struct AssetRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetRegistry {
    /// A registry with default options and no plugins.
    pub fn new() -> Self {
        RegistryOptions::new().create()
    }

    /// Builds a registry from a configuration: format registrations, the
    /// filesystem resolver and, optionally, the built-in loaders.
    pub fn from_config(config: &RegistryConfig) -> Self {
        let formats = Arc::new(FormatSniffer::new());
        config.apply_formats(&formats);
        let registry = RegistryOptions::new().formats(formats.clone()).create();

        let fs = &config.filesystem;
        if fs.enabled {
            registry.register_resolver(Arc::new(FileSystemResolver::new(
                fs.descriptor(),
                fs.namespace.clone(),
                fs.roots.clone(),
                formats,
            )));
        }
        if config.builtin_loaders {
            registry.register_builtin_loaders();
        }
        info!(
            "Asset registry ready: {} resolver(s) active",
            registry.resolver_order().len()
        );
        registry
    }

    /// Registers the JSON, text and blob loaders, in that order.
    pub fn register_builtin_loaders(&self) {
        self.register_loader(Arc::new(JsonLoader));
        self.register_loader(Arc::new(TextLoader));
        self.register_loader(Arc::new(BlobLoader));
    }

    /// The format sniffer shared with built-in resolvers.
    pub fn formats(&self) -> &Arc<FormatSniffer> {
        &self.inner.formats
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn runtime(&self) -> Result<Handle, ResolveError> {
        self.inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or(ResolveError::NoRuntime)
    }

    // --- Cache ---

    /// Caches `asset` under `id`.
    ///
    /// Any asset previously cached under `id` is dropped from the cache, and if
    /// `asset` was cached under another identifier that entry is removed, so
    /// each asset keeps exactly one canonical identifier.
    pub fn register(&self, id: impl Into<String>, asset: AssetRef) {
        let id = id.into();
        let replaced = self.lock().insert(&id, asset);
        if replaced.is_some() {
            debug!("Replaced cached asset '{id}'");
        }
        self.notify(RegistryEvent::Registered { id });
    }

    /// Wraps `value` and caches it under `id`, returning the shared handle.
    pub fn register_value<T: Any + Send + Sync>(&self, id: impl Into<String>, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.register(id, AssetRef::from_arc(value.clone()));
        value
    }

    /// Removes the asset cached under `id`.
    pub fn unregister(&self, id: &str) -> Option<AssetRef> {
        let removed = self.lock().remove(id);
        if removed.is_some() {
            self.notify(RegistryEvent::Unregistered { id: id.to_string() });
        }
        removed
    }

    /// Removes `asset` from the cache, returning the identifier it was under.
    pub fn unregister_asset(&self, asset: &AssetRef) -> Option<String> {
        let id = {
            let mut state = self.lock();
            let id = state.identifiers.get(&asset.key()).cloned()?;
            state.remove(&id);
            id
        };
        self.notify(RegistryEvent::Unregistered { id: id.clone() });
        Some(id)
    }

    /// The canonical identifier of a cached asset.
    pub fn get_identifier_for(&self, asset: &AssetRef) -> Option<String> {
        self.lock().identifiers.get(&asset.key()).cloned()
    }

    /// Whether an asset is cached under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().cache.contains_key(id)
    }

    /// The number of cached assets.
    pub fn cached_len(&self) -> usize {
        self.lock().cache.len()
    }

    // --- Lazy table ---

    /// Registers a synchronous factory consulted before any resolver.
    ///
    /// When `cacheable` is set, the first successful result is cached and the
    /// factory is not called again for as long as the entry stays cached.
    pub fn register_lazy<F>(&self, id: impl Into<String>, factory: F, cacheable: bool)
    where
        F: Fn() -> anyhow::Result<AssetRef> + Send + Sync + 'static,
    {
        self.lock().lazy.insert(
            id.into(),
            LazyEntry {
                factory: Arc::new(factory),
                cacheable,
            },
        );
    }

    /// Removes a lazy factory. Returns whether one was registered.
    pub fn unregister_lazy(&self, id: &str) -> bool {
        self.lock().lazy.remove(id).is_some()
    }

    // --- Plugins ---

    /// Adds a resolver, replacing any resolver with the same id, and recomputes
    /// the resolver order.
    pub fn register_resolver(&self, resolver: Arc<dyn AssetResolver>) {
        let id = resolver.descriptor().id.clone();
        let mut state = self.lock();
        match state
            .resolvers
            .iter()
            .position(|existing| existing.descriptor().id == id)
        {
            Some(index) => {
                warn!("Resolver '{id}' registered twice; replacing the previous one");
                state.resolvers[index] = resolver;
            }
            None => state.resolvers.push(resolver),
        }
        state.rebuild_resolver_order();
        debug!("Registered resolver '{id}'");
    }

    /// Removes the resolver with `id`. Returns whether one was registered.
    pub fn unregister_resolver(&self, id: &str) -> bool {
        let mut state = self.lock();
        let before = state.resolvers.len();
        state.resolvers.retain(|resolver| resolver.descriptor().id != id);
        let removed = state.resolvers.len() != before;
        if removed {
            state.rebuild_resolver_order();
        }
        removed
    }

    /// The ids of the active resolvers, in the order they are tried.
    pub fn resolver_order(&self) -> Vec<String> {
        self.lock()
            .resolver_order
            .iter()
            .map(|resolver| resolver.descriptor().id.clone())
            .collect()
    }

    /// Appends a loader. Loaders are tried in registration order.
    pub fn register_loader(&self, loader: Arc<dyn AssetLoader>) {
        debug!(
            "Registered loader '{}' for {}",
            loader.name(),
            loader.output_type()
        );
        self.lock().loaders.push(loader);
    }

    /// Adds a listener and recomputes the listener order.
    pub fn register_listener(&self, listener: Arc<dyn RegistryListener>) {
        let mut state = self.lock();
        state.listeners.push(listener);
        state.rebuild_listener_order();
    }

    /// Declares that assets of type `sub` satisfy requests for `sup`.
    pub fn register_supertype(&self, sub: AssetType, sup: AssetType) {
        let mut state = self.lock();
        Arc::make_mut(&mut state.types).register_supertype(sub, sup);
    }

    fn notify(&self, event: RegistryEvent) {
        let listeners = self.lock().listener_order.clone();
        for listener in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener.on_event(&event))).is_err() {
                warn!(
                    "Listener '{}' panicked while handling {event:?}",
                    listener.descriptor().id
                );
            }
        }
    }

    // --- Requests ---

    /// Synchronous lookup: the cache, then the lazy table.
    ///
    /// Never consults resolvers or loaders and never waits on in-flight
    /// requests. Factory errors and panics are logged and reported as `None`.
    pub fn get(&self, id: &str) -> Option<AssetRef> {
        let lazy = {
            let state = self.lock();
            if let Some(asset) = state.cache.get(id) {
                return Some(asset.clone());
            }
            state.lazy.get(id).cloned()?
        };

        let asset = pipeline::run_factory(id, &lazy)?;
        if lazy.cacheable {
            let (asset, added) = self.lock().insert_resolved(id, asset);
            if added {
                self.notify(RegistryEvent::Resolved { id: id.to_string() });
            }
            return Some(asset);
        }
        Some(asset)
    }

    /// Typed form of [`get`](Self::get).
    pub fn get_typed<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.get(id)?.downcast::<T>()
    }

    /// Resolves `id` as a new top-level request.
    ///
    /// Returns `Ok(None)` when nothing could produce an asset assignable to
    /// `requested`, and [`ResolveError::Cancelled`] when `cancel` fires first.
    pub async fn get_async(
        &self,
        id: &str,
        requested: AssetType,
        cancel: &CancellationToken,
    ) -> Result<Option<AssetRef>, ResolveError> {
        let ctx = ResolveContext::root(self);
        self.get_async_within(&ctx, id, requested, cancel).await
    }

    /// Typed form of [`get_async`](Self::get_async).
    pub async fn get_typed_async<T: Any + Send + Sync>(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<T>>, ResolveError> {
        let asset = self.get_async(id, AssetType::of::<T>(), cancel).await?;
        Ok(asset.and_then(|asset| asset.downcast::<T>()))
    }
}
