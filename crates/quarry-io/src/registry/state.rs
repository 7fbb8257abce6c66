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

use std::sync::Arc;

use ahash::AHashMap;
use futures::future::{BoxFuture, Shared};
use log::warn;
use quarry_core::{
    asset::AssetKey,
    graph::{order_plugins, DependencyNode},
    AssetRef, TypeTable,
};
use tokio_util::sync::CancellationToken;

use crate::error::ResolveError;
use crate::plugin::{AssetLoader, AssetResolver, RegistryListener};

/// The value every joiner of a request observes.
pub(crate) type Outcome = Result<Option<AssetRef>, ResolveError>;

pub(crate) type LazyFactory = Arc<dyn Fn() -> anyhow::Result<AssetRef> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct LazyEntry {
    pub factory: LazyFactory,
    pub cacheable: bool,
}

/// A running pipeline and the callers waiting on it.
pub(crate) struct InFlight {
    pub serial: u64,
    pub outcome: Shared<BoxFuture<'static, Outcome>>,
    pub cancel: CancellationToken,
    pub joiners: usize,
}

/// Everything behind the registry's lock.
pub(crate) struct RegistryState {
    pub cache: AHashMap<String, AssetRef>,
    pub identifiers: AHashMap<AssetKey, String>,
    pub lazy: AHashMap<String, LazyEntry>,
    pub resolvers: Vec<Arc<dyn AssetResolver>>,
    pub resolver_order: Arc<[Arc<dyn AssetResolver>]>,
    pub loaders: Vec<Arc<dyn AssetLoader>>,
    pub listeners: Vec<Arc<dyn RegistryListener>>,
    pub listener_order: Arc<[Arc<dyn RegistryListener>]>,
    pub types: Arc<TypeTable>,
    pub in_flight: AHashMap<String, InFlight>,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            cache: AHashMap::new(),
            identifiers: AHashMap::new(),
            lazy: AHashMap::new(),
            resolvers: Vec::new(),
            resolver_order: Arc::from(Vec::new()),
            loaders: Vec::new(),
            listeners: Vec::new(),
            listener_order: Arc::from(Vec::new()),
            types: Arc::new(TypeTable::new()),
            in_flight: AHashMap::new(),
        }
    }
}

impl RegistryState {
    /// Caches `asset` under `id`, dropping whatever either side was mapped to.
    ///
    /// Returns the asset previously cached under `id`, if it was a different one.
    pub fn insert(&mut self, id: &str, asset: AssetRef) -> Option<AssetRef> {
        if let Some(old_id) = self.identifiers.remove(&asset.key()) {
            if old_id != id {
                self.cache.remove(&old_id);
            }
        }
        let previous = self.cache.insert(id.to_string(), asset.clone());
        if let Some(previous) = &previous {
            if !previous.ptr_eq(&asset) {
                self.identifiers.remove(&previous.key());
            }
        }
        self.identifiers.insert(asset.key(), id.to_string());
        previous.filter(|previous| !previous.ptr_eq(&asset))
    }

    /// Caches a freshly produced asset and returns the asset callers should see.
    ///
    /// An entry that appeared under `id` while the pipeline ran is kept and
    /// returned instead. An asset that already has a canonical identifier is
    /// returned without being re-keyed. The flag tells whether `asset` was added.
    pub fn insert_resolved(&mut self, id: &str, asset: AssetRef) -> (AssetRef, bool) {
        if let Some(existing) = self.cache.get(id) {
            return (existing.clone(), false);
        }
        if self.identifiers.contains_key(&asset.key()) {
            return (asset, false);
        }
        self.identifiers.insert(asset.key(), id.to_string());
        self.cache.insert(id.to_string(), asset.clone());
        (asset, true)
    }

    pub fn remove(&mut self, id: &str) -> Option<AssetRef> {
        let asset = self.cache.remove(id)?;
        self.identifiers.remove(&asset.key());
        Some(asset)
    }

    pub fn rebuild_resolver_order(&mut self) {
        self.resolver_order = sorted("Resolver", &self.resolvers);
    }

    pub fn rebuild_listener_order(&mut self) {
        self.listener_order = sorted("Listener", &self.listeners);
    }
}

fn sorted<P>(kind: &str, plugins: &[Arc<P>]) -> Arc<[Arc<P>]>
where
    P: DependencyNode + ?Sized,
{
    let order = order_plugins(plugins.to_vec());
    for plugin in &order.blacklisted {
        warn!(
            "{kind} '{}' is disabled by another plugin's blacklist",
            plugin.node_id()
        );
    }
    for plugin in &order.circular {
        warn!(
            "{kind} '{}' is part of a dependency cycle and will not be used",
            plugin.node_id()
        );
    }
    order.ordered.into()
}
