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

//! One resolution attempt: lazy table, resolver chain, loader chain, disposal.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use log::{debug, warn};
use quarry_core::{plugin::Plugin, AssetRef, AssetType, Identifier, SourceHandle, TypeTable};
use tokio_util::sync::CancellationToken;

use super::state::LazyEntry;
use super::{AssetRegistry, Outcome};
use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::plugin::{AssetLoader, AssetResolver, RegistryEvent};

/// What the pipeline copies out of the registry before its first suspension.
struct Snapshot {
    lazy: Option<LazyEntry>,
    resolvers: Arc<[Arc<dyn AssetResolver>]>,
    loaders: Vec<Arc<dyn AssetLoader>>,
    types: Arc<TypeTable>,
}

/// An asset produced by the pipeline and whether it may be cached.
struct Produced {
    asset: AssetRef,
    cacheable: bool,
}

/// Runs the pipeline for `id` and retires the in-flight entry `serial`.
///
/// The outcome is shared by every joiner, so it is not filtered by `requested`;
/// each joiner applies its own type check.
pub(super) async fn run(
    registry: AssetRegistry,
    ctx: ResolveContext,
    id: String,
    requested: AssetType,
    cancel: CancellationToken,
    serial: u64,
) -> Outcome {
    let snapshot = {
        let state = registry.lock();
        let cached = state.cache.get(&id).cloned();
        if let Some(asset) = cached {
            drop(state);
            registry.retire(&id, serial);
            return Ok(Some(asset));
        }
        Snapshot {
            lazy: state.lazy.get(&id).cloned(),
            resolvers: state.resolver_order.clone(),
            loaders: state
                .loaders
                .iter()
                .filter(|loader| state.types.is_assignable(requested, loader.output_type()))
                .cloned()
                .collect(),
            types: state.types.clone(),
        }
    };

    let produced = produce(&ctx, &id, requested, &cancel, &snapshot).await;
    registry.finish_flight(&id, serial, produced)
}

async fn produce(
    ctx: &ResolveContext,
    id: &str,
    requested: AssetType,
    cancel: &CancellationToken,
    snapshot: &Snapshot,
) -> Result<Option<Produced>, ResolveError> {
    if let Some(lazy) = &snapshot.lazy {
        if let Some(asset) = run_factory(id, lazy) {
            return Ok(Some(Produced {
                asset,
                cacheable: lazy.cacheable,
            }));
        }
    }

    let identifier = match Identifier::parse(id) {
        Ok(identifier) => identifier,
        Err(err) => {
            debug!("'{id}' is not a structured identifier: {err}");
            return Ok(None);
        }
    };

    let Some(mut handle) = find_handle(ctx, &identifier, requested, cancel, snapshot).await? else {
        debug!("No resolver produced a handle for '{id}'");
        return Ok(None);
    };

    let loaded = load_handle(ctx, id, &mut *handle, cancel, snapshot).await;
    dispose(id, handle);

    Ok(loaded?.map(|asset| Produced {
        asset,
        cacheable: true,
    }))
}

/// Invokes a lazy factory, turning errors and panics into `None`.
pub(super) fn run_factory(id: &str, lazy: &LazyEntry) -> Option<AssetRef> {
    match catch_unwind(AssertUnwindSafe(|| (lazy.factory)())) {
        Ok(Ok(asset)) => Some(asset),
        Ok(Err(err)) => {
            warn!("Lazy factory for '{id}' failed: {err:#}");
            None
        }
        Err(panic) => {
            warn!(
                "Lazy factory for '{id}' panicked: {}",
                panic_message(&*panic)
            );
            None
        }
    }
}

async fn find_handle(
    ctx: &ResolveContext,
    identifier: &Identifier,
    requested: AssetType,
    cancel: &CancellationToken,
    snapshot: &Snapshot,
) -> Result<Option<Box<dyn SourceHandle>>, ResolveError> {
    for resolver in snapshot.resolvers.iter() {
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }
        let name = &resolver.descriptor().id;

        match catch_unwind(AssertUnwindSafe(|| resolver.can_resolve(identifier, requested))) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(panic) => {
                warn!(
                    "Resolver '{name}' panicked in can_resolve for '{identifier}': {}",
                    panic_message(&*panic)
                );
                continue;
            }
        }

        let attempt =
            AssertUnwindSafe(resolver.resolve(identifier, requested, ctx, cancel)).catch_unwind();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
            result = attempt => result,
        };

        match result {
            Ok(Ok(Some(handle))) => {
                debug!(
                    "Resolver '{name}' produced a {} handle for '{identifier}'",
                    handle.format_hint()
                );
                return Ok(Some(handle));
            }
            Ok(Ok(None)) => {}
            Ok(Err(err)) => warn!("Resolver '{name}' failed for '{identifier}': {err:#}"),
            Err(panic) => warn!(
                "Resolver '{name}' panicked for '{identifier}': {}",
                panic_message(&*panic)
            ),
        }
    }
    Ok(None)
}

async fn load_handle(
    ctx: &ResolveContext,
    id: &str,
    handle: &mut dyn SourceHandle,
    cancel: &CancellationToken,
    snapshot: &Snapshot,
) -> Result<Option<AssetRef>, ResolveError> {
    for loader in &snapshot.loaders {
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }
        let name = loader.name();

        match catch_unwind(AssertUnwindSafe(|| loader.can_load(&*handle))) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(panic) => {
                warn!(
                    "Loader '{name}' panicked in can_load for '{id}': {}",
                    panic_message(&*panic)
                );
                continue;
            }
        }

        let attempt = AssertUnwindSafe(loader.load(&mut *handle, ctx, cancel)).catch_unwind();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
            result = attempt => result,
        };

        match result {
            Ok(Ok(Some(asset))) => {
                if !snapshot
                    .types
                    .is_assignable(loader.output_type(), asset.asset_type())
                {
                    warn!(
                        "Loader '{name}' declared {} but produced a {} for '{id}'",
                        loader.output_type(),
                        asset.asset_type()
                    );
                    continue;
                }
                debug!("Loader '{name}' loaded '{id}'");
                return Ok(Some(asset));
            }
            Ok(Ok(None)) => {}
            Ok(Err(err)) => warn!("Loader '{name}' failed for '{id}': {err:#}"),
            Err(panic) => warn!(
                "Loader '{name}' panicked for '{id}': {}",
                panic_message(&*panic)
            ),
        }
    }
    Ok(None)
}

fn dispose(id: &str, handle: Box<dyn SourceHandle>) {
    match catch_unwind(AssertUnwindSafe(move || handle.dispose())) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!("Disposing the handle for '{id}' failed: {err:#}"),
        Err(panic) => warn!(
            "Disposing the handle for '{id}' panicked: {}",
            panic_message(&*panic)
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl AssetRegistry {
    /// Removes the in-flight entry for `id` if it still belongs to `serial`.
    fn retire(&self, id: &str, serial: u64) {
        let mut state = self.lock();
        if state
            .in_flight
            .get(id)
            .is_some_and(|flight| flight.serial == serial)
        {
            state.in_flight.remove(id);
        }
    }

    /// Caches a produced asset and retires the flight under one lock.
    fn finish_flight(
        &self,
        id: &str,
        serial: u64,
        produced: Result<Option<Produced>, ResolveError>,
    ) -> Outcome {
        let (outcome, added) = {
            let mut state = self.lock();
            if state
                .in_flight
                .get(id)
                .is_some_and(|flight| flight.serial == serial)
            {
                state.in_flight.remove(id);
            }
            match produced {
                Ok(Some(Produced {
                    asset,
                    cacheable: true,
                })) => {
                    let (asset, added) = state.insert_resolved(id, asset);
                    (Ok(Some(asset)), added)
                }
                Ok(Some(Produced { asset, .. })) => (Ok(Some(asset)), false),
                Ok(None) => (Ok(None), false),
                Err(err) => (Err(err), false),
            }
        };
        if added {
            self.notify(RegistryEvent::Resolved { id: id.to_string() });
        }
        outcome
    }
}
