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

//! Request coalescing: joining, starting and leaving in-flight pipelines.

use std::sync::atomic::Ordering;

use futures::FutureExt;
use log::{debug, error};
use quarry_core::AssetType;
use tokio_util::sync::CancellationToken;

use super::state::InFlight;
use super::{pipeline, AssetRegistry, Outcome};
use crate::context::ResolveContext;
use crate::error::ResolveError;

impl AssetRegistry {
    /// Resolves `id` on behalf of the chain in `ctx`.
    ///
    /// A cached asset is returned at once. A request already in flight is
    /// joined, unless `id` is on the caller's own chain, in which case the
    /// answer is `Ok(None)`. Otherwise a new pipeline is spawned on the
    /// runtime and registered as in flight.
    pub(crate) async fn get_async_within(
        &self,
        ctx: &ResolveContext,
        id: &str,
        requested: AssetType,
        cancel: &CancellationToken,
    ) -> Outcome {
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let (serial, shared, types) = {
            let mut state = self.lock();
            let types = state.types.clone();

            if let Some(asset) = state.cache.get(id) {
                if types.is_assignable(requested, asset.asset_type()) {
                    debug!("Cache hit for '{id}'");
                    return Ok(Some(asset.clone()));
                }
                debug!(
                    "Cached '{id}' is a {}, not assignable to {requested}",
                    asset.asset_type()
                );
                return Ok(None);
            }

            if let Some(flight) = state.in_flight.get_mut(id) {
                if ctx.contains(id) {
                    debug!("'{id}' is already being resolved by this chain; breaking the cycle");
                    return Ok(None);
                }
                flight.joiners += 1;
                debug!("Joining in-flight request for '{id}'");
                (flight.serial, flight.outcome.clone(), types)
            } else {
                let runtime = self.runtime()?;
                let serial = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
                let token = CancellationToken::new();
                let task = runtime.spawn(pipeline::run(
                    self.clone(),
                    ctx.extend(id),
                    id.to_string(),
                    requested,
                    token.clone(),
                    serial,
                ));

                let task_id = id.to_string();
                let shared = async move {
                    match task.await {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            error!("Pipeline task for '{task_id}' failed: {err}");
                            Ok(None)
                        }
                    }
                }
                .boxed()
                .shared();

                state.in_flight.insert(
                    id.to_string(),
                    InFlight {
                        serial,
                        outcome: shared.clone(),
                        cancel: token,
                        joiners: 1,
                    },
                );
                debug!("Started pipeline #{serial} for '{id}'");
                (serial, shared, types)
            }
        };

        let _guard = JoinGuard {
            registry: self,
            id,
            serial,
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
            outcome = shared => outcome,
        };

        match outcome {
            Ok(Some(asset)) if !types.is_assignable(requested, asset.asset_type()) => {
                debug!(
                    "'{id}' resolved to a {}, which is not assignable to {requested}",
                    asset.asset_type()
                );
                Ok(None)
            }
            other => other,
        }
    }
}

/// Counts one caller waiting on an in-flight request.
///
/// When the last waiting caller leaves before the pipeline has finished, the
/// pipeline is cancelled and its entry removed so the next request starts over.
struct JoinGuard<'a> {
    registry: &'a AssetRegistry,
    id: &'a str,
    serial: u64,
}

impl Drop for JoinGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.registry.lock();
        let Some(flight) = state.in_flight.get_mut(self.id) else {
            return;
        };
        if flight.serial != self.serial {
            return;
        }
        flight.joiners = flight.joiners.saturating_sub(1);
        if flight.joiners == 0 {
            if let Some(flight) = state.in_flight.remove(self.id) {
                debug!(
                    "Every caller left pipeline #{} for '{}'; cancelling it",
                    flight.serial, self.id
                );
                flight.cancel.cancel();
            }
        }
    }
}
