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

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quarry_core::{plugin::Plugin, ByteStream, SourceHandle};
use quarry_io::loaders::Blob;
use quarry_io::sources::{MemorySource, ProceduralSource};
use quarry_io::{
    AssetLoader, AssetRef, AssetResolver, AssetType, CancellationToken, FormatTag, Identifier,
    PluginDescriptor, ResolveContext,
};
use tokio::sync::Notify;

// --- Resolvers ---

/// Serves any path in its namespace, optionally parking until `gate` fires.
pub struct TestResolver {
    pub descriptor: PluginDescriptor,
    pub namespace: String,
    pub gated: bool,
    pub entered: Notify,
    pub gate: Notify,
    pub calls: AtomicUsize,
    pub disposals: Arc<AtomicUsize>,
}

impl TestResolver {
    pub fn new(id: &str, namespace: &str) -> Self {
        Self::with_descriptor(PluginDescriptor::new(id), namespace)
    }

    pub fn with_descriptor(descriptor: PluginDescriptor, namespace: &str) -> Self {
        Self {
            descriptor,
            namespace: namespace.to_string(),
            gated: false,
            entered: Notify::new(),
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
            disposals: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl Plugin for TestResolver {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl AssetResolver for TestResolver {
    fn can_resolve(&self, id: &Identifier, _: AssetType) -> bool {
        id.namespace() == self.namespace
    }

    async fn resolve(
        &self,
        id: &Identifier,
        _: AssetType,
        _: &ResolveContext,
        _: &CancellationToken,
    ) -> anyhow::Result<Option<Box<dyn SourceHandle>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if self.gated {
            self.gate.notified().await;
        }
        let source = MemorySource::new(id.path().as_bytes().to_vec(), FormatTag::new("bin"));
        Ok(Some(Box::new(CountedSource {
            inner: Box::new(source),
            disposals: self.disposals.clone(),
        })))
    }
}

/// Hands out byte-less handles tagged with the identifier's path as format.
pub struct ProceduralResolver {
    pub descriptor: PluginDescriptor,
    pub disposals: Arc<AtomicUsize>,
}

impl ProceduralResolver {
    pub fn new(id: &str) -> Self {
        Self {
            descriptor: PluginDescriptor::new(id),
            disposals: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl Plugin for ProceduralResolver {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl AssetResolver for ProceduralResolver {
    fn can_resolve(&self, id: &Identifier, _: AssetType) -> bool {
        id.namespace() == "gen"
    }

    async fn resolve(
        &self,
        id: &Identifier,
        _: AssetType,
        _: &ResolveContext,
        _: &CancellationToken,
    ) -> anyhow::Result<Option<Box<dyn SourceHandle>>> {
        Ok(Some(Box::new(CountedSource {
            inner: Box::new(ProceduralSource::new(FormatTag::new(id.path()))),
            disposals: self.disposals.clone(),
        })))
    }
}

/// How a [`FaultyResolver`] misbehaves.
#[derive(Clone, Copy)]
pub enum Fault {
    Error,
    Panic,
    PanicInCheck,
}

pub struct FaultyResolver {
    pub descriptor: PluginDescriptor,
    pub fault: Fault,
}

impl Plugin for FaultyResolver {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl AssetResolver for FaultyResolver {
    fn can_resolve(&self, _: &Identifier, _: AssetType) -> bool {
        if let Fault::PanicInCheck = self.fault {
            panic!("can_resolve exploded");
        }
        true
    }

    async fn resolve(
        &self,
        _: &Identifier,
        _: AssetType,
        _: &ResolveContext,
        _: &CancellationToken,
    ) -> anyhow::Result<Option<Box<dyn SourceHandle>>> {
        match self.fault {
            Fault::Error => anyhow::bail!("resolver failed"),
            _ => panic!("resolve exploded"),
        }
    }
}

// --- Handles ---

/// Wraps another handle and counts how often it is disposed.
pub struct CountedSource {
    pub inner: Box<dyn SourceHandle>,
    pub disposals: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceHandle for CountedSource {
    fn format_hint(&self) -> FormatTag {
        self.inner.format_hint()
    }

    async fn peek(&mut self, count: usize, cancel: &CancellationToken) -> anyhow::Result<Vec<u8>> {
        self.inner.peek(count, cancel).await
    }

    async fn open_stream(
        &mut self,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<ByteStream>> {
        self.inner.open_stream(cancel).await
    }

    fn dispose(self: Box<Self>) -> anyhow::Result<()> {
        self.disposals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// --- Loaders ---

/// Produces a [`Blob`] for any handle and counts its invocations.
#[derive(Default)]
pub struct CountingLoader {
    pub calls: AtomicUsize,
}

impl CountingLoader {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetLoader for CountingLoader {
    fn name(&self) -> &str {
        "counting"
    }

    fn output_type(&self) -> AssetType {
        AssetType::of::<Blob>()
    }

    fn can_load(&self, _: &dyn SourceHandle) -> bool {
        true
    }

    async fn load(
        &self,
        handle: &mut dyn SourceHandle,
        _: &ResolveContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<AssetRef>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = handle.peek(1024, cancel).await?;
        Ok(Some(AssetRef::new(Blob {
            format: handle.format_hint(),
            bytes,
        })))
    }
}

/// A loader that always errors or always panics.
pub struct FaultyLoader {
    pub panics: bool,
}

#[async_trait]
impl AssetLoader for FaultyLoader {
    fn name(&self) -> &str {
        if self.panics {
            "panicking"
        } else {
            "erroring"
        }
    }

    fn output_type(&self) -> AssetType {
        AssetType::of::<Blob>()
    }

    fn can_load(&self, _: &dyn SourceHandle) -> bool {
        true
    }

    async fn load(
        &self,
        _: &mut dyn SourceHandle,
        _: &ResolveContext,
        _: &CancellationToken,
    ) -> anyhow::Result<Option<AssetRef>> {
        if self.panics {
            panic!("load exploded");
        }
        anyhow::bail!("load failed")
    }
}

/// Records every event it sees.
pub struct RecordingListener {
    pub descriptor: PluginDescriptor,
    pub events: Mutex<Vec<quarry_io::RegistryEvent>>,
}

impl Plugin for RecordingListener {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

impl quarry_io::RegistryListener for RecordingListener {
    fn on_event(&self, event: &quarry_io::RegistryEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
