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

use anyhow::Result;
use quarry_io::loaders::{Blob, JsonDocument, TextAsset};
use quarry_io::resolvers::{FileSystemResolver, MemoryResolver};
use quarry_io::{
    AssetRegistry, AssetType, CancellationToken, FormatTag, PluginDescriptor, RegistryConfig,
};
use tempfile::tempdir;

const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

#[tokio::test]
async fn test_registry_from_config_loads_files() -> Result<()> {
    // --- 1. Setup: two asset roots on disk ---
    let dir = tempdir()?;
    let base = dir.path().join("base");
    let mods = dir.path().join("mods");
    std::fs::create_dir_all(base.join("data"))?;
    std::fs::create_dir_all(&mods)?;
    std::fs::write(base.join("data/config.json"), br#"{"speed": 3}"#)?;
    std::fs::write(base.join("readme.txt"), "hello quarry")?;
    std::fs::write(mods.join("readme.txt"), "modded")?;
    std::fs::write(base.join("mystery"), PNG_HEADER)?;

    let config = RegistryConfig::from_toml_str(&format!(
        "[filesystem]\nnamespace = \"res\"\nroots = [{:?}, {:?}]\n",
        mods.display().to_string(),
        base.display().to_string()
    ))?;
    let registry = AssetRegistry::from_config(&config);
    let cancel = CancellationToken::new();

    // --- 2. JSON goes through the JSON loader ---
    let json = registry
        .get_typed_async::<JsonDocument>("res::data/config.json", &cancel)
        .await?
        .expect("json document");
    assert_eq!(json.0["speed"], 3);

    // --- 3. The first root wins ---
    let text = registry
        .get_typed_async::<TextAsset>("res::readme.txt", &cancel)
        .await?
        .expect("text asset");
    assert_eq!(text.text, "modded");

    // --- 4. Extensionless files are sniffed ---
    let blob = registry
        .get_typed_async::<Blob>("res::mystery", &cancel)
        .await?
        .expect("blob");
    assert_eq!(blob.format, FormatTag::new("png"));
    assert_eq!(blob.bytes, PNG_HEADER);

    // --- 5. Missing files and other namespaces are not found ---
    assert!(registry
        .get_async("res::nope.txt", AssetType::any(), &cancel)
        .await?
        .is_none());
    assert!(registry
        .get_async("other::readme.txt", AssetType::any(), &cancel)
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_traversal_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("root");
    std::fs::create_dir_all(&root)?;
    std::fs::write(dir.path().join("secret.txt"), "top secret")?;
    let absolute = dir.path().join("secret.txt");

    let registry = AssetRegistry::new();
    registry.register_resolver(Arc::new(FileSystemResolver::new(
        PluginDescriptor::new("fs"),
        "file",
        vec![root],
        registry.formats().clone(),
    )));
    registry.register_builtin_loaders();
    let cancel = CancellationToken::new();

    assert!(registry
        .get_async("file::../secret.txt", AssetType::any(), &cancel)
        .await?
        .is_none());
    let absolute_id = format!("file::{}", absolute.display());
    assert!(registry
        .get_async(&absolute_id, AssetType::any(), &cancel)
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_format_query_overrides_missing_extension() -> Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("notes"), "plain words")?;

    let registry = AssetRegistry::new();
    registry.register_resolver(Arc::new(FileSystemResolver::new(
        PluginDescriptor::new("fs"),
        "file",
        vec![dir.path().to_path_buf()],
        registry.formats().clone(),
    )));
    registry.register_builtin_loaders();
    let cancel = CancellationToken::new();

    let text = registry
        .get_typed_async::<TextAsset>("file::notes?format=txt", &cancel)
        .await?
        .expect("text asset");
    assert_eq!(text.text, "plain words");
    assert_eq!(text.format, FormatTag::new("txt"));

    // Without the hint the content sniffs as nothing and only the blob loader applies.
    let asset = registry
        .get_async("file::notes", AssetType::any(), &cancel)
        .await?
        .expect("blob");
    assert!(asset.downcast_ref::<Blob>().is_some());
    Ok(())
}

#[tokio::test]
async fn test_memory_resolver_ordering() -> Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("greeting.txt"), "from disk")?;

    let registry = AssetRegistry::new();
    let memory = Arc::new(MemoryResolver::new(
        PluginDescriptor::new("memory").runs_before("fs"),
        "file",
        registry.formats().clone(),
    ));
    memory.insert("greeting.txt", b"from memory".to_vec());
    registry.register_resolver(Arc::new(FileSystemResolver::new(
        PluginDescriptor::new("fs"),
        "file",
        vec![dir.path().to_path_buf()],
        registry.formats().clone(),
    )));
    registry.register_resolver(memory.clone());
    registry.register_builtin_loaders();
    assert_eq!(registry.resolver_order(), vec!["memory", "fs"]);

    let cancel = CancellationToken::new();
    let text = registry
        .get_typed_async::<TextAsset>("file::greeting.txt", &cancel)
        .await?
        .expect("text asset");
    assert_eq!(text.text, "from memory");

    // Once evicted from both the cache and memory, the disk copy is used.
    registry.unregister("file::greeting.txt");
    assert!(memory.remove("greeting.txt"));
    let text = registry
        .get_typed_async::<TextAsset>("file::greeting.txt", &cancel)
        .await?
        .expect("text asset");
    assert_eq!(text.text, "from disk");
    Ok(())
}
