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

//! Resolves the identifiers given on the command line and describes the results.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use quarry_io::loaders::{Blob, JsonDocument, TextAsset};
use quarry_io::{AssetRef, AssetRegistry, AssetType, CancellationToken, RegistryConfig};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Registry configuration file. Defaults to `Quarry.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset roots, replacing those from the configuration.
    #[arg(long = "root")]
    roots: Vec<PathBuf>,

    /// Identifiers to resolve, such as `file::textures/grass.png`.
    #[arg(required = true)]
    ids: Vec<String>,
}

fn load_config(args: &Args) -> Result<RegistryConfig> {
    let default_path = PathBuf::from("Quarry.toml");
    let mut config = match &args.config {
        Some(path) => RegistryConfig::load(path)
            .with_context(|| format!("Failed to load '{}'", path.display()))?,
        None if default_path.exists() => RegistryConfig::load(&default_path)?,
        None => {
            info!("No 'Quarry.toml' found. Using default configuration.");
            RegistryConfig::default()
        }
    };
    if !args.roots.is_empty() {
        config.filesystem.roots = args.roots.clone();
    }
    Ok(config)
}

fn describe(asset: &AssetRef) -> String {
    if let Some(text) = asset.downcast_ref::<TextAsset>() {
        format!("{} text, {} chars", text.format, text.text.chars().count())
    } else if let Some(json) = asset.downcast_ref::<JsonDocument>() {
        let kind = match &json.0 {
            serde_json::Value::Object(map) => format!("object with {} keys", map.len()),
            serde_json::Value::Array(items) => format!("array of {}", items.len()),
            _ => "scalar".to_string(),
        };
        format!("json {kind}")
    } else if let Some(blob) = asset.downcast_ref::<Blob>() {
        format!("{} blob, {} bytes", blob.format, blob.bytes.len())
    } else {
        format!("{}", asset.asset_type())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let registry = AssetRegistry::from_config(&config);
    let cancel = CancellationToken::new();

    let mut missing = 0;
    for id in &args.ids {
        match registry.get_async(id, AssetType::any(), &cancel).await? {
            Some(asset) => println!("{id}: {}", describe(&asset)),
            None => {
                warn!("'{id}' could not be resolved");
                missing += 1;
            }
        }
    }

    info!(
        "Resolved {} of {} identifier(s); {} asset(s) cached",
        args.ids.len() - missing,
        args.ids.len(),
        registry.cached_len()
    );
    Ok(())
}
