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

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use quarry_core::{ByteStream, FormatTag, SourceHandle};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

/// Upper bound on the buffer reserved up front for a peek.
const PEEK_CAPACITY: usize = 8 * 1024;

/// A handle over a file on disk.
///
/// Header bytes are read through their own file handle and kept, so peeking
/// never moves the position of a stream opened later.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    format: FormatTag,
    header: Vec<u8>,
    header_complete: bool,
}

impl FileSource {
    /// A handle for `path`. The file is not opened until it is read.
    pub fn new(path: impl Into<PathBuf>, format: FormatTag) -> Self {
        Self {
            path: path.into(),
            format,
            header: Vec::new(),
            header_complete: false,
        }
    }

    /// Replaces the format hint, once the header has been sniffed.
    pub fn set_format(&mut self, format: FormatTag) {
        self.format = format;
    }

    /// The file this handle reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> anyhow::Result<File> {
        File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open '{}'", self.path.display()))
    }
}

#[async_trait]
impl SourceHandle for FileSource {
    fn format_hint(&self) -> FormatTag {
        self.format.clone()
    }

    async fn peek(&mut self, count: usize, cancel: &CancellationToken) -> anyhow::Result<Vec<u8>> {
        if self.header.len() < count && !self.header_complete {
            if cancel.is_cancelled() {
                anyhow::bail!("peek of '{}' cancelled", self.path.display());
            }
            let file = self.open().await?;
            let mut header = Vec::with_capacity(count.min(PEEK_CAPACITY));
            file.take(count as u64)
                .read_to_end(&mut header)
                .await
                .with_context(|| format!("Failed to read header of '{}'", self.path.display()))?;
            self.header_complete = header.len() < count;
            self.header = header;
        }
        let end = count.min(self.header.len());
        Ok(self.header[..end].to_vec())
    }

    async fn open_stream(&mut self, _: &CancellationToken) -> anyhow::Result<Option<ByteStream>> {
        Ok(Some(Box::pin(self.open().await?)))
    }

    async fn open_sidecar(
        &mut self,
        extension: &str,
        _: &CancellationToken,
    ) -> anyhow::Result<Option<ByteStream>> {
        let extension = FormatTag::new(extension);
        let sibling = self.path.with_extension(extension.as_str());
        match File::open(&sibling).await {
            Ok(file) => Ok(Some(Box::pin(file))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to open sidecar '{}'", sibling.display())),
        }
    }

    fn local_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
