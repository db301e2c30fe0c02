//! A block store backed by a plain directory.
//!
//! Each block lives in its own file, named by the text form of its address.
//! The store is append-only: writing an address that is already present is
//! a no-op, since the bytes are identical by construction.

use std::fs;
use std::io;
use std::path::PathBuf;

use dagpath_types::{BlockError, BlockSink, BlockSource, BoxFuture, ContentAddress, ResolveContext};

pub struct FsBlockStore {
    root: PathBuf,
}

impl FsBlockStore {
    /// Open the store at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn block_path(&self, address: &ContentAddress) -> PathBuf {
        self.root.join(address.to_string())
    }
}

impl BlockSource for FsBlockStore {
    fn get<'a>(
        &'a self,
        _ctx: &'a ResolveContext,
        address: &'a ContentAddress,
    ) -> BoxFuture<'a, Result<Vec<u8>, BlockError>> {
        let path = self.block_path(address);
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(block) => Ok(block),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BlockError::NotFound {
                    address: address.clone(),
                }),
                Err(e) => Err(BlockError::source(address, e)),
            }
        })
    }
}

impl BlockSink for FsBlockStore {
    fn put(&self, address: &ContentAddress, block: &[u8]) -> Result<(), BlockError> {
        let path = self.block_path(address);
        if path.exists() {
            return Ok(());
        }
        // Write aside and rename so a reader never sees a partial block.
        let partial = path.with_extension("partial");
        fs::write(&partial, block)
            .and_then(|()| fs::rename(&partial, &path))
            .map_err(|e| BlockError::source(address, e))?;
        tracing::trace!(%address, path = %path.display(), "wrote block file");
        Ok(())
    }

    fn contains(&self, address: &ContentAddress) -> bool {
        self.block_path(address).exists()
    }
}
