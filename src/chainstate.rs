//! Chainstate manager: block processing and chain queries.

use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

use crate::block::{Block, BlockHash, BlockHashExt};
use crate::chain::{BlockTreeEntry, Chain};
use crate::coins::BlockSpentOutputs;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::ffi::{self, check_status, kinds, to_c_bool, AsRaw, Owned};

fn path_str<'p>(path: &'p Path, what: &str) -> Result<&'p str> {
    path.to_str()
        .ok_or_else(|| Error::Configuration(format!("{} is not valid UTF-8: {}", what, path.display())))
}

/// Options for creating a [`ChainstateManager`].
///
/// Missing directories are created by the kernel.
pub struct ChainstateManagerOptions {
    inner: Owned<kinds::ChainstateManagerOptions>,
    context: Context,
}

impl ChainstateManagerOptions {
    /// Create options bound to `context`, storing chainstate data under
    /// `data_dir` and block files under `blocks_dir`.
    pub fn new(context: &Context, data_dir: impl AsRef<Path>, blocks_dir: impl AsRef<Path>) -> Result<Self> {
        let api = ffi::try_api()?;
        let data_dir = path_str(data_dir.as_ref(), "data directory")?;
        let blocks_dir = path_str(blocks_dir.as_ref(), "blocks directory")?;

        let ptr = unsafe {
            api.btck_chainstate_manager_options_create(
                context.as_ptr(),
                data_dir.as_ptr() as *const c_char,
                data_dir.len(),
                blocks_dir.as_ptr() as *const c_char,
                blocks_dir.len(),
            )
        };
        if ptr.is_null() {
            return Err(Error::Internal(
                "failed to create chainstate manager options".to_string(),
            ));
        }

        Ok(Self {
            inner: unsafe { Owned::from_raw(ptr) },
            context: context.clone(),
        })
    }

    /// Number of script verification threads. Zero disables parallel
    /// verification; the kernel clamps large values.
    pub fn set_worker_threads(&mut self, threads: i32) {
        unsafe {
            ffi::api().btck_chainstate_manager_options_set_worker_threads_num(self.inner.as_ptr(), threads)
        }
    }

    /// Wipe databases on startup. Wiping the block tree requires wiping the
    /// chainstate too; follow with [`ChainstateManager::import_blocks`] to
    /// reindex.
    pub fn set_wipe_dbs(&mut self, wipe_block_tree: bool, wipe_chainstate: bool) -> Result<()> {
        if wipe_block_tree && !wipe_chainstate {
            return Err(Error::Configuration(
                "wiping the block tree database requires wiping the chainstate database".to_string(),
            ));
        }
        let code = unsafe {
            ffi::api().btck_chainstate_manager_options_set_wipe_dbs(
                self.inner.as_ptr(),
                to_c_bool(wipe_block_tree),
                to_c_bool(wipe_chainstate),
            )
        };
        check_status(code, "set wipe dbs")
    }

    /// Keep the block tree database in memory.
    pub fn set_block_tree_db_in_memory(&mut self, in_memory: bool) {
        unsafe {
            ffi::api().btck_chainstate_manager_options_update_block_tree_db_in_memory(
                self.inner.as_ptr(),
                to_c_bool(in_memory),
            )
        }
    }

    /// Keep the chainstate database in memory.
    pub fn set_chainstate_db_in_memory(&mut self, in_memory: bool) {
        unsafe {
            ffi::api().btck_chainstate_manager_options_update_chainstate_db_in_memory(
                self.inner.as_ptr(),
                to_c_bool(in_memory),
            )
        }
    }
}

unsafe impl Send for ChainstateManagerOptions {}
unsafe impl Sync for ChainstateManagerOptions {}

/// Outcome of [`ChainstateManager::process_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessBlockResult {
    /// The block passed validation checks.
    pub accepted: bool,
    /// The block was not seen before.
    pub new_block: bool,
}

impl ProcessBlockResult {
    /// Check if the block had already been processed.
    pub fn is_duplicate(&self) -> bool {
        !self.new_block
    }
}

/// Validates blocks and maintains the chainstate.
///
/// Keeps its context alive. Chains and entries borrowed from the manager
/// are views into its memory; processing blocks through `&self` while
/// holding them is allowed, and the active chain they describe may change
/// underneath them.
///
/// # Example
///
/// ```no_run
/// use bitcoinkernel::{Block, ChainstateManager, ChainstateManagerOptions, Context};
///
/// # fn example(raw_block: &[u8]) -> bitcoinkernel::Result<()> {
/// let context = Context::new(None)?;
/// let options = ChainstateManagerOptions::new(&context, "/tmp/kernel", "/tmp/kernel/blocks")?;
/// let chainman = ChainstateManager::new(&options)?;
///
/// let result = chainman.process_block(&Block::new(raw_block)?);
/// println!("accepted: {}, new: {}", result.accepted, result.new_block);
///
/// let chain = chainman.active_chain();
/// if let Some(tip) = chain.tip() {
///     println!("tip {} at height {}", tip.block_hash(), tip.height());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChainstateManager {
    inner: Owned<kinds::ChainstateManager>,
    _context: Context,
}

impl ChainstateManager {
    /// Create a chainstate manager and load any existing chainstate.
    pub fn new(options: &ChainstateManagerOptions) -> Result<Self> {
        let api = ffi::try_api()?;
        let ptr = unsafe { api.btck_chainstate_manager_create(options.inner.as_ptr()) };
        if ptr.is_null() {
            return Err(Error::Internal("failed to create chainstate manager".to_string()));
        }
        log::debug!("created chainstate manager");
        Ok(Self {
            inner: unsafe { Owned::from_raw(ptr) },
            _context: options.context.clone(),
        })
    }

    /// Validate `block` and connect it if it extends the best chain.
    pub fn process_block(&self, block: &Block) -> ProcessBlockResult {
        let mut new_block: c_int = 0;
        let code = unsafe {
            ffi::api().btck_chainstate_manager_process_block(self.inner.as_ptr(), block.as_ptr(), &mut new_block)
        };
        ProcessBlockResult {
            accepted: code == 0,
            new_block: new_block != 0,
        }
    }

    /// Import block files and run a reindex if wipes were requested.
    ///
    /// Blocks until done; use [`Context::interrupt`] to stop early.
    pub fn import_blocks<P: AsRef<Path>>(&self, paths: &[P]) -> Result<()> {
        let paths: Vec<&str> = paths
            .iter()
            .map(|p| path_str(p.as_ref(), "block file path"))
            .collect::<Result<_>>()?;
        let ptrs: Vec<*const c_char> = paths.iter().map(|p| p.as_ptr() as *const c_char).collect();
        let lens: Vec<usize> = paths.iter().map(|p| p.len()).collect();

        let (ptrs_ptr, lens_ptr) = if paths.is_empty() {
            (ptr::null(), ptr::null())
        } else {
            (ptrs.as_ptr(), lens.as_ptr())
        };

        let code = unsafe {
            ffi::api().btck_chainstate_manager_import_blocks(
                self.inner.as_ptr(),
                ptrs_ptr,
                lens_ptr,
                paths.len(),
            )
        };
        check_status(code, "import blocks")
    }

    /// The currently active chain.
    pub fn active_chain(&self) -> Chain<'_> {
        unsafe { Chain::from_ptr(ffi::api().btck_chainstate_manager_get_active_chain(self.inner.as_ptr())) }
    }

    /// Look up a block in the block index.
    pub fn block_tree_entry<H: BlockHashExt + ?Sized>(&self, hash: &H) -> Option<BlockTreeEntry<'_>> {
        unsafe {
            BlockTreeEntry::try_from_ptr(ffi::api().btck_chainstate_manager_get_block_tree_entry_by_hash(
                self.inner.as_ptr(),
                hash.as_raw(),
            ))
        }
    }

    /// Look up a block by hash bytes.
    pub fn block_tree_entry_by_bytes(&self, hash: [u8; 32]) -> Result<Option<BlockTreeEntry<'_>>> {
        let hash = BlockHash::new(hash)?;
        Ok(self.block_tree_entry(&hash))
    }

    /// Read a block from disk.
    pub fn read_block(&self, entry: &BlockTreeEntry<'_>) -> Result<Block> {
        let ptr = unsafe { ffi::api().btck_block_read(self.inner.as_ptr(), entry.as_ptr()) };
        if ptr.is_null() {
            return Err(Error::Internal(format!(
                "failed to read block at height {}",
                entry.height()
            )));
        }
        Ok(unsafe { Block::from_owned(ptr) })
    }

    /// Read a block's undo data. The genesis block has none.
    pub fn read_spent_outputs(&self, entry: &BlockTreeEntry<'_>) -> Result<BlockSpentOutputs> {
        let ptr = unsafe { ffi::api().btck_block_spent_outputs_read(self.inner.as_ptr(), entry.as_ptr()) };
        if ptr.is_null() {
            return Err(Error::Internal(format!(
                "failed to read spent outputs at height {}",
                entry.height()
            )));
        }
        Ok(unsafe { BlockSpentOutputs::from_owned(ptr) })
    }
}

unsafe impl Send for ChainstateManager {}
unsafe impl Sync for ChainstateManager {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_flag() {
        let result = ProcessBlockResult {
            accepted: true,
            new_block: false,
        };
        assert!(result.is_duplicate());
    }

    #[test]
    fn test_path_str() {
        assert_eq!(path_str(Path::new("/tmp/blocks"), "blocks").unwrap(), "/tmp/blocks");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/tmp/\xff"));
        assert!(path_str(path, "data directory").unwrap_err().is_configuration());
    }
}
