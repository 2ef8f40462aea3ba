//! The active chain and the block tree.
//!
//! Both types are views into memory owned by the
//! [`ChainstateManager`](crate::ChainstateManager) and borrow it.
//!
//! Processing blocks changes the active chain in place. An entry obtained
//! earlier stays a valid pointer for the lifetime of the manager, but it
//! may no longer be part of the active chain; check with
//! [`Chain::contains`] before relying on that.

use std::fmt;

use crate::block::BlockHashRef;
use crate::ffi::{self, from_c_bool, kinds, View};

/// Entry of the in-memory block index.
///
/// Every entry except the genesis entry points to its parent, so the
/// entries form a tree.
#[derive(Clone, Copy)]
pub struct BlockTreeEntry<'a> {
    inner: View<'a, kinds::BlockTreeEntry>,
}

impl<'a> BlockTreeEntry<'a> {
    pub(crate) unsafe fn from_ptr(ptr: *const ffi::BtckBlockTreeEntry) -> Self {
        Self {
            inner: View::new(ptr),
        }
    }

    pub(crate) unsafe fn try_from_ptr(ptr: *const ffi::BtckBlockTreeEntry) -> Option<Self> {
        View::try_new(ptr).map(|inner| Self { inner })
    }

    pub(crate) fn as_ptr(&self) -> *const ffi::BtckBlockTreeEntry {
        self.inner.as_ptr()
    }

    /// Height of the block in the tree.
    pub fn height(&self) -> i32 {
        unsafe { ffi::api().btck_block_tree_entry_get_height(self.as_ptr()) }
    }

    /// Hash of the block.
    pub fn block_hash(&self) -> BlockHashRef<'a> {
        unsafe { BlockHashRef::from_ptr(ffi::api().btck_block_tree_entry_get_block_hash(self.as_ptr())) }
    }

    /// Parent entry, `None` for genesis.
    pub fn prev(&self) -> Option<BlockTreeEntry<'a>> {
        unsafe { Self::try_from_ptr(ffi::api().btck_block_tree_entry_get_previous(self.as_ptr())) }
    }
}

impl PartialEq for BlockTreeEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_ptr() == other.as_ptr()
    }
}

impl Eq for BlockTreeEntry<'_> {}

impl fmt::Debug for BlockTreeEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockTreeEntry")
            .field("ptr", &self.as_ptr())
            .finish()
    }
}

unsafe impl Send for BlockTreeEntry<'_> {}
unsafe impl Sync for BlockTreeEntry<'_> {}

/// The currently active chain.
#[derive(Clone, Copy)]
pub struct Chain<'a> {
    inner: View<'a, kinds::Chain>,
}

impl<'a> Chain<'a> {
    pub(crate) unsafe fn from_ptr(ptr: *const ffi::BtckChain) -> Self {
        Self {
            inner: View::new(ptr),
        }
    }

    /// Height of the tip. An empty chain reports -1.
    pub fn height(&self) -> i32 {
        unsafe { ffi::api().btck_chain_get_height(self.inner.as_ptr()) }
    }

    /// Entry of the current tip, `None` while the chain is empty.
    pub fn tip(&self) -> Option<BlockTreeEntry<'a>> {
        unsafe { BlockTreeEntry::try_from_ptr(ffi::api().btck_chain_get_tip(self.inner.as_ptr())) }
    }

    /// Entry of the genesis block, `None` while the chain is empty.
    pub fn genesis(&self) -> Option<BlockTreeEntry<'a>> {
        unsafe {
            BlockTreeEntry::try_from_ptr(ffi::api().btck_chain_get_genesis(self.inner.as_ptr()))
        }
    }

    /// Entry at `height`, `None` if the height is not in the chain.
    pub fn at_height(&self, height: i32) -> Option<BlockTreeEntry<'a>> {
        if height < 0 {
            return None;
        }
        unsafe {
            BlockTreeEntry::try_from_ptr(ffi::api().btck_chain_get_by_height(self.inner.as_ptr(), height))
        }
    }

    /// Check if `entry` is part of the active chain.
    pub fn contains(&self, entry: &BlockTreeEntry<'_>) -> bool {
        from_c_bool(unsafe { ffi::api().btck_chain_contains(self.inner.as_ptr(), entry.as_ptr()) })
    }

    /// Iterate from genesis to the tip as of each step.
    pub fn iter(&self) -> ChainIter<'a> {
        ChainIter {
            chain: *self,
            height: 0,
        }
    }
}

impl<'a> IntoIterator for Chain<'a> {
    type Item = BlockTreeEntry<'a>;
    type IntoIter = ChainIter<'a>;

    fn into_iter(self) -> ChainIter<'a> {
        self.iter()
    }
}

impl fmt::Debug for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("ptr", &self.inner.as_ptr()).finish()
    }
}

unsafe impl Send for Chain<'_> {}
unsafe impl Sync for Chain<'_> {}

/// Iterator over the active chain by height.
pub struct ChainIter<'a> {
    chain: Chain<'a>,
    height: i32,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = BlockTreeEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.chain.at_height(self.height)?;
        self.height += 1;
        Some(entry)
    }
}
