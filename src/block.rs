//! Blocks and block hashes.

use std::fmt;
use std::os::raw::c_void;

use crate::error::{Error, Result};
use crate::ffi::{self, check_index, check_parsed, from_c_bool, kinds, shared_entity, writer, AsRaw, Shared};
use crate::transaction::TransactionRef;

/// Write 32 bytes as hex in reversed order, the way bitcoin displays hashes.
pub(crate) fn fmt_reversed_hex(bytes: &[u8; 32], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes.iter().rev() {
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

shared_entity! {
    /// Double SHA256 hash of a block header.
    BlockHash, BlockHashRef, kinds::BlockHash
}

impl BlockHash {
    /// Create a block hash from its 32 bytes in internal byte order.
    pub fn new(bytes: [u8; 32]) -> Result<Self> {
        let api = ffi::try_api()?;
        unsafe { Self::from_constructor(api.btck_block_hash_create(bytes.as_ptr())) }
    }
}

/// Accessors shared by [`BlockHash`] and [`BlockHashRef`].
pub trait BlockHashExt: AsRaw<kinds::BlockHash> {
    /// Hash bytes in internal byte order.
    fn to_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        unsafe { ffi::api().btck_block_hash_to_bytes(self.as_raw(), bytes.as_mut_ptr()) };
        bytes
    }

    /// Compare with another hash.
    fn equals<H: BlockHashExt + ?Sized>(&self, other: &H) -> bool {
        from_c_bool(unsafe { ffi::api().btck_block_hash_equals(self.as_raw(), other.as_raw()) })
    }
}

impl<T: AsRaw<kinds::BlockHash>> BlockHashExt for T {}

impl PartialEq for BlockHash {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for BlockHash {}

impl PartialEq<BlockHashRef<'_>> for BlockHash {
    fn eq(&self, other: &BlockHashRef<'_>) -> bool {
        self.equals(other)
    }
}

impl PartialEq for BlockHashRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl PartialEq<BlockHash> for BlockHashRef<'_> {
    fn eq(&self, other: &BlockHash) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_reversed_hex(&self.to_bytes(), f)
    }
}

impl fmt::Display for BlockHashRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_reversed_hex(&self.to_bytes(), f)
    }
}

/// A full block.
///
/// # Example
///
/// ```no_run
/// use bitcoinkernel::{Block, TransactionExt};
///
/// # fn example(raw: &[u8]) -> bitcoinkernel::Result<()> {
/// let block = Block::new(raw)?;
/// println!("block {} has {} transactions", block.hash(), block.transaction_count());
/// for tx in block.transactions() {
///     println!("  {}", tx.txid());
/// }
/// assert_eq!(block.to_bytes()?, raw);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Block {
    inner: Shared<kinds::Block>,
}

impl Block {
    /// Parse a serialized block.
    pub fn new(raw: &[u8]) -> Result<Self> {
        let api = ffi::try_api()?;
        let ptr = unsafe { api.btck_block_create(raw.as_ptr() as *const c_void, raw.len()) };
        let ptr = check_parsed(ptr, "block")?;
        Ok(unsafe { Self::from_owned(ptr) })
    }

    /// # Safety
    ///
    /// `ptr` must be a block reference owned by the caller.
    pub(crate) unsafe fn from_owned(ptr: *mut ffi::BtckBlock) -> Self {
        Self {
            inner: Shared::from_owned(ptr),
        }
    }

    pub(crate) fn as_ptr(&self) -> *const ffi::BtckBlock {
        self.inner.as_ptr()
    }

    /// Take another native reference, reporting failure instead of
    /// panicking like `clone()` does.
    pub fn try_clone(&self) -> Result<Self> {
        self.inner.try_clone().map(|inner| Self { inner })
    }

    /// Hash of the block header.
    pub fn hash(&self) -> BlockHash {
        unsafe { BlockHash::from_owned(ffi::api().btck_block_get_hash(self.as_ptr())) }
    }

    /// Number of transactions, including the coinbase.
    pub fn transaction_count(&self) -> usize {
        unsafe { ffi::api().btck_block_count_transactions(self.as_ptr()) }
    }

    /// Transaction at `index`.
    pub fn transaction(&self, index: usize) -> Result<TransactionRef<'_>> {
        check_index(index, self.transaction_count())?;
        unsafe {
            Ok(TransactionRef::from_ptr(
                ffi::api().btck_block_get_transaction_at(self.as_ptr(), index),
            ))
        }
    }

    /// Iterate over the transactions in block order.
    pub fn transactions(&self) -> impl Iterator<Item = TransactionRef<'_>> + '_ {
        (0..self.transaction_count()).map(move |index| unsafe {
            TransactionRef::from_ptr(ffi::api().btck_block_get_transaction_at(self.as_ptr(), index))
        })
    }

    /// Consensus serialization of the block.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        writer::collect("block", |write, user_data| unsafe {
            ffi::api().btck_block_to_bytes(self.as_ptr(), write, user_data)
        })
    }
}

impl TryFrom<&[u8]> for Block {
    type Error = Error;

    fn try_from(raw: &[u8]) -> Result<Self> {
        Block::new(raw)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block").field("hash", &self.hash().to_string()).finish()
    }
}

unsafe impl Send for Block {}
unsafe impl Sync for Block {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Hex([u8; 32]);

    impl fmt::Display for Hex {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt_reversed_hex(&self.0, f)
        }
    }

    #[test]
    fn test_reversed_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x6f;
        bytes[31] = 0x01;
        let s = Hex(bytes).to_string();
        assert_eq!(s.len(), 64);
        assert!(s.starts_with("01"));
        assert!(s.ends_with("6f"));
    }
}
