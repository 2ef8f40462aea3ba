//! Undo data: the outputs a block's transactions spent.

use std::fmt;

use crate::error::Result;
use crate::ffi::{self, check_index, from_c_bool, kinds, shared_entity, AsRaw, Shared};
use crate::transaction::TransactionOutputRef;

shared_entity! {
    /// Outputs spent by one transaction, one coin per input.
    TransactionSpentOutputs, TransactionSpentOutputsRef, kinds::TransactionSpentOutputs
}

shared_entity! {
    /// A spent output together with where it was created.
    Coin, CoinRef, kinds::Coin
}

/// Outputs spent by every transaction of a block except the coinbase.
///
/// Read with [`ChainstateManager::read_spent_outputs`](crate::ChainstateManager::read_spent_outputs).
#[derive(Clone)]
pub struct BlockSpentOutputs {
    inner: Shared<kinds::BlockSpentOutputs>,
}

impl BlockSpentOutputs {
    pub(crate) unsafe fn from_owned(ptr: *mut ffi::BtckBlockSpentOutputs) -> Self {
        Self {
            inner: Shared::from_owned(ptr),
        }
    }

    /// Take another native reference, reporting failure instead of
    /// panicking like `clone()` does.
    pub fn try_clone(&self) -> Result<Self> {
        self.inner.try_clone().map(|inner| Self { inner })
    }

    /// Number of transactions with spent outputs (block transactions minus the coinbase).
    pub fn count(&self) -> usize {
        unsafe { ffi::api().btck_block_spent_outputs_count(self.inner.as_ptr()) }
    }

    /// Spent outputs of the transaction at `index`.
    pub fn transaction_spent_outputs(&self, index: usize) -> Result<TransactionSpentOutputsRef<'_>> {
        check_index(index, self.count())?;
        unsafe {
            Ok(TransactionSpentOutputsRef::from_ptr(
                ffi::api().btck_block_spent_outputs_get_transaction_spent_outputs_at(
                    self.inner.as_ptr(),
                    index,
                ),
            ))
        }
    }

    /// Iterate over the per-transaction spent outputs.
    pub fn iter(&self) -> impl Iterator<Item = TransactionSpentOutputsRef<'_>> + '_ {
        (0..self.count()).map(move |index| unsafe {
            TransactionSpentOutputsRef::from_ptr(
                ffi::api().btck_block_spent_outputs_get_transaction_spent_outputs_at(
                    self.inner.as_ptr(),
                    index,
                ),
            )
        })
    }
}

impl fmt::Debug for BlockSpentOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockSpentOutputs")
            .field("count", &self.count())
            .finish()
    }
}

unsafe impl Send for BlockSpentOutputs {}
unsafe impl Sync for BlockSpentOutputs {}

/// Accessors shared by [`TransactionSpentOutputs`] and [`TransactionSpentOutputsRef`].
pub trait TransactionSpentOutputsExt: AsRaw<kinds::TransactionSpentOutputs> {
    /// Number of coins, equal to the transaction's input count.
    fn count(&self) -> usize {
        unsafe { ffi::api().btck_transaction_spent_outputs_count(self.as_raw()) }
    }

    /// Coin spent by input `index`.
    fn coin(&self, index: usize) -> Result<CoinRef<'_>> {
        check_index(index, self.count())?;
        unsafe {
            Ok(CoinRef::from_ptr(
                ffi::api().btck_transaction_spent_outputs_get_coin_at(self.as_raw(), index),
            ))
        }
    }
}

impl<T: AsRaw<kinds::TransactionSpentOutputs>> TransactionSpentOutputsExt for T {}

/// Accessors shared by [`Coin`] and [`CoinRef`].
pub trait CoinExt: AsRaw<kinds::Coin> {
    /// Height of the block that created the output.
    fn confirmation_height(&self) -> u32 {
        unsafe { ffi::api().btck_coin_confirmation_height(self.as_raw()) }
    }

    /// Check if the output was created by a coinbase transaction.
    fn is_coinbase(&self) -> bool {
        from_c_bool(unsafe { ffi::api().btck_coin_is_coinbase(self.as_raw()) })
    }

    /// The spent output.
    fn output(&self) -> TransactionOutputRef<'_> {
        unsafe { TransactionOutputRef::from_ptr(ffi::api().btck_coin_get_output(self.as_raw())) }
    }
}

impl<T: AsRaw<kinds::Coin>> CoinExt for T {}
