//! Transactions and their parts.
//!
//! Each type comes as an owned value and a borrowed `*Ref` view. Accessors
//! live on the `*Ext` traits, which both implement; bring them into scope
//! with `use bitcoinkernel::prelude::*`.

use std::fmt;
use std::os::raw::c_void;

use crate::block::fmt_reversed_hex;
use crate::error::{Error, Result};
use crate::ffi::{self, check_index, check_parsed, from_c_bool, kinds, shared_entity, writer, AsRaw};
use crate::script::{ScriptPubkey, ScriptPubkeyRef};

shared_entity! {
    /// A parsed transaction.
    Transaction, TransactionRef, kinds::Transaction
}

shared_entity! {
    /// A transaction input.
    TransactionInput, TransactionInputRef, kinds::TransactionInput
}

shared_entity! {
    /// Reference to the output an input spends.
    TransactionOutPoint, TransactionOutPointRef, kinds::TransactionOutPoint
}

shared_entity! {
    /// A transaction output: an amount locked by a script.
    TransactionOutput, TransactionOutputRef, kinds::TransactionOutput
}

shared_entity! {
    /// Transaction identifier.
    Txid, TxidRef, kinds::Txid
}

impl Transaction {
    /// Parse a serialized transaction.
    pub fn new(raw: &[u8]) -> Result<Self> {
        let api = ffi::try_api()?;
        let ptr = unsafe { api.btck_transaction_create(raw.as_ptr() as *const c_void, raw.len()) };
        let ptr = check_parsed(ptr, "transaction")?;
        Ok(unsafe { Self::from_owned(ptr) })
    }
}

impl TryFrom<&[u8]> for Transaction {
    type Error = Error;

    fn try_from(raw: &[u8]) -> Result<Self> {
        Transaction::new(raw)
    }
}

/// Accessors shared by [`Transaction`] and [`TransactionRef`].
pub trait TransactionExt: AsRaw<kinds::Transaction> {
    /// Number of inputs.
    fn input_count(&self) -> usize {
        unsafe { ffi::api().btck_transaction_count_inputs(self.as_raw()) }
    }

    /// Number of outputs.
    fn output_count(&self) -> usize {
        unsafe { ffi::api().btck_transaction_count_outputs(self.as_raw()) }
    }

    /// Input at `index`.
    fn input(&self, index: usize) -> Result<TransactionInputRef<'_>> {
        check_index(index, self.input_count())?;
        unsafe {
            Ok(TransactionInputRef::from_ptr(
                ffi::api().btck_transaction_get_input_at(self.as_raw(), index),
            ))
        }
    }

    /// Output at `index`.
    fn output(&self, index: usize) -> Result<TransactionOutputRef<'_>> {
        check_index(index, self.output_count())?;
        unsafe {
            Ok(TransactionOutputRef::from_ptr(
                ffi::api().btck_transaction_get_output_at(self.as_raw(), index),
            ))
        }
    }

    /// Identifier of the transaction.
    fn txid(&self) -> TxidRef<'_> {
        unsafe { TxidRef::from_ptr(ffi::api().btck_transaction_get_txid(self.as_raw())) }
    }

    /// Consensus serialization, including witness data.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        writer::collect("transaction", |write, user_data| unsafe {
            ffi::api().btck_transaction_to_bytes(self.as_raw(), write, user_data)
        })
    }
}

impl<T: AsRaw<kinds::Transaction>> TransactionExt for T {}

/// Accessors shared by [`TransactionInput`] and [`TransactionInputRef`].
pub trait TransactionInputExt: AsRaw<kinds::TransactionInput> {
    /// The output this input spends.
    fn out_point(&self) -> TransactionOutPointRef<'_> {
        unsafe {
            TransactionOutPointRef::from_ptr(ffi::api().btck_transaction_input_get_out_point(self.as_raw()))
        }
    }
}

impl<T: AsRaw<kinds::TransactionInput>> TransactionInputExt for T {}

/// Accessors shared by [`TransactionOutPoint`] and [`TransactionOutPointRef`].
pub trait TransactionOutPointExt: AsRaw<kinds::TransactionOutPoint> {
    /// Output index within the referenced transaction.
    fn index(&self) -> u32 {
        unsafe { ffi::api().btck_transaction_out_point_get_index(self.as_raw()) }
    }

    /// Identifier of the referenced transaction.
    fn txid(&self) -> TxidRef<'_> {
        unsafe { TxidRef::from_ptr(ffi::api().btck_transaction_out_point_get_txid(self.as_raw())) }
    }
}

impl<T: AsRaw<kinds::TransactionOutPoint>> TransactionOutPointExt for T {}

impl TransactionOutput {
    /// Create an output paying `amount` satoshis to `script_pubkey`.
    pub fn new(script_pubkey: &ScriptPubkey, amount: i64) -> Result<Self> {
        let api = ffi::try_api()?;
        unsafe {
            Self::from_constructor(api.btck_transaction_output_create(script_pubkey.as_raw(), amount))
        }
    }
}

/// Accessors shared by [`TransactionOutput`] and [`TransactionOutputRef`].
pub trait TransactionOutputExt: AsRaw<kinds::TransactionOutput> {
    /// Amount in satoshis.
    fn amount(&self) -> i64 {
        unsafe { ffi::api().btck_transaction_output_get_amount(self.as_raw()) }
    }

    /// Locking script.
    fn script_pubkey(&self) -> ScriptPubkeyRef<'_> {
        unsafe {
            ScriptPubkeyRef::from_ptr(ffi::api().btck_transaction_output_get_script_pubkey(self.as_raw()))
        }
    }
}

impl<T: AsRaw<kinds::TransactionOutput>> TransactionOutputExt for T {}

/// Accessors shared by [`Txid`] and [`TxidRef`].
pub trait TxidExt: AsRaw<kinds::Txid> {
    /// Hash bytes in internal byte order.
    fn to_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        unsafe { ffi::api().btck_txid_to_bytes(self.as_raw(), bytes.as_mut_ptr()) };
        bytes
    }

    /// Compare with another txid.
    fn equals<T: TxidExt + ?Sized>(&self, other: &T) -> bool {
        from_c_bool(unsafe { ffi::api().btck_txid_equals(self.as_raw(), other.as_raw()) })
    }
}

impl<T: AsRaw<kinds::Txid>> TxidExt for T {}

impl PartialEq for Txid {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for Txid {}

impl PartialEq<TxidRef<'_>> for Txid {
    fn eq(&self, other: &TxidRef<'_>) -> bool {
        self.equals(other)
    }
}

impl PartialEq for TxidRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl PartialEq<Txid> for TxidRef<'_> {
    fn eq(&self, other: &Txid) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_reversed_hex(&TxidExt::to_bytes(self), f)
    }
}

impl fmt::Display for TxidRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_reversed_hex(&TxidExt::to_bytes(self), f)
    }
}
