//! Locking scripts and script verification.

use std::os::raw::{c_uint, c_void};
use std::ptr;

use crate::error::{Error, Result, ScriptVerifyError};
use crate::ffi::{self, check_parsed, from_c_bool, kinds, shared_entity, writer, AsRaw};
use crate::transaction::{TransactionExt, TransactionOutputExt};
use crate::types::ScriptVerifyFlags;

shared_entity! {
    /// A script pubkey (output locking script).
    ScriptPubkey, ScriptPubkeyRef, kinds::ScriptPubkey
}

impl ScriptPubkey {
    /// Create a script pubkey from its serialized bytes.
    pub fn new(raw: &[u8]) -> Result<Self> {
        let api = ffi::try_api()?;
        let ptr = unsafe { api.btck_script_pubkey_create(raw.as_ptr() as *const c_void, raw.len()) };
        let ptr = check_parsed(ptr, "script pubkey")?;
        Ok(unsafe { Self::from_owned(ptr) })
    }
}

impl TryFrom<&[u8]> for ScriptPubkey {
    type Error = Error;

    fn try_from(raw: &[u8]) -> Result<Self> {
        ScriptPubkey::new(raw)
    }
}

/// Checks that do not need the interpreter, in the order the kernel
/// documents them.
fn check_verify_arguments(
    input_count: usize,
    spent_outputs: usize,
    input_index: usize,
    flags: ScriptVerifyFlags,
) -> std::result::Result<(), ScriptVerifyError> {
    if input_index >= input_count {
        return Err(ScriptVerifyError::TxInputIndex);
    }
    if spent_outputs > 0 && spent_outputs != input_count {
        return Err(ScriptVerifyError::SpentOutputsMismatch);
    }
    if !flags.is_valid() {
        return Err(ScriptVerifyError::InvalidFlags);
    }
    Ok(())
}

fn status_error(status: u8) -> ScriptVerifyError {
    match status {
        ffi::BTCK_SCRIPT_VERIFY_STATUS_ERROR_INVALID_FLAGS_COMBINATION => {
            ScriptVerifyError::InvalidFlagsCombination
        }
        ffi::BTCK_SCRIPT_VERIFY_STATUS_ERROR_SPENT_OUTPUTS_REQUIRED => {
            ScriptVerifyError::SpentOutputsRequired
        }
        _ => ScriptVerifyError::Invalid,
    }
}

/// Accessors shared by [`ScriptPubkey`] and [`ScriptPubkeyRef`].
pub trait ScriptPubkeyExt: AsRaw<kinds::ScriptPubkey> {
    /// Serialized script bytes.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        writer::collect("script pubkey", |write, user_data| unsafe {
            ffi::api().btck_script_pubkey_to_bytes(self.as_raw(), write, user_data)
        })
    }

    /// Verify that input `input_index` of `tx_to` satisfies this script.
    ///
    /// `amount` is the value of the spent output, needed for segwit.
    /// `spent_outputs` is either empty or one output per input of `tx_to`;
    /// taproot verification needs all of them.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use bitcoinkernel::prelude::*;
    /// use bitcoinkernel::{ScriptPubkey, ScriptVerifyFlags, Transaction};
    ///
    /// # fn example(spk: &[u8], tx: &[u8]) -> bitcoinkernel::Result<()> {
    /// let script = ScriptPubkey::new(spk)?;
    /// let tx = Transaction::new(tx)?;
    /// let spent: [bitcoinkernel::TransactionOutput; 0] = [];
    /// script.verify(0, &tx, &spent, 0, ScriptVerifyFlags::ALL_PRE_TAPROOT)?;
    /// # Ok(())
    /// # }
    /// ```
    fn verify<T, O>(
        &self,
        amount: i64,
        tx_to: &T,
        spent_outputs: &[O],
        input_index: usize,
        flags: ScriptVerifyFlags,
    ) -> Result<()>
    where
        T: TransactionExt + ?Sized,
        O: TransactionOutputExt,
    {
        check_verify_arguments(tx_to.input_count(), spent_outputs.len(), input_index, flags)?;
        let index = c_uint::try_from(input_index).map_err(|_| ScriptVerifyError::TxInputIndex)?;

        let outputs: Vec<*const ffi::BtckTransactionOutput> =
            spent_outputs.iter().map(|output| output.as_raw()).collect();
        let outputs_ptr = if outputs.is_empty() {
            ptr::null()
        } else {
            outputs.as_ptr()
        };

        let mut status = ffi::BTCK_SCRIPT_VERIFY_STATUS_OK;
        let passed = unsafe {
            ffi::api().btck_script_pubkey_verify(
                self.as_raw(),
                amount,
                tx_to.as_raw(),
                outputs_ptr,
                outputs.len(),
                index,
                flags.bits(),
                &mut status,
            )
        };

        if from_c_bool(passed) {
            Ok(())
        } else {
            Err(status_error(status).into())
        }
    }
}

impl<T: AsRaw<kinds::ScriptPubkey>> ScriptPubkeyExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_index_checked_first() {
        assert_eq!(
            check_verify_arguments(1, 3, 1, ScriptVerifyFlags::from_bits(1 << 30)),
            Err(ScriptVerifyError::TxInputIndex)
        );
        assert_eq!(
            check_verify_arguments(0, 0, 0, ScriptVerifyFlags::ALL),
            Err(ScriptVerifyError::TxInputIndex)
        );
    }

    #[test]
    fn test_spent_outputs_must_match_inputs() {
        assert_eq!(
            check_verify_arguments(2, 1, 0, ScriptVerifyFlags::ALL),
            Err(ScriptVerifyError::SpentOutputsMismatch)
        );
        assert!(check_verify_arguments(2, 0, 1, ScriptVerifyFlags::ALL_PRE_TAPROOT).is_ok());
        assert!(check_verify_arguments(2, 2, 1, ScriptVerifyFlags::ALL).is_ok());
    }

    #[test]
    fn test_unknown_flags_rejected() {
        assert_eq!(
            check_verify_arguments(1, 1, 0, ScriptVerifyFlags::ALL | ScriptVerifyFlags::from_bits(1 << 1)),
            Err(ScriptVerifyError::InvalidFlags)
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_error(1), ScriptVerifyError::InvalidFlagsCombination);
        assert_eq!(status_error(2), ScriptVerifyError::SpentOutputsRequired);
        assert_eq!(status_error(0), ScriptVerifyError::Invalid);
        assert_eq!(status_error(200), ScriptVerifyError::Invalid);
    }
}
