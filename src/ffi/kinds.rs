//! Descriptors for every native object kind.

use super::handles::{Duplicate, ForeignKind, Release};
use super::loader::api;
use super::raw::*;

/// Macro to define a kind marker and its release/duplicate functions.
macro_rules! define_kind {
    ($kind:ident, $raw:ty, $name:literal) => {
        #[doc = concat!("Descriptor for a native ", $name, ".")]
        pub struct $kind;

        impl ForeignKind for $kind {
            type Raw = $raw;
            const NAME: &'static str = $name;
        }
    };
    ($kind:ident, $raw:ty, $name:literal, destroy = $destroy:ident) => {
        define_kind!($kind, $raw, $name);

        unsafe impl Release for $kind {
            unsafe fn release(ptr: *mut $raw) {
                api().$destroy(ptr)
            }
        }
    };
    ($kind:ident, $raw:ty, $name:literal, destroy = $destroy:ident, copy = $copy:ident) => {
        define_kind!($kind, $raw, $name, destroy = $destroy);

        unsafe impl Duplicate for $kind {
            unsafe fn duplicate(ptr: *const $raw) -> *mut $raw {
                api().$copy(ptr)
            }
        }
    };
}

// Exclusively owned
define_kind!(ContextOptions, BtckContextOptions, "context options",
    destroy = btck_context_options_destroy);
define_kind!(ChainstateManagerOptions, BtckChainstateManagerOptions, "chainstate manager options",
    destroy = btck_chainstate_manager_options_destroy);
define_kind!(ChainstateManager, BtckChainstateManager, "chainstate manager",
    destroy = btck_chainstate_manager_destroy);
define_kind!(LoggingConnection, BtckLoggingConnection, "logging connection",
    destroy = btck_logging_connection_destroy);

// Reference counted
define_kind!(Context, BtckContext, "context",
    destroy = btck_context_destroy, copy = btck_context_copy);
define_kind!(ChainParameters, BtckChainParameters, "chain parameters",
    destroy = btck_chain_parameters_destroy, copy = btck_chain_parameters_copy);
define_kind!(Block, BtckBlock, "block",
    destroy = btck_block_destroy, copy = btck_block_copy);
define_kind!(BlockHash, BtckBlockHash, "block hash",
    destroy = btck_block_hash_destroy, copy = btck_block_hash_copy);
define_kind!(BlockSpentOutputs, BtckBlockSpentOutputs, "block spent outputs",
    destroy = btck_block_spent_outputs_destroy, copy = btck_block_spent_outputs_copy);
define_kind!(TransactionSpentOutputs, BtckTransactionSpentOutputs, "transaction spent outputs",
    destroy = btck_transaction_spent_outputs_destroy, copy = btck_transaction_spent_outputs_copy);
define_kind!(Coin, BtckCoin, "coin",
    destroy = btck_coin_destroy, copy = btck_coin_copy);
define_kind!(Transaction, BtckTransaction, "transaction",
    destroy = btck_transaction_destroy, copy = btck_transaction_copy);
define_kind!(TransactionInput, BtckTransactionInput, "transaction input",
    destroy = btck_transaction_input_destroy, copy = btck_transaction_input_copy);
define_kind!(TransactionOutPoint, BtckTransactionOutPoint, "transaction out point",
    destroy = btck_transaction_out_point_destroy, copy = btck_transaction_out_point_copy);
define_kind!(TransactionOutput, BtckTransactionOutput, "transaction output",
    destroy = btck_transaction_output_destroy, copy = btck_transaction_output_copy);
define_kind!(Txid, BtckTxid, "txid",
    destroy = btck_txid_destroy, copy = btck_txid_copy);
define_kind!(ScriptPubkey, BtckScriptPubkey, "script pubkey",
    destroy = btck_script_pubkey_destroy, copy = btck_script_pubkey_copy);

// Only ever borrowed
define_kind!(Chain, BtckChain, "chain");
define_kind!(BlockTreeEntry, BtckBlockTreeEntry, "block tree entry");
define_kind!(BlockValidationState, BtckBlockValidationState, "block validation state");
