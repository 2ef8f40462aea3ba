//! Runtime loading of the libbitcoinkernel shared library.
//!
//! The symbol table is resolved once per process and kept for the lifetime
//! of the program. Every safe wrapper reaches the native library through
//! [`api()`] or [`try_api()`].

use std::env;
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use libloading::Library;
use parking_lot::Mutex;

use super::raw::*;
use crate::error::{Error, Result};

/// Environment variable naming the shared library to load.
pub const LIBRARY_ENV: &str = "BITCOINKERNEL_LIB";

/// Generates [`KernelApi`]: one resolved function pointer per symbol and a
/// forwarding method with the same name.
macro_rules! kernel_api {
    ($( fn $name:ident ( $($arg:ident : $ty:ty),* $(,)? ) $(-> $ret:ty)? ; )*) => {
        /// Resolved `btck_*` symbol table.
        pub struct KernelApi {
            $( $name: unsafe extern "C" fn($($ty),*) $(-> $ret)?, )*
            _library: Library,
        }

        impl KernelApi {
            /// # Safety
            ///
            /// The library must export every symbol with the declared signature.
            unsafe fn resolve(library: Library) -> std::result::Result<Self, libloading::Error> {
                Ok(Self {
                    $(
                        $name: *library.get::<unsafe extern "C" fn($($ty),*) $(-> $ret)?>(
                            concat!(stringify!($name), "\0").as_bytes(),
                        )?,
                    )*
                    _library: library,
                })
            }

            $(
                #[inline]
                #[allow(clippy::too_many_arguments)]
                pub unsafe fn $name(&self, $($arg: $ty),*) $(-> $ret)? {
                    (self.$name)($($arg),*)
                }
            )*
        }
    };
}

kernel_api! {
    // Logging
    fn btck_logging_disable();
    fn btck_logging_set_options(options: BtckLoggingOptions);
    fn btck_logging_set_level_category(category: u8, level: u8);
    fn btck_logging_enable_category(category: u8);
    fn btck_logging_disable_category(category: u8);
    fn btck_logging_connection_create(
        callback: BtckLogCallback,
        user_data: *mut c_void,
        user_data_destroy: BtckDestroyCallback,
    ) -> *mut BtckLoggingConnection;
    fn btck_logging_connection_destroy(connection: *mut BtckLoggingConnection);

    // Chain parameters
    fn btck_chain_parameters_create(chain_type: u8) -> *mut BtckChainParameters;
    fn btck_chain_parameters_copy(params: *const BtckChainParameters) -> *mut BtckChainParameters;
    fn btck_chain_parameters_destroy(params: *mut BtckChainParameters);

    // Context options
    fn btck_context_options_create() -> *mut BtckContextOptions;
    fn btck_context_options_set_chainparams(
        options: *mut BtckContextOptions,
        params: *const BtckChainParameters,
    );
    fn btck_context_options_set_notifications(
        options: *mut BtckContextOptions,
        callbacks: BtckNotificationInterfaceCallbacks,
    );
    fn btck_context_options_set_validation_interface(
        options: *mut BtckContextOptions,
        callbacks: BtckValidationInterfaceCallbacks,
    );
    fn btck_context_options_destroy(options: *mut BtckContextOptions);

    // Context
    fn btck_context_create(options: *const BtckContextOptions) -> *mut BtckContext;
    fn btck_context_copy(context: *const BtckContext) -> *mut BtckContext;
    fn btck_context_interrupt(context: *mut BtckContext) -> c_int;
    fn btck_context_destroy(context: *mut BtckContext);

    // Block tree entry
    fn btck_block_tree_entry_get_previous(entry: *const BtckBlockTreeEntry) -> *const BtckBlockTreeEntry;
    fn btck_block_tree_entry_get_height(entry: *const BtckBlockTreeEntry) -> i32;
    fn btck_block_tree_entry_get_block_hash(entry: *const BtckBlockTreeEntry) -> *const BtckBlockHash;

    // Chainstate manager options
    fn btck_chainstate_manager_options_create(
        context: *const BtckContext,
        data_dir: *const c_char,
        data_dir_len: usize,
        blocks_dir: *const c_char,
        blocks_dir_len: usize,
    ) -> *mut BtckChainstateManagerOptions;
    fn btck_chainstate_manager_options_set_worker_threads_num(
        options: *mut BtckChainstateManagerOptions,
        worker_threads: c_int,
    );
    fn btck_chainstate_manager_options_set_wipe_dbs(
        options: *mut BtckChainstateManagerOptions,
        wipe_block_tree_db: c_int,
        wipe_chainstate_db: c_int,
    ) -> c_int;
    fn btck_chainstate_manager_options_update_block_tree_db_in_memory(
        options: *mut BtckChainstateManagerOptions,
        in_memory: c_int,
    );
    fn btck_chainstate_manager_options_update_chainstate_db_in_memory(
        options: *mut BtckChainstateManagerOptions,
        in_memory: c_int,
    );
    fn btck_chainstate_manager_options_destroy(options: *mut BtckChainstateManagerOptions);

    // Chainstate manager
    fn btck_chainstate_manager_create(
        options: *const BtckChainstateManagerOptions,
    ) -> *mut BtckChainstateManager;
    fn btck_chainstate_manager_import_blocks(
        manager: *mut BtckChainstateManager,
        paths: *const *const c_char,
        path_lens: *const usize,
        count: usize,
    ) -> c_int;
    fn btck_chainstate_manager_process_block(
        manager: *mut BtckChainstateManager,
        block: *const BtckBlock,
        new_block: *mut c_int,
    ) -> c_int;
    fn btck_chainstate_manager_get_active_chain(manager: *const BtckChainstateManager) -> *const BtckChain;
    fn btck_chainstate_manager_get_block_tree_entry_by_hash(
        manager: *const BtckChainstateManager,
        hash: *const BtckBlockHash,
    ) -> *const BtckBlockTreeEntry;
    fn btck_chainstate_manager_destroy(manager: *mut BtckChainstateManager);

    // Block
    fn btck_block_read(
        manager: *const BtckChainstateManager,
        entry: *const BtckBlockTreeEntry,
    ) -> *mut BtckBlock;
    fn btck_block_create(raw: *const c_void, len: usize) -> *mut BtckBlock;
    fn btck_block_copy(block: *const BtckBlock) -> *mut BtckBlock;
    fn btck_block_count_transactions(block: *const BtckBlock) -> usize;
    fn btck_block_get_transaction_at(block: *const BtckBlock, index: usize) -> *const BtckTransaction;
    fn btck_block_get_hash(block: *const BtckBlock) -> *mut BtckBlockHash;
    fn btck_block_to_bytes(block: *const BtckBlock, writer: BtckWriteBytes, user_data: *mut c_void) -> c_int;
    fn btck_block_destroy(block: *mut BtckBlock);

    // Block validation state
    fn btck_block_validation_state_get_validation_mode(state: *const BtckBlockValidationState) -> u8;
    fn btck_block_validation_state_get_block_validation_result(
        state: *const BtckBlockValidationState,
    ) -> u32;

    // Chain
    fn btck_chain_get_tip(chain: *const BtckChain) -> *const BtckBlockTreeEntry;
    fn btck_chain_get_height(chain: *const BtckChain) -> i32;
    fn btck_chain_get_genesis(chain: *const BtckChain) -> *const BtckBlockTreeEntry;
    fn btck_chain_get_by_height(chain: *const BtckChain, height: c_int) -> *const BtckBlockTreeEntry;
    fn btck_chain_contains(chain: *const BtckChain, entry: *const BtckBlockTreeEntry) -> c_int;

    // Spent outputs
    fn btck_block_spent_outputs_read(
        manager: *const BtckChainstateManager,
        entry: *const BtckBlockTreeEntry,
    ) -> *mut BtckBlockSpentOutputs;
    fn btck_block_spent_outputs_copy(outputs: *const BtckBlockSpentOutputs) -> *mut BtckBlockSpentOutputs;
    fn btck_block_spent_outputs_count(outputs: *const BtckBlockSpentOutputs) -> usize;
    fn btck_block_spent_outputs_get_transaction_spent_outputs_at(
        outputs: *const BtckBlockSpentOutputs,
        index: usize,
    ) -> *const BtckTransactionSpentOutputs;
    fn btck_block_spent_outputs_destroy(outputs: *mut BtckBlockSpentOutputs);
    fn btck_transaction_spent_outputs_copy(
        outputs: *const BtckTransactionSpentOutputs,
    ) -> *mut BtckTransactionSpentOutputs;
    fn btck_transaction_spent_outputs_count(outputs: *const BtckTransactionSpentOutputs) -> usize;
    fn btck_transaction_spent_outputs_get_coin_at(
        outputs: *const BtckTransactionSpentOutputs,
        index: usize,
    ) -> *const BtckCoin;
    fn btck_transaction_spent_outputs_destroy(outputs: *mut BtckTransactionSpentOutputs);

    // Coin
    fn btck_coin_copy(coin: *const BtckCoin) -> *mut BtckCoin;
    fn btck_coin_confirmation_height(coin: *const BtckCoin) -> u32;
    fn btck_coin_is_coinbase(coin: *const BtckCoin) -> c_int;
    fn btck_coin_get_output(coin: *const BtckCoin) -> *const BtckTransactionOutput;
    fn btck_coin_destroy(coin: *mut BtckCoin);

    // Block hash
    fn btck_block_hash_create(hash: *const u8) -> *mut BtckBlockHash;
    fn btck_block_hash_copy(hash: *const BtckBlockHash) -> *mut BtckBlockHash;
    fn btck_block_hash_equals(a: *const BtckBlockHash, b: *const BtckBlockHash) -> c_int;
    fn btck_block_hash_to_bytes(hash: *const BtckBlockHash, output: *mut u8);
    fn btck_block_hash_destroy(hash: *mut BtckBlockHash);

    // Transaction
    fn btck_transaction_create(raw: *const c_void, len: usize) -> *mut BtckTransaction;
    fn btck_transaction_copy(tx: *const BtckTransaction) -> *mut BtckTransaction;
    fn btck_transaction_to_bytes(tx: *const BtckTransaction, writer: BtckWriteBytes, user_data: *mut c_void) -> c_int;
    fn btck_transaction_count_outputs(tx: *const BtckTransaction) -> usize;
    fn btck_transaction_get_output_at(tx: *const BtckTransaction, index: usize) -> *const BtckTransactionOutput;
    fn btck_transaction_count_inputs(tx: *const BtckTransaction) -> usize;
    fn btck_transaction_get_input_at(tx: *const BtckTransaction, index: usize) -> *const BtckTransactionInput;
    fn btck_transaction_get_txid(tx: *const BtckTransaction) -> *const BtckTxid;
    fn btck_transaction_destroy(tx: *mut BtckTransaction);

    // Transaction input and out point
    fn btck_transaction_input_copy(input: *const BtckTransactionInput) -> *mut BtckTransactionInput;
    fn btck_transaction_input_get_out_point(input: *const BtckTransactionInput) -> *const BtckTransactionOutPoint;
    fn btck_transaction_input_destroy(input: *mut BtckTransactionInput);
    fn btck_transaction_out_point_copy(point: *const BtckTransactionOutPoint) -> *mut BtckTransactionOutPoint;
    fn btck_transaction_out_point_get_index(point: *const BtckTransactionOutPoint) -> u32;
    fn btck_transaction_out_point_get_txid(point: *const BtckTransactionOutPoint) -> *const BtckTxid;
    fn btck_transaction_out_point_destroy(point: *mut BtckTransactionOutPoint);

    // Txid
    fn btck_txid_copy(txid: *const BtckTxid) -> *mut BtckTxid;
    fn btck_txid_equals(a: *const BtckTxid, b: *const BtckTxid) -> c_int;
    fn btck_txid_to_bytes(txid: *const BtckTxid, output: *mut u8);
    fn btck_txid_destroy(txid: *mut BtckTxid);

    // Transaction output
    fn btck_transaction_output_create(script: *const BtckScriptPubkey, amount: i64) -> *mut BtckTransactionOutput;
    fn btck_transaction_output_get_script_pubkey(output: *const BtckTransactionOutput) -> *const BtckScriptPubkey;
    fn btck_transaction_output_get_amount(output: *const BtckTransactionOutput) -> i64;
    fn btck_transaction_output_copy(output: *const BtckTransactionOutput) -> *mut BtckTransactionOutput;
    fn btck_transaction_output_destroy(output: *mut BtckTransactionOutput);

    // Script pubkey
    fn btck_script_pubkey_create(raw: *const c_void, len: usize) -> *mut BtckScriptPubkey;
    fn btck_script_pubkey_copy(script: *const BtckScriptPubkey) -> *mut BtckScriptPubkey;
    fn btck_script_pubkey_verify(
        script: *const BtckScriptPubkey,
        amount: i64,
        tx_to: *const BtckTransaction,
        spent_outputs: *const *const BtckTransactionOutput,
        spent_outputs_len: usize,
        input_index: c_uint,
        flags: u32,
        status: *mut u8,
    ) -> c_int;
    fn btck_script_pubkey_to_bytes(script: *const BtckScriptPubkey, writer: BtckWriteBytes, user_data: *mut c_void) -> c_int;
    fn btck_script_pubkey_destroy(script: *mut BtckScriptPubkey);
}

static API: OnceLock<KernelApi> = OnceLock::new();
static LOAD_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Load the library once per process.
///
/// With no explicit path the `BITCOINKERNEL_LIB` environment variable is
/// consulted, then the platform default name (`libbitcoinkernel.so`,
/// `libbitcoinkernel.dylib`, `bitcoinkernel.dll`). Once a library has been
/// loaded later calls return it regardless of `path`.
pub fn load(path: Option<&Path>) -> Result<&'static KernelApi> {
    if let Some(api) = API.get() {
        return Ok(api);
    }

    let _guard = LOAD_LOCK.lock();
    if let Some(api) = API.get() {
        return Ok(api);
    }

    let path = resolve_path(path);
    let library = unsafe { Library::new(&path) }
        .map_err(|e| Error::LibraryLoad(format!("{}: {}", path.display(), e)))?;
    let api = unsafe { KernelApi::resolve(library) }
        .map_err(|e| Error::LibraryLoad(format!("{}: {}", path.display(), e)))?;

    log::debug!("loaded libbitcoinkernel from {}", path.display());
    Ok(API.get_or_init(|| api))
}

fn resolve_path(path: Option<&Path>) -> PathBuf {
    match path {
        Some(path) => path.to_path_buf(),
        None => env::var_os(LIBRARY_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(libloading::library_filename("bitcoinkernel"))),
    }
}

/// Symbol table for constructors: loads the library on first use.
pub fn try_api() -> Result<&'static KernelApi> {
    load(None)
}

/// Symbol table for operations on live objects.
///
/// # Panics
///
/// Panics if the library was never loaded. Every native object was created
/// through [`try_api()`], so reaching this without a library is a bug.
pub fn api() -> &'static KernelApi {
    match API.get() {
        Some(api) => api,
        None => panic!("libbitcoinkernel used before it was loaded"),
    }
}

/// Check whether the shared library has been loaded.
pub fn is_loaded() -> bool {
    API.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_path(Some(Path::new("/opt/kernel/libbitcoinkernel.so")));
        assert_eq!(path, PathBuf::from("/opt/kernel/libbitcoinkernel.so"));
    }

    #[test]
    fn test_missing_library_is_reported() {
        if is_loaded() {
            return;
        }
        let err = match load(Some(Path::new("/nonexistent/libbitcoinkernel.so"))) {
            Ok(_) => panic!("loading a missing file must fail"),
            Err(err) => err,
        };
        assert!(err.is_library_load());
        assert!(err.to_string().contains("/nonexistent/libbitcoinkernel.so"));
    }
}
