//! Raw C types for libbitcoinkernel.
//!
//! This module mirrors the layout of the `btck_*` C API: opaque object
//! types, enum constants, callback signatures and the callback structs.
//! Users should prefer the safe Rust wrappers in the parent modules.

use std::os::raw::{c_char, c_double, c_int, c_void};

/// Macro to define an opaque C object type.
macro_rules! opaque {
    ($($name:ident),* $(,)?) => {
        $(
            /// Opaque native object, only ever used behind a pointer.
            #[repr(C)]
            pub struct $name {
                _data: [u8; 0],
                _marker: core::marker::PhantomData<(*mut u8, core::marker::PhantomPinned)>,
            }
        )*
    };
}

opaque!(
    BtckBlock,
    BtckBlockHash,
    BtckBlockSpentOutputs,
    BtckBlockTreeEntry,
    BtckBlockValidationState,
    BtckChain,
    BtckChainParameters,
    BtckChainstateManager,
    BtckChainstateManagerOptions,
    BtckCoin,
    BtckContext,
    BtckContextOptions,
    BtckLoggingConnection,
    BtckScriptPubkey,
    BtckTransaction,
    BtckTransactionInput,
    BtckTransactionOutPoint,
    BtckTransactionOutput,
    BtckTransactionSpentOutputs,
    BtckTxid,
);

// Chain types
pub const BTCK_CHAIN_TYPE_MAINNET: u8 = 0;
pub const BTCK_CHAIN_TYPE_TESTNET: u8 = 1;
pub const BTCK_CHAIN_TYPE_TESTNET_4: u8 = 2;
pub const BTCK_CHAIN_TYPE_SIGNET: u8 = 3;
pub const BTCK_CHAIN_TYPE_REGTEST: u8 = 4;

// Synchronization states
pub const BTCK_SYNC_INIT_REINDEX: u8 = 0;
pub const BTCK_SYNC_INIT_DOWNLOAD: u8 = 1;
pub const BTCK_SYNC_POST_INIT: u8 = 2;

// Warnings
pub const BTCK_WARNING_UNKNOWN_NEW_RULES_ACTIVATED: u8 = 0;
pub const BTCK_WARNING_LARGE_WORK_INVALID_CHAIN: u8 = 1;

// Validation modes
pub const BTCK_VALIDATION_MODE_VALID: u8 = 0;
pub const BTCK_VALIDATION_MODE_INVALID: u8 = 1;
pub const BTCK_VALIDATION_MODE_INTERNAL_ERROR: u8 = 2;

// Block validation results
pub const BTCK_BLOCK_VALIDATION_RESULT_UNSET: u32 = 0;
pub const BTCK_BLOCK_VALIDATION_RESULT_CONSENSUS: u32 = 1;
pub const BTCK_BLOCK_VALIDATION_RESULT_CACHED_INVALID: u32 = 2;
pub const BTCK_BLOCK_VALIDATION_RESULT_INVALID_HEADER: u32 = 3;
pub const BTCK_BLOCK_VALIDATION_RESULT_MUTATED: u32 = 4;
pub const BTCK_BLOCK_VALIDATION_RESULT_MISSING_PREV: u32 = 5;
pub const BTCK_BLOCK_VALIDATION_RESULT_INVALID_PREV: u32 = 6;
pub const BTCK_BLOCK_VALIDATION_RESULT_TIME_FUTURE: u32 = 7;
pub const BTCK_BLOCK_VALIDATION_RESULT_HEADER_LOW_WORK: u32 = 8;

// Log categories
pub const BTCK_LOG_CATEGORY_ALL: u8 = 0;
pub const BTCK_LOG_CATEGORY_BENCH: u8 = 1;
pub const BTCK_LOG_CATEGORY_BLOCKSTORAGE: u8 = 2;
pub const BTCK_LOG_CATEGORY_COINDB: u8 = 3;
pub const BTCK_LOG_CATEGORY_LEVELDB: u8 = 4;
pub const BTCK_LOG_CATEGORY_MEMPOOL: u8 = 5;
pub const BTCK_LOG_CATEGORY_PRUNE: u8 = 6;
pub const BTCK_LOG_CATEGORY_RAND: u8 = 7;
pub const BTCK_LOG_CATEGORY_REINDEX: u8 = 8;
pub const BTCK_LOG_CATEGORY_VALIDATION: u8 = 9;
pub const BTCK_LOG_CATEGORY_KERNEL: u8 = 10;

// Log levels
pub const BTCK_LOG_LEVEL_TRACE: u8 = 0;
pub const BTCK_LOG_LEVEL_DEBUG: u8 = 1;
pub const BTCK_LOG_LEVEL_INFO: u8 = 2;

// Script verification status
pub const BTCK_SCRIPT_VERIFY_STATUS_OK: u8 = 0;
pub const BTCK_SCRIPT_VERIFY_STATUS_ERROR_INVALID_FLAGS_COMBINATION: u8 = 1;
pub const BTCK_SCRIPT_VERIFY_STATUS_ERROR_SPENT_OUTPUTS_REQUIRED: u8 = 2;

// Script verification flags
pub const BTCK_SCRIPT_VERIFICATION_FLAGS_NONE: u32 = 0;
pub const BTCK_SCRIPT_VERIFICATION_FLAGS_P2SH: u32 = 1 << 0;
pub const BTCK_SCRIPT_VERIFICATION_FLAGS_DERSIG: u32 = 1 << 2;
pub const BTCK_SCRIPT_VERIFICATION_FLAGS_NULLDUMMY: u32 = 1 << 4;
pub const BTCK_SCRIPT_VERIFICATION_FLAGS_CHECKLOCKTIMEVERIFY: u32 = 1 << 9;
pub const BTCK_SCRIPT_VERIFICATION_FLAGS_CHECKSEQUENCEVERIFY: u32 = 1 << 10;
pub const BTCK_SCRIPT_VERIFICATION_FLAGS_WITNESS: u32 = 1 << 11;
pub const BTCK_SCRIPT_VERIFICATION_FLAGS_TAPROOT: u32 = 1 << 17;
pub const BTCK_SCRIPT_VERIFICATION_FLAGS_ALL: u32 = BTCK_SCRIPT_VERIFICATION_FLAGS_P2SH
    | BTCK_SCRIPT_VERIFICATION_FLAGS_DERSIG
    | BTCK_SCRIPT_VERIFICATION_FLAGS_NULLDUMMY
    | BTCK_SCRIPT_VERIFICATION_FLAGS_CHECKLOCKTIMEVERIFY
    | BTCK_SCRIPT_VERIFICATION_FLAGS_CHECKSEQUENCEVERIFY
    | BTCK_SCRIPT_VERIFICATION_FLAGS_WITNESS
    | BTCK_SCRIPT_VERIFICATION_FLAGS_TAPROOT;

/// Push callback used by every `*_to_bytes` function. Returns 0 on success.
pub type BtckWriteBytes =
    Option<unsafe extern "C" fn(bytes: *const c_void, size: usize, user_data: *mut c_void) -> c_int>;

/// Called exactly once when the native side drops its reference to `user_data`.
pub type BtckDestroyCallback = Option<unsafe extern "C" fn(user_data: *mut c_void)>;

pub type BtckLogCallback =
    Option<unsafe extern "C" fn(user_data: *mut c_void, message: *const c_char, len: usize)>;

pub type BtckNotifyBlockTip = Option<
    unsafe extern "C" fn(
        user_data: *mut c_void,
        state: u8,
        entry: *const BtckBlockTreeEntry,
        verification_progress: c_double,
    ),
>;
pub type BtckNotifyHeaderTip = Option<
    unsafe extern "C" fn(user_data: *mut c_void, state: u8, height: i64, timestamp: i64, presync: c_int),
>;
pub type BtckNotifyProgress = Option<
    unsafe extern "C" fn(
        user_data: *mut c_void,
        title: *const c_char,
        title_len: usize,
        progress_percent: c_int,
        resume_possible: c_int,
    ),
>;
pub type BtckNotifyWarningSet = Option<
    unsafe extern "C" fn(user_data: *mut c_void, warning: u8, message: *const c_char, len: usize),
>;
pub type BtckNotifyWarningUnset = Option<unsafe extern "C" fn(user_data: *mut c_void, warning: u8)>;
pub type BtckNotifyFlushError =
    Option<unsafe extern "C" fn(user_data: *mut c_void, message: *const c_char, len: usize)>;
pub type BtckNotifyFatalError =
    Option<unsafe extern "C" fn(user_data: *mut c_void, message: *const c_char, len: usize)>;

pub type BtckBlockChecked = Option<
    unsafe extern "C" fn(
        user_data: *mut c_void,
        block: *mut BtckBlock,
        state: *const BtckBlockValidationState,
    ),
>;
/// Shared signature of pow-valid-block, block-connected and block-disconnected.
pub type BtckBlockEntryEvent = Option<
    unsafe extern "C" fn(user_data: *mut c_void, block: *mut BtckBlock, entry: *const BtckBlockTreeEntry),
>;

/// Notification callbacks registered on the context options.
#[repr(C)]
pub struct BtckNotificationInterfaceCallbacks {
    pub user_data: *mut c_void,
    pub user_data_destroy: BtckDestroyCallback,
    pub block_tip: BtckNotifyBlockTip,
    pub header_tip: BtckNotifyHeaderTip,
    pub progress: BtckNotifyProgress,
    pub warning_set: BtckNotifyWarningSet,
    pub warning_unset: BtckNotifyWarningUnset,
    pub flush_error: BtckNotifyFlushError,
    pub fatal_error: BtckNotifyFatalError,
}

/// Validation interface callbacks registered on the context options.
#[repr(C)]
pub struct BtckValidationInterfaceCallbacks {
    pub user_data: *mut c_void,
    pub user_data_destroy: BtckDestroyCallback,
    pub block_checked: BtckBlockChecked,
    pub pow_valid_block: BtckBlockEntryEvent,
    pub block_connected: BtckBlockEntryEvent,
    pub block_disconnected: BtckBlockEntryEvent,
}

/// Global formatting options for kernel log lines.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct BtckLoggingOptions {
    pub log_timestamps: c_int,
    pub log_time_micros: c_int,
    pub log_threadnames: c_int,
    pub log_sourcelocations: c_int,
    pub always_print_category_levels: c_int,
}
