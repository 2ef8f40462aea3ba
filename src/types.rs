//! Type definitions and enums shared with the C API.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use crate::ffi::{self, to_c_bool};

/// Macro to define an enum mirrored by a fixed-width native integer.
///
/// Values arriving from native code go through `from_native`, which panics
/// on anything outside the declared set.
macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $repr:ty {
            $( $(#[$vmeta:meta])* $variant:ident = $value:path, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )*
        }

        impl From<$name> for $repr {
            fn from(value: $name) -> $repr {
                match value {
                    $( $name::$variant => $value, )*
                }
            }
        }

        impl TryFrom<$repr> for $name {
            type Error = $repr;

            fn try_from(value: $repr) -> Result<Self, $repr> {
                match value {
                    $( v if v == $value => Ok($name::$variant), )*
                    other => Err(other),
                }
            }
        }

        impl $name {
            #[allow(dead_code)]
            pub(crate) fn from_native(value: $repr) -> Self {
                match Self::try_from(value) {
                    Ok(v) => v,
                    Err(v) => panic!(concat!("unknown ", stringify!($name), " value {}"), v),
                }
            }
        }
    };
}

native_enum! {
    /// Network whose consensus parameters the kernel uses.
    #[derive(Default)]
    pub enum ChainType: u8 {
        /// Bitcoin mainnet.
        #[default]
        Mainnet = ffi::BTCK_CHAIN_TYPE_MAINNET,
        /// Testnet3.
        Testnet = ffi::BTCK_CHAIN_TYPE_TESTNET,
        /// Testnet4.
        Testnet4 = ffi::BTCK_CHAIN_TYPE_TESTNET_4,
        /// Default signet.
        Signet = ffi::BTCK_CHAIN_TYPE_SIGNET,
        /// Local regression test network.
        Regtest = ffi::BTCK_CHAIN_TYPE_REGTEST,
    }
}

native_enum! {
    /// Phase of chain synchronization reported with tip notifications.
    pub enum SynchronizationState: u8 {
        /// Reindexing block files.
        InitReindex = ffi::BTCK_SYNC_INIT_REINDEX,
        /// Initial block download.
        InitDownload = ffi::BTCK_SYNC_INIT_DOWNLOAD,
        /// Caught up with the network.
        PostInit = ffi::BTCK_SYNC_POST_INIT,
    }
}

native_enum! {
    /// Conditions the kernel warns about.
    pub enum Warning: u8 {
        /// Blocks signal a soft fork this version does not know.
        UnknownNewRulesActivated = ffi::BTCK_WARNING_UNKNOWN_NEW_RULES_ACTIVATED,
        /// An invalid chain with significantly more work was seen.
        LargeWorkInvalidChain = ffi::BTCK_WARNING_LARGE_WORK_INVALID_CHAIN,
    }
}

native_enum! {
    /// Overall outcome recorded in a block validation state.
    pub enum ValidationMode: u8 {
        /// Everything ok.
        Valid = ffi::BTCK_VALIDATION_MODE_VALID,
        /// Network rule violation.
        Invalid = ffi::BTCK_VALIDATION_MODE_INVALID,
        /// Something went wrong that is not the block's fault.
        InternalError = ffi::BTCK_VALIDATION_MODE_INTERNAL_ERROR,
    }
}

native_enum! {
    /// Why a block failed validation.
    pub enum BlockValidationResult: u32 {
        /// Initial value, block has not been rejected.
        Unset = ffi::BTCK_BLOCK_VALIDATION_RESULT_UNSET,
        /// Invalid by consensus rules.
        Consensus = ffi::BTCK_BLOCK_VALIDATION_RESULT_CONSENSUS,
        /// Block was cached as invalid earlier.
        CachedInvalid = ffi::BTCK_BLOCK_VALIDATION_RESULT_CACHED_INVALID,
        /// Invalid proof of work or time too old.
        InvalidHeader = ffi::BTCK_BLOCK_VALIDATION_RESULT_INVALID_HEADER,
        /// Block data did not match the committed hashes.
        Mutated = ffi::BTCK_BLOCK_VALIDATION_RESULT_MUTATED,
        /// Previous block is not known.
        MissingPrev = ffi::BTCK_BLOCK_VALIDATION_RESULT_MISSING_PREV,
        /// Previous block is invalid.
        InvalidPrev = ffi::BTCK_BLOCK_VALIDATION_RESULT_INVALID_PREV,
        /// Timestamp is too far in the future.
        TimeFuture = ffi::BTCK_BLOCK_VALIDATION_RESULT_TIME_FUTURE,
        /// Header chain has too little work.
        HeaderLowWork = ffi::BTCK_BLOCK_VALIDATION_RESULT_HEADER_LOW_WORK,
    }
}

native_enum! {
    /// Kernel log categories.
    pub enum LogCategory: u8 {
        All = ffi::BTCK_LOG_CATEGORY_ALL,
        Bench = ffi::BTCK_LOG_CATEGORY_BENCH,
        BlockStorage = ffi::BTCK_LOG_CATEGORY_BLOCKSTORAGE,
        CoinDb = ffi::BTCK_LOG_CATEGORY_COINDB,
        LevelDb = ffi::BTCK_LOG_CATEGORY_LEVELDB,
        Mempool = ffi::BTCK_LOG_CATEGORY_MEMPOOL,
        Prune = ffi::BTCK_LOG_CATEGORY_PRUNE,
        Rand = ffi::BTCK_LOG_CATEGORY_RAND,
        Reindex = ffi::BTCK_LOG_CATEGORY_REINDEX,
        Validation = ffi::BTCK_LOG_CATEGORY_VALIDATION,
        Kernel = ffi::BTCK_LOG_CATEGORY_KERNEL,
    }
}

native_enum! {
    /// Minimum level for category-specific kernel logging.
    pub enum LogLevel: u8 {
        Trace = ffi::BTCK_LOG_LEVEL_TRACE,
        Debug = ffi::BTCK_LOG_LEVEL_DEBUG,
        Info = ffi::BTCK_LOG_LEVEL_INFO,
    }
}

/// Script verification flags.
///
/// Combine with `|`. Bits outside [`ScriptVerifyFlags::ALL`] are rejected
/// by [`ScriptPubkey::verify`](crate::ScriptPubkey::verify).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScriptVerifyFlags(u32);

impl ScriptVerifyFlags {
    /// No checks beyond the base rules.
    pub const NONE: Self = Self(ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_NONE);
    /// Evaluate P2SH subscripts (BIP16).
    pub const P2SH: Self = Self(ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_P2SH);
    /// Strict DER signatures (BIP66).
    pub const DERSIG: Self = Self(ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_DERSIG);
    /// Dummy CHECKMULTISIG argument must be empty (BIP147).
    pub const NULLDUMMY: Self = Self(ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_NULLDUMMY);
    /// OP_CHECKLOCKTIMEVERIFY (BIP65).
    pub const CHECKLOCKTIMEVERIFY: Self =
        Self(ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_CHECKLOCKTIMEVERIFY);
    /// OP_CHECKSEQUENCEVERIFY (BIP112).
    pub const CHECKSEQUENCEVERIFY: Self =
        Self(ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_CHECKSEQUENCEVERIFY);
    /// Segregated witness (BIP141, BIP143, BIP147).
    pub const WITNESS: Self = Self(ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_WITNESS);
    /// Taproot and tapscript (BIP341, BIP342).
    pub const TAPROOT: Self = Self(ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_TAPROOT);
    /// Every flag the kernel knows.
    pub const ALL: Self = Self(ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_ALL);
    /// Everything except taproot, which needs all spent outputs.
    pub const ALL_PRE_TAPROOT: Self = Self(
        ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_ALL & !ffi::BTCK_SCRIPT_VERIFICATION_FLAGS_TAPROOT,
    );

    /// Flags from raw bits, unchecked.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check that no unknown bits are set.
    pub const fn is_valid(self) -> bool {
        self.0 & !Self::ALL.0 == 0
    }
}

impl BitOr for ScriptVerifyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptVerifyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ScriptVerifyFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ScriptVerifyFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for ScriptVerifyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptVerifyFlags({:#x})", self.0)
    }
}

/// Formatting of kernel log lines, applied process-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Prefix each line with a timestamp.
    pub log_timestamps: bool,
    /// Use microsecond precision for timestamps.
    pub log_time_micros: bool,
    /// Prefix each line with the thread name.
    pub log_threadnames: bool,
    /// Prefix each line with the source file, line and function.
    pub log_sourcelocations: bool,
    /// Print `[category:level]` for every line, not just debug ones.
    pub always_print_category_levels: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_timestamps: true,
            log_time_micros: false,
            log_threadnames: false,
            log_sourcelocations: false,
            always_print_category_levels: false,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn to_native(self) -> ffi::BtckLoggingOptions {
        ffi::BtckLoggingOptions {
            log_timestamps: to_c_bool(self.log_timestamps),
            log_time_micros: to_c_bool(self.log_time_micros),
            log_threadnames: to_c_bool(self.log_threadnames),
            log_sourcelocations: to_c_bool(self.log_sourcelocations),
            always_print_category_levels: to_c_bool(self.always_print_category_levels),
        }
    }
}
