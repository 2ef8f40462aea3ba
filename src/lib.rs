//! Safe Rust bindings for libbitcoinkernel.
//!
//! The kernel library exposes Bitcoin Core's validation engine through a C
//! API. This crate loads that library at runtime and wraps its objects so
//! that each native object is released exactly once, borrowed objects cannot
//! outlive their owner, and callbacks into Rust never receive dangling
//! pointers.
//!
//! # Example
//!
//! ```no_run
//! use bitcoinkernel::prelude::*;
//! use bitcoinkernel::{
//!     Block, ChainParameters, ChainType, ChainstateManager, ChainstateManagerOptions, Context,
//!     ContextOptions, NotificationCallbacks,
//! };
//!
//! fn main() -> bitcoinkernel::Result<()> {
//!     // Load libbitcoinkernel (BITCOINKERNEL_LIB or the loader path)
//!     bitcoinkernel::init()?;
//!
//!     let mut options = ContextOptions::new()?;
//!     options.set_chain_params(&ChainParameters::new(ChainType::Regtest)?);
//!     options.set_notifications(
//!         NotificationCallbacks::new().on_block_tip(|_state, entry, _progress| {
//!             println!("new tip at height {}", entry.height());
//!         }),
//!     );
//!     let context = Context::new(Some(&options))?;
//!
//!     let chainman_options = ChainstateManagerOptions::new(&context, "/tmp/regtest", "/tmp/regtest/blocks")?;
//!     let chainman = ChainstateManager::new(&chainman_options)?;
//!
//!     let block = Block::new(&std::fs::read("block.bin").unwrap_or_default())?;
//!     for tx in block.transactions() {
//!         println!("{} with {} inputs", tx.txid(), tx.input_count());
//!     }
//!     chainman.process_block(&block);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Loading the library
//!
//! Nothing is linked at build time. Constructors load the library on first
//! use from the path in `BITCOINKERNEL_LIB`, falling back to the platform
//! loader (`libbitcoinkernel.so`, `libbitcoinkernel.dylib` or
//! `bitcoinkernel.dll`). Call [`init`] or [`init_from`] to load it up front
//! and see loading errors early.
//!
//! # Handles and views
//!
//! Most types come in pairs: an owned handle such as [`Transaction`] and a
//! borrowed view such as [`TransactionRef`] tied to the lifetime of the
//! object it was read from. Accessors live on extension traits implemented
//! for both, which [`prelude`] brings into scope. A view is promoted to an
//! owned handle with `copy()`.

pub mod block;
pub mod chain;
pub mod chainstate;
pub mod coins;
pub mod context;
pub mod error;
mod ffi;
pub mod logging;
pub mod notifications;
pub mod script;
pub mod transaction;
pub mod types;
pub mod validation;

use std::path::Path;

// Re-export main types at the crate root
pub use block::{Block, BlockHash, BlockHashExt, BlockHashRef};
pub use chain::{BlockTreeEntry, Chain, ChainIter};
pub use chainstate::{ChainstateManager, ChainstateManagerOptions, ProcessBlockResult};
pub use coins::{
    BlockSpentOutputs, Coin, CoinExt, CoinRef, TransactionSpentOutputs, TransactionSpentOutputsExt,
    TransactionSpentOutputsRef,
};
pub use context::{ChainParameters, Context, ContextOptions};
pub use error::{Error, Result, ScriptVerifyError};
pub use logging::{
    disable_log_category, disable_logging, enable_log_category, set_log_level, set_logging_options,
    LogEntry, LogParser, LoggingConnection, KERNEL_LOG_TARGET,
};
pub use notifications::NotificationCallbacks;
pub use script::{ScriptPubkey, ScriptPubkeyExt, ScriptPubkeyRef};
pub use transaction::{
    Transaction, TransactionExt, TransactionInput, TransactionInputExt, TransactionInputRef,
    TransactionOutPoint, TransactionOutPointExt, TransactionOutPointRef, TransactionOutput,
    TransactionOutputExt, TransactionOutputRef, TransactionRef, Txid, TxidExt, TxidRef,
};
pub use types::{
    BlockValidationResult, ChainType, LogCategory, LogLevel, LoggingOptions, ScriptVerifyFlags,
    SynchronizationState, ValidationMode, Warning,
};
pub use validation::{BlockValidationState, ValidationCallbacks};

/// Accessor traits for owned handles and views.
pub mod prelude {
    pub use crate::block::BlockHashExt;
    pub use crate::coins::{CoinExt, TransactionSpentOutputsExt};
    pub use crate::script::ScriptPubkeyExt;
    pub use crate::transaction::{
        TransactionExt, TransactionInputExt, TransactionOutPointExt, TransactionOutputExt, TxidExt,
    };
}

/// Environment variable naming the shared library to load.
pub const LIBRARY_ENV: &str = ffi::loader::LIBRARY_ENV;

/// Load the kernel library from `BITCOINKERNEL_LIB` or the loader path.
///
/// Safe to call multiple times. Constructors call this implicitly.
pub fn init() -> Result<()> {
    ffi::loader::load(None).map(|_| ())
}

/// Load the kernel library from `path`.
///
/// Has no effect if a library was already loaded.
pub fn init_from(path: impl AsRef<Path>) -> Result<()> {
    ffi::loader::load(Some(path.as_ref())).map(|_| ())
}

/// Check whether the kernel library has been loaded.
pub fn is_initialized() -> bool {
    ffi::loader::is_loaded()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_reported() {
        if is_initialized() {
            return;
        }
        let err = init_from("/nonexistent/libbitcoinkernel.so").unwrap_err();
        assert!(err.is_library_load());
        assert!(!is_initialized());
    }

    #[test]
    fn test_library_env_name() {
        assert_eq!(LIBRARY_ENV, "BITCOINKERNEL_LIB");
    }
}
