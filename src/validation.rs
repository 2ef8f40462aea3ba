//! Validation interface callbacks.
//!
//! The kernel invokes these synchronously from validation; a slow closure
//! stalls block processing. Blocks handed to a closure are owned by it and
//! may be kept; entries and states are only valid during the call.

use std::fmt;
use std::os::raw::c_void;
use std::sync::LazyLock;

use crate::block::Block;
use crate::chain::BlockTreeEntry;
use crate::ffi::{self, kinds, CallbackRegistry, Token, View};
use crate::types::{BlockValidationResult, ValidationMode};

type BlockCheckedFn = dyn Fn(Block, BlockValidationState<'_>) + Send + Sync;
type BlockEntryFn = dyn Fn(Block, BlockTreeEntry<'_>) + Send + Sync;

static REGISTRY: LazyLock<CallbackRegistry<ValidationCallbacks>> =
    LazyLock::new(|| CallbackRegistry::new("validation"));

/// Outcome of validating a block, passed to the block-checked callback.
#[derive(Clone, Copy)]
pub struct BlockValidationState<'a> {
    inner: View<'a, kinds::BlockValidationState>,
}

impl BlockValidationState<'_> {
    pub(crate) unsafe fn from_ptr(ptr: *const ffi::BtckBlockValidationState) -> Self {
        Self {
            inner: View::new(ptr),
        }
    }

    /// Whether the block was valid, invalid, or hit an internal error.
    pub fn mode(&self) -> ValidationMode {
        ValidationMode::from_native(unsafe {
            ffi::api().btck_block_validation_state_get_validation_mode(self.inner.as_ptr())
        })
    }

    /// Reason for rejection, [`BlockValidationResult::Unset`] for valid blocks.
    pub fn result(&self) -> BlockValidationResult {
        BlockValidationResult::from_native(unsafe {
            ffi::api().btck_block_validation_state_get_block_validation_result(self.inner.as_ptr())
        })
    }
}

impl fmt::Debug for BlockValidationState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockValidationState")
            .field("mode", &self.mode())
            .field("result", &self.result())
            .finish()
    }
}

/// Closures for validation events. Unset closures are not called.
///
/// # Example
///
/// ```
/// use bitcoinkernel::{ValidationCallbacks, ValidationMode};
///
/// let callbacks = ValidationCallbacks::new().on_block_checked(|block, state| {
///     if state.mode() != ValidationMode::Valid {
///         eprintln!("rejected block: {:?}", state.result());
///     }
///     drop(block);
/// });
/// ```
#[derive(Default)]
pub struct ValidationCallbacks {
    block_checked: Option<Box<BlockCheckedFn>>,
    pow_valid_block: Option<Box<BlockEntryFn>>,
    block_connected: Option<Box<BlockEntryFn>>,
    block_disconnected: Option<Box<BlockEntryFn>>,
}

impl ValidationCallbacks {
    /// Create an empty set of callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// A block finished validation.
    pub fn on_block_checked<F>(mut self, f: F) -> Self
    where
        F: Fn(Block, BlockValidationState<'_>) + Send + Sync + 'static,
    {
        self.block_checked = Some(Box::new(f));
        self
    }

    /// A block with valid proof of work extends the best header chain.
    pub fn on_pow_valid_block<F>(mut self, f: F) -> Self
    where
        F: Fn(Block, BlockTreeEntry<'_>) + Send + Sync + 'static,
    {
        self.pow_valid_block = Some(Box::new(f));
        self
    }

    /// A block was connected to the active chain.
    pub fn on_block_connected<F>(mut self, f: F) -> Self
    where
        F: Fn(Block, BlockTreeEntry<'_>) + Send + Sync + 'static,
    {
        self.block_connected = Some(Box::new(f));
        self
    }

    /// A block was disconnected from the active chain during a reorg.
    pub fn on_block_disconnected<F>(mut self, f: F) -> Self
    where
        F: Fn(Block, BlockTreeEntry<'_>) + Send + Sync + 'static,
    {
        self.block_disconnected = Some(Box::new(f));
        self
    }

    pub(crate) fn into_native(self) -> ffi::BtckValidationInterfaceCallbacks {
        let token = REGISTRY.register(self);
        ffi::BtckValidationInterfaceCallbacks {
            user_data: token.as_user_data(),
            user_data_destroy: Some(destroy_bridge),
            block_checked: Some(block_checked_bridge),
            pow_valid_block: Some(pow_valid_block_bridge),
            block_connected: Some(block_connected_bridge),
            block_disconnected: Some(block_disconnected_bridge),
        }
    }
}

impl fmt::Debug for ValidationCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationCallbacks")
            .field("block_checked", &self.block_checked.is_some())
            .field("pow_valid_block", &self.pow_valid_block.is_some())
            .field("block_connected", &self.block_connected.is_some())
            .field("block_disconnected", &self.block_disconnected.is_some())
            .finish()
    }
}

unsafe extern "C" fn destroy_bridge(user_data: *mut c_void) {
    REGISTRY.unregister(Token::from_user_data(user_data));
}

unsafe extern "C" fn block_checked_bridge(
    user_data: *mut c_void,
    block: *mut ffi::BtckBlock,
    state: *const ffi::BtckBlockValidationState,
) {
    // Released on drop when no closure takes it.
    let block = Block::from_owned(block);
    let state = BlockValidationState::from_ptr(state);
    REGISTRY.dispatch(user_data, "block checked", move |callbacks| {
        if let Some(f) = &callbacks.block_checked {
            f(block, state)
        }
    });
}

/// Shared body of the three `(block, entry)` events.
unsafe fn dispatch_block_entry(
    user_data: *mut c_void,
    block: *mut ffi::BtckBlock,
    entry: *const ffi::BtckBlockTreeEntry,
    event: &'static str,
    select: fn(&ValidationCallbacks) -> Option<&BlockEntryFn>,
) {
    let block = Block::from_owned(block);
    let entry = BlockTreeEntry::from_ptr(entry);
    REGISTRY.dispatch(user_data, event, move |callbacks| {
        if let Some(f) = select(callbacks) {
            f(block, entry)
        }
    });
}

unsafe extern "C" fn pow_valid_block_bridge(
    user_data: *mut c_void,
    block: *mut ffi::BtckBlock,
    entry: *const ffi::BtckBlockTreeEntry,
) {
    dispatch_block_entry(user_data, block, entry, "pow valid block", |c| {
        c.pow_valid_block.as_deref()
    });
}

unsafe extern "C" fn block_connected_bridge(
    user_data: *mut c_void,
    block: *mut ffi::BtckBlock,
    entry: *const ffi::BtckBlockTreeEntry,
) {
    dispatch_block_entry(user_data, block, entry, "block connected", |c| {
        c.block_connected.as_deref()
    });
}

unsafe extern "C" fn block_disconnected_bridge(
    user_data: *mut c_void,
    block: *mut ffi::BtckBlock,
    entry: *const ffi::BtckBlockTreeEntry,
) {
    dispatch_block_entry(user_data, block, entry, "block disconnected", |c| {
        c.block_disconnected.as_deref()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroy_unregisters() {
        let native = ValidationCallbacks::new()
            .on_block_connected(|_, _| {})
            .into_native();
        let token = Token::from_user_data(native.user_data);
        assert!(REGISTRY.contains(token));
        assert!(native.block_checked.is_some());

        unsafe { native.user_data_destroy.unwrap()(native.user_data) };
        assert!(!REGISTRY.contains(token));
    }

    #[test]
    fn test_debug_lists_set_callbacks() {
        let callbacks = ValidationCallbacks::new().on_block_checked(|_, _| {});
        let s = format!("{:?}", callbacks);
        assert!(s.contains("block_checked: true"));
        assert!(s.contains("block_connected: false"));
    }
}
