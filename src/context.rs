//! Kernel context and its configuration.

use crate::error::Result;
use crate::ffi::{self, check_status, kinds, Owned, Shared};
use crate::notifications::NotificationCallbacks;
use crate::types::ChainType;
use crate::validation::ValidationCallbacks;

/// Consensus parameters for one network.
#[derive(Clone)]
pub struct ChainParameters {
    inner: Shared<kinds::ChainParameters>,
}

impl ChainParameters {
    /// Create chain parameters for `chain_type`.
    pub fn new(chain_type: ChainType) -> Result<Self> {
        let api = ffi::try_api()?;
        let inner = unsafe {
            Shared::from_constructor(api.btck_chain_parameters_create(chain_type.into()))?
        };
        Ok(Self { inner })
    }
}

unsafe impl Send for ChainParameters {}
unsafe impl Sync for ChainParameters {}

/// Options for creating a [`Context`].
///
/// With nothing set the context is configured for mainnet without any
/// callbacks. The options may be dropped once the context exists.
///
/// # Example
///
/// ```no_run
/// use bitcoinkernel::{ChainParameters, ChainType, Context, ContextOptions, NotificationCallbacks};
///
/// let mut options = ContextOptions::new()?;
/// options.set_chain_params(&ChainParameters::new(ChainType::Regtest)?);
/// options.set_notifications(
///     NotificationCallbacks::new().on_progress(|title, percent, _| println!("{title}: {percent}%")),
/// );
/// let context = Context::new(Some(&options))?;
/// # Ok::<(), bitcoinkernel::Error>(())
/// ```
pub struct ContextOptions {
    inner: Owned<kinds::ContextOptions>,
}

impl ContextOptions {
    /// Create empty context options.
    pub fn new() -> Result<Self> {
        let api = ffi::try_api()?;
        let inner = unsafe { Owned::from_constructor(api.btck_context_options_create())? };
        Ok(Self { inner })
    }

    /// Configure the network. The parameters are copied.
    pub fn set_chain_params(&mut self, params: &ChainParameters) {
        unsafe {
            ffi::api().btck_context_options_set_chainparams(self.inner.as_ptr(), params.inner.as_ptr())
        }
    }

    /// Install notification callbacks, replacing any set before.
    ///
    /// The callbacks run on kernel threads and block the kernel while
    /// they run; keep them short.
    pub fn set_notifications(&mut self, callbacks: NotificationCallbacks) {
        let native = callbacks.into_native();
        unsafe { ffi::api().btck_context_options_set_notifications(self.inner.as_ptr(), native) }
    }

    /// Install validation interface callbacks, replacing any set before.
    ///
    /// Validation waits for every callback to return.
    pub fn set_validation_interface(&mut self, callbacks: ValidationCallbacks) {
        let native = callbacks.into_native();
        unsafe {
            ffi::api().btck_context_options_set_validation_interface(self.inner.as_ptr(), native)
        }
    }

    pub(crate) fn as_ptr(&self) -> *const ffi::BtckContextOptions {
        self.inner.as_ptr()
    }
}

unsafe impl Send for ContextOptions {}
unsafe impl Sync for ContextOptions {}

/// The kernel's logically global state.
///
/// Cloning takes another native reference; objects created from a context
/// keep their own clone, so dropping this one early is fine.
#[derive(Clone)]
pub struct Context {
    inner: Shared<kinds::Context>,
}

impl Context {
    /// Create a context. `None` uses mainnet without callbacks.
    pub fn new(options: Option<&ContextOptions>) -> Result<Self> {
        let api = ffi::try_api()?;
        let defaults;
        let options = match options {
            Some(options) => options,
            None => {
                defaults = ContextOptions::new()?;
                &defaults
            }
        };

        let inner = unsafe { Shared::from_constructor(api.btck_context_create(options.as_ptr()))? };
        log::debug!("created kernel context");
        Ok(Self { inner })
    }

    /// Ask long-running operations such as block import to stop.
    ///
    /// Returns as soon as the request is recorded; it does not wait for
    /// anything to actually stop.
    pub fn interrupt(&self) -> Result<()> {
        let code = unsafe { ffi::api().btck_context_interrupt(self.inner.as_ptr()) };
        check_status(code, "context interrupt")
    }

    pub(crate) fn as_ptr(&self) -> *const ffi::BtckContext {
        self.inner.as_ptr()
    }
}

unsafe impl Send for Context {}
unsafe impl Sync for Context {}
