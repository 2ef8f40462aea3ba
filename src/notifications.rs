//! Kernel notifications delivered to Rust closures.
//!
//! Closures are registered in a process-wide table and the native library
//! only ever sees their integer token. The registration is dropped when the
//! kernel releases its copy of the callbacks, which happens when the last
//! context and context options holding them are destroyed.
//!
//! Notifications are delivered synchronously on kernel threads and the
//! kernel waits for each closure to return.

use std::fmt;
use std::os::raw::{c_char, c_double, c_int, c_void};
use std::sync::LazyLock;

use crate::chain::BlockTreeEntry;
use crate::ffi::{self, cast_string, from_c_bool, CallbackRegistry, Token};
use crate::types::{SynchronizationState, Warning};

type BlockTipFn = dyn Fn(SynchronizationState, BlockTreeEntry<'_>, f64) + Send + Sync;
type HeaderTipFn = dyn Fn(SynchronizationState, i64, i64, bool) + Send + Sync;
type ProgressFn = dyn Fn(&str, i32, bool) + Send + Sync;
type WarningSetFn = dyn Fn(Warning, &str) + Send + Sync;
type WarningUnsetFn = dyn Fn(Warning) + Send + Sync;
type MessageFn = dyn Fn(&str) + Send + Sync;

static REGISTRY: LazyLock<CallbackRegistry<NotificationCallbacks>> =
    LazyLock::new(|| CallbackRegistry::new("notification"));

/// Closures for kernel notifications. Unset closures are not called.
///
/// # Example
///
/// ```
/// use bitcoinkernel::NotificationCallbacks;
///
/// let callbacks = NotificationCallbacks::new()
///     .on_header_tip(|state, height, _timestamp, presync| {
///         println!("header tip {height} ({state:?}, presync: {presync})");
///     })
///     .on_fatal_error(|message| eprintln!("kernel fatal error: {message}"));
/// ```
#[derive(Default)]
pub struct NotificationCallbacks {
    block_tip: Option<Box<BlockTipFn>>,
    header_tip: Option<Box<HeaderTipFn>>,
    progress: Option<Box<ProgressFn>>,
    warning_set: Option<Box<WarningSetFn>>,
    warning_unset: Option<Box<WarningUnsetFn>>,
    flush_error: Option<Box<MessageFn>>,
    fatal_error: Option<Box<MessageFn>>,
}

impl NotificationCallbacks {
    /// Create an empty set of callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active chain tip changed. The entry is only valid during the call.
    pub fn on_block_tip<F>(mut self, f: F) -> Self
    where
        F: Fn(SynchronizationState, BlockTreeEntry<'_>, f64) + Send + Sync + 'static,
    {
        self.block_tip = Some(Box::new(f));
        self
    }

    /// A new best header was accepted: `(state, height, timestamp, presync)`.
    pub fn on_header_tip<F>(mut self, f: F) -> Self
    where
        F: Fn(SynchronizationState, i64, i64, bool) + Send + Sync + 'static,
    {
        self.header_tip = Some(Box::new(f));
        self
    }

    /// Progress of a long operation: `(title, percent, resume_possible)`.
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, i32, bool) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    /// A warning condition started.
    pub fn on_warning_set<F>(mut self, f: F) -> Self
    where
        F: Fn(Warning, &str) + Send + Sync + 'static,
    {
        self.warning_set = Some(Box::new(f));
        self
    }

    /// A warning condition ended.
    pub fn on_warning_unset<F>(mut self, f: F) -> Self
    where
        F: Fn(Warning) + Send + Sync + 'static,
    {
        self.warning_unset = Some(Box::new(f));
        self
    }

    /// Flushing state to disk failed.
    pub fn on_flush_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.flush_error = Some(Box::new(f));
        self
    }

    /// The kernel hit an unrecoverable error and should be shut down.
    pub fn on_fatal_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.fatal_error = Some(Box::new(f));
        self
    }

    /// Register the closures and build the struct handed to the kernel.
    ///
    /// The registration lives until the kernel calls `user_data_destroy`.
    pub(crate) fn into_native(self) -> ffi::BtckNotificationInterfaceCallbacks {
        let token = REGISTRY.register(self);
        ffi::BtckNotificationInterfaceCallbacks {
            user_data: token.as_user_data(),
            user_data_destroy: Some(destroy_bridge),
            block_tip: Some(block_tip_bridge),
            header_tip: Some(header_tip_bridge),
            progress: Some(progress_bridge),
            warning_set: Some(warning_set_bridge),
            warning_unset: Some(warning_unset_bridge),
            flush_error: Some(flush_error_bridge),
            fatal_error: Some(fatal_error_bridge),
        }
    }
}

impl fmt::Debug for NotificationCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCallbacks")
            .field("block_tip", &self.block_tip.is_some())
            .field("header_tip", &self.header_tip.is_some())
            .field("progress", &self.progress.is_some())
            .field("warning_set", &self.warning_set.is_some())
            .field("warning_unset", &self.warning_unset.is_some())
            .field("flush_error", &self.flush_error.is_some())
            .field("fatal_error", &self.fatal_error.is_some())
            .finish()
    }
}

unsafe extern "C" fn destroy_bridge(user_data: *mut c_void) {
    REGISTRY.unregister(Token::from_user_data(user_data));
}

unsafe extern "C" fn block_tip_bridge(
    user_data: *mut c_void,
    state: u8,
    entry: *const ffi::BtckBlockTreeEntry,
    verification_progress: c_double,
) {
    let state = SynchronizationState::from_native(state);
    let entry = BlockTreeEntry::from_ptr(entry);
    REGISTRY.dispatch(user_data, "block tip", |callbacks| {
        if let Some(f) = &callbacks.block_tip {
            f(state, entry, verification_progress)
        }
    });
}

unsafe extern "C" fn header_tip_bridge(
    user_data: *mut c_void,
    state: u8,
    height: i64,
    timestamp: i64,
    presync: c_int,
) {
    let state = SynchronizationState::from_native(state);
    REGISTRY.dispatch(user_data, "header tip", |callbacks| {
        if let Some(f) = &callbacks.header_tip {
            f(state, height, timestamp, from_c_bool(presync))
        }
    });
}

unsafe extern "C" fn progress_bridge(
    user_data: *mut c_void,
    title: *const c_char,
    title_len: usize,
    progress_percent: c_int,
    resume_possible: c_int,
) {
    REGISTRY.dispatch(user_data, "progress", |callbacks| {
        if let Some(f) = &callbacks.progress {
            let title = cast_string(title, title_len);
            f(&title, progress_percent, from_c_bool(resume_possible))
        }
    });
}

unsafe extern "C" fn warning_set_bridge(
    user_data: *mut c_void,
    warning: u8,
    message: *const c_char,
    message_len: usize,
) {
    let warning = Warning::from_native(warning);
    REGISTRY.dispatch(user_data, "warning set", |callbacks| {
        if let Some(f) = &callbacks.warning_set {
            let message = cast_string(message, message_len);
            f(warning, &message)
        }
    });
}

unsafe extern "C" fn warning_unset_bridge(user_data: *mut c_void, warning: u8) {
    let warning = Warning::from_native(warning);
    REGISTRY.dispatch(user_data, "warning unset", |callbacks| {
        if let Some(f) = &callbacks.warning_unset {
            f(warning)
        }
    });
}

unsafe extern "C" fn flush_error_bridge(user_data: *mut c_void, message: *const c_char, message_len: usize) {
    REGISTRY.dispatch(user_data, "flush error", |callbacks| {
        if let Some(f) = &callbacks.flush_error {
            f(&cast_string(message, message_len))
        }
    });
}

unsafe extern "C" fn fatal_error_bridge(user_data: *mut c_void, message: *const c_char, message_len: usize) {
    log::error!("kernel reported a fatal error: {}", cast_string(message, message_len));
    REGISTRY.dispatch(user_data, "fatal error", |callbacks| {
        if let Some(f) = &callbacks.fatal_error {
            f(&cast_string(message, message_len))
        }
    });
}

#[cfg(test)]
mod tests {
    use std::ptr::NonNull;
    use std::sync::{Arc, Mutex};

    use super::*;

    fn text(s: &str) -> (*const c_char, usize) {
        (s.as_ptr() as *const c_char, s.len())
    }

    #[test]
    fn test_header_tips_delivered_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let native = NotificationCallbacks::new()
            .on_header_tip(move |state, height, timestamp, presync| {
                sink.lock().unwrap().push((state, height, timestamp, presync));
            })
            .into_native();

        let header_tip = native.header_tip.unwrap();
        for height in 0..10i64 {
            unsafe { header_tip(native.user_data, 1, height, 1_231_006_505 + height, (height % 2) as c_int) };
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 10);
        for (i, (state, height, timestamp, presync)) in seen.iter().enumerate() {
            assert_eq!(*state, SynchronizationState::InitDownload);
            assert_eq!(*height, i as i64);
            assert_eq!(*timestamp, 1_231_006_505 + i as i64);
            assert_eq!(*presync, i % 2 == 1);
        }

        unsafe { native.user_data_destroy.unwrap()(native.user_data) };
    }

    #[test]
    fn test_destroy_unregisters() {
        let native = NotificationCallbacks::new().into_native();
        let token = Token::from_user_data(native.user_data);
        assert!(REGISTRY.contains(token));

        unsafe { native.user_data_destroy.unwrap()(native.user_data) };
        assert!(!REGISTRY.contains(token));
    }

    #[test]
    fn test_string_payloads() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (progress_sink, warning_sink, flush_sink) = (seen.clone(), seen.clone(), seen.clone());
        let native = NotificationCallbacks::new()
            .on_progress(move |title, percent, resume| {
                progress_sink.lock().unwrap().push(format!("{title} {percent} {resume}"));
            })
            .on_warning_set(move |warning, message| {
                warning_sink.lock().unwrap().push(format!("{warning:?}: {message}"));
            })
            .on_flush_error(move |message| {
                flush_sink.lock().unwrap().push(format!("flush: {message}"));
            })
            .into_native();

        unsafe {
            let (ptr, len) = text("Verifying blocks");
            native.progress.unwrap()(native.user_data, ptr, len, 42, 1);
            let (ptr, len) = text("unknown rules");
            native.warning_set.unwrap()(native.user_data, 0, ptr, len);
            let (ptr, len) = text("disk full");
            native.flush_error.unwrap()(native.user_data, ptr, len);
        }

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "Verifying blocks 42 true".to_string(),
                "UnknownNewRulesActivated: unknown rules".to_string(),
                "flush: disk full".to_string(),
            ]
        );

        unsafe { native.user_data_destroy.unwrap()(native.user_data) };
    }

    #[test]
    fn test_block_tip_state_and_progress() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let native = NotificationCallbacks::new()
            .on_block_tip(move |state, _entry, progress| {
                *sink.lock().unwrap() = Some((state, progress));
            })
            .into_native();

        let entry = NonNull::<ffi::BtckBlockTreeEntry>::dangling().as_ptr();
        unsafe { native.block_tip.unwrap()(native.user_data, 2, entry, 0.5) };
        assert_eq!(
            *seen.lock().unwrap(),
            Some((SynchronizationState::PostInit, 0.5))
        );

        unsafe { native.user_data_destroy.unwrap()(native.user_data) };
    }

    #[test]
    fn test_unset_callbacks_are_skipped() {
        let native = NotificationCallbacks::new().into_native();
        unsafe {
            native.warning_unset.unwrap()(native.user_data, 1);
            native.header_tip.unwrap()(native.user_data, 0, 1, 2, 0);
            native.user_data_destroy.unwrap()(native.user_data);
        }
    }

    #[test]
    fn test_panicking_callback_is_contained() {
        let native = NotificationCallbacks::new()
            .on_warning_unset(|_| panic!("callback bug"))
            .into_native();
        unsafe {
            native.warning_unset.unwrap()(native.user_data, 0);
            native.user_data_destroy.unwrap()(native.user_data);
        }
    }
}
