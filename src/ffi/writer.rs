//! Collecting bytes pushed through the native write callback.
//!
//! Serialization functions take a `btck_WriteBytes` callback and an opaque
//! pointer and push the encoding in one or more chunks. The accumulator
//! lives on the caller's stack for exactly one native call.

use std::os::raw::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};

use super::raw::BtckWriteBytes;
use crate::error::{Error, Result};

#[derive(Default)]
struct Sink {
    bytes: Vec<u8>,
    failed: bool,
}

unsafe extern "C" fn write_bytes(bytes: *const c_void, len: usize, user_data: *mut c_void) -> c_int {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let sink = &mut *(user_data as *mut Sink);
        if len == 0 {
            return true;
        }
        if bytes.is_null() {
            log::error!("write callback received null data for {} bytes", len);
            sink.failed = true;
            return false;
        }
        sink.bytes.extend_from_slice(std::slice::from_raw_parts(bytes as *const u8, len));
        true
    }));
    match result {
        Ok(true) => 0,
        Ok(false) => -1,
        Err(_) => {
            log::error!("write callback panicked, aborting serialization");
            -1
        }
    }
}

/// Run a native serialization call and return everything it wrote.
///
/// `call` receives the write callback and its user data pointer and returns
/// the native status. A non-zero status, or a chunk the callback rejected,
/// discards the partial output.
pub fn collect<F>(what: &'static str, call: F) -> Result<Vec<u8>>
where
    F: FnOnce(BtckWriteBytes, *mut c_void) -> c_int,
{
    let mut sink = Sink::default();
    let status = call(Some(write_bytes), &mut sink as *mut Sink as *mut c_void);
    if status != 0 || sink.failed {
        return Err(Error::Serialization(what));
    }
    Ok(sink.bytes)
}
