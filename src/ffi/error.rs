//! Conversion helpers for values crossing the C boundary.

use std::os::raw::{c_char, c_int};

use crate::error::{Error, Result};

/// Status code returned by native functions on success.
pub const BTCK_OK: c_int = 0;

/// Check a native status code and convert to Result.
pub fn check_status(code: c_int, operation: &str) -> Result<()> {
    if code == BTCK_OK {
        Ok(())
    } else {
        Err(Error::Internal(format!(
            "{} failed with status {}",
            operation, code
        )))
    }
}

/// Range check for indexed accessors, done before calling into native code.
pub fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(Error::IndexOutOfBounds { index, len });
    }
    Ok(())
}

/// Map a null pointer from a byte-parsing constructor to an input error.
pub fn check_parsed<T>(ptr: *mut T, what: &'static str) -> Result<*mut T> {
    if ptr.is_null() {
        return Err(Error::InvalidInput(what));
    }
    Ok(ptr)
}

/// Copy a `(pointer, length)` string into an owned String.
///
/// Invalid UTF-8 is replaced rather than rejected; kernel messages are
/// informational.
///
/// # Safety
///
/// `ptr` must be valid for `len` bytes, or null with any length.
pub unsafe fn cast_string(ptr: *const c_char, len: usize) -> String {
    if ptr.is_null() || len == 0 {
        return String::new();
    }
    let bytes = std::slice::from_raw_parts(ptr as *const u8, len);
    String::from_utf8_lossy(bytes).into_owned()
}

#[inline]
pub fn to_c_bool(value: bool) -> c_int {
    c_int::from(value)
}

#[inline]
pub fn from_c_bool(value: c_int) -> bool {
    value != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(check_status(0, "interrupt").is_ok());
        let err = check_status(-1, "interrupt").unwrap_err();
        assert_eq!(err.to_string(), "internal error: interrupt failed with status -1");
    }

    #[test]
    fn test_check_index() {
        assert!(check_index(0, 1).is_ok());
        assert!(matches!(
            check_index(1, 1),
            Err(Error::IndexOutOfBounds { index: 1, len: 1 })
        ));
        assert!(check_index(0, 0).is_err());
    }

    #[test]
    fn test_check_parsed() {
        let mut value = 5u8;
        assert!(check_parsed(&mut value as *mut u8, "block").is_ok());
        assert!(matches!(
            check_parsed(std::ptr::null_mut::<u8>(), "block"),
            Err(Error::InvalidInput("block"))
        ));
    }

    #[test]
    fn test_cast_string() {
        let msg = b"Flushing chainstate";
        let s = unsafe { cast_string(msg.as_ptr() as *const c_char, 8) };
        assert_eq!(s, "Flushing");
        assert_eq!(unsafe { cast_string(std::ptr::null(), 4) }, "");
    }

    #[test]
    fn test_c_bool() {
        assert_eq!(to_c_bool(true), 1);
        assert!(!from_c_bool(0));
        assert!(from_c_bool(2));
    }
}
