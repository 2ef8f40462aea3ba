//! Ownership wrappers for native object pointers.
//!
//! Every native object kind is described by a zero-sized marker type
//! implementing [`ForeignKind`] and, when the caller may own it,
//! [`Release`]. Kinds that the library can reference count also implement
//! [`Duplicate`].
//!
//! - [`Owned`] is the only handle to its pointer and releases it once.
//! - [`Shared`] holds one native reference; cloning takes another.
//! - [`View`] borrows a pointer owned by something else and never releases.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::error::{Error, Result};

/// Describes a native object kind.
pub trait ForeignKind {
    /// Opaque C type behind the pointer.
    type Raw;
    /// Human readable name used in errors and panics.
    const NAME: &'static str;
}

/// A kind whose pointers may be owned and must be released.
///
/// # Safety
///
/// `release` must be the native destroy function for `Raw`.
pub unsafe trait Release: ForeignKind {
    /// # Safety
    ///
    /// `ptr` must be non-null and owned by the caller.
    unsafe fn release(ptr: *mut Self::Raw);
}

/// A kind the native library can hand out additional references to.
///
/// # Safety
///
/// `duplicate` must return a pointer that is released independently of
/// its source, or null on failure.
pub unsafe trait Duplicate: Release {
    /// # Safety
    ///
    /// `ptr` must point to a live object.
    unsafe fn duplicate(ptr: *const Self::Raw) -> *mut Self::Raw;
}

/// Access to the raw pointer behind an owned value or a view.
///
/// Implemented only inside this crate; the extension traits built on top
/// of it are how owned values and views share their accessors.
pub trait AsRaw<K: ForeignKind> {
    /// Pointer valid for as long as `self` is borrowed.
    fn as_raw(&self) -> *const K::Raw;
}

/// Exclusive owner of a native pointer.
pub struct Owned<K: Release> {
    ptr: *mut K::Raw,
    _kind: PhantomData<K>,
}

impl<K: Release> Owned<K> {
    /// Take ownership of `ptr`.
    ///
    /// # Panics
    ///
    /// Panics on a null pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be owned by the caller and not wrapped anywhere else.
    pub unsafe fn from_raw(ptr: *mut K::Raw) -> Self {
        assert!(!ptr.is_null(), "cannot take ownership of a null {}", K::NAME);
        Self {
            ptr,
            _kind: PhantomData,
        }
    }

    /// Take ownership of the result of a native constructor, mapping null
    /// to an instantiation error.
    ///
    /// # Safety
    ///
    /// Same as [`Owned::from_raw`].
    pub unsafe fn from_constructor(ptr: *mut K::Raw) -> Result<Self> {
        if ptr.is_null() {
            return Err(Error::Instantiation(K::NAME));
        }
        Ok(Self::from_raw(ptr))
    }

    /// Get the pointer.
    ///
    /// # Panics
    ///
    /// Panics if the handle was already released.
    pub fn as_ptr(&self) -> *mut K::Raw {
        assert!(!self.ptr.is_null(), "{} used after release", K::NAME);
        self.ptr
    }

    /// Check if the handle was released.
    pub fn is_released(&self) -> bool {
        self.ptr.is_null()
    }

    /// Release the native object now. Later calls are no-ops.
    pub fn release(&mut self) {
        let ptr = std::mem::replace(&mut self.ptr, ptr::null_mut());
        if ptr.is_null() {
            return;
        }
        log::trace!("releasing {} at {:p}", K::NAME, ptr);
        unsafe { K::release(ptr) }
    }
}

impl<K: Release> Drop for Owned<K> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<K: Release> fmt::Debug for Owned<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&K::NAME).field(&self.ptr).finish()
    }
}

/// One native reference to a reference-counted object.
pub struct Shared<K: Duplicate> {
    inner: Owned<K>,
}

impl<K: Duplicate> Shared<K> {
    /// Adopt a reference the caller already owns.
    ///
    /// # Safety
    ///
    /// See [`Owned::from_raw`].
    pub unsafe fn from_owned(ptr: *mut K::Raw) -> Self {
        Self {
            inner: Owned::from_raw(ptr),
        }
    }

    /// Adopt the result of a native constructor.
    ///
    /// # Safety
    ///
    /// See [`Owned::from_raw`].
    pub unsafe fn from_constructor(ptr: *mut K::Raw) -> Result<Self> {
        Owned::from_constructor(ptr).map(|inner| Self { inner })
    }

    /// Take a new reference to an object someone else owns.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live object.
    pub unsafe fn from_borrowed(ptr: *const K::Raw) -> Result<Self> {
        let copy = K::duplicate(ptr);
        if copy.is_null() {
            return Err(Error::Instantiation(K::NAME));
        }
        Ok(Self::from_owned(copy))
    }

    /// Take another native reference to the same object.
    pub fn try_clone(&self) -> Result<Self> {
        unsafe { Self::from_borrowed(self.as_ptr()) }
    }

    /// See [`Owned::as_ptr`].
    pub fn as_ptr(&self) -> *mut K::Raw {
        self.inner.as_ptr()
    }

    /// Check if the handle was released.
    pub fn is_released(&self) -> bool {
        self.inner.is_released()
    }

    /// Drop this reference now. Later calls are no-ops.
    pub fn release(&mut self) {
        self.inner.release()
    }
}

impl<K: Duplicate> Clone for Shared<K> {
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(copy) => copy,
            Err(err) => panic!("{}", err),
        }
    }
}

impl<K: Duplicate> fmt::Debug for Shared<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shared")
            .field(&K::NAME)
            .field(&self.inner.ptr)
            .finish()
    }
}

/// Pointer owned by something that outlives `'a`.
pub struct View<'a, K: ForeignKind> {
    ptr: NonNull<K::Raw>,
    _scope: PhantomData<&'a K::Raw>,
}

impl<'a, K: ForeignKind> View<'a, K> {
    /// Wrap a pointer returned by an accessor that cannot fail.
    ///
    /// # Panics
    ///
    /// Panics on null; the native library broke its contract.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid for `'a`.
    pub unsafe fn new(ptr: *const K::Raw) -> Self {
        match Self::try_new(ptr) {
            Some(view) => view,
            None => panic!("native library returned a null {}", K::NAME),
        }
    }

    /// Wrap a pointer that may legitimately be null.
    ///
    /// # Safety
    ///
    /// See [`View::new`].
    pub unsafe fn try_new(ptr: *const K::Raw) -> Option<Self> {
        NonNull::new(ptr as *mut K::Raw).map(|ptr| Self {
            ptr,
            _scope: PhantomData,
        })
    }

    /// Get the pointer.
    pub fn as_ptr(&self) -> *const K::Raw {
        self.ptr.as_ptr()
    }
}

impl<K: Duplicate> View<'_, K> {
    /// Take an owned reference that outlives the view's scope.
    pub fn to_shared(&self) -> Result<Shared<K>> {
        unsafe { Shared::from_borrowed(self.as_ptr()) }
    }
}

impl<K: ForeignKind> Clone for View<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: ForeignKind> Copy for View<'_, K> {}

impl<K: ForeignKind> fmt::Debug for View<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("View").field(&K::NAME).field(&self.ptr).finish()
    }
}

/// Defines a reference-counted entity and its borrowed counterpart, both
/// implementing [`AsRaw`] so one extension trait serves both.
macro_rules! shared_entity {
    (
        $(#[$meta:meta])*
        $name:ident, $view:ident, $kind:ty
    ) => {
        $(#[$meta])*
        pub struct $name {
            inner: $crate::ffi::Shared<$kind>,
        }

        #[doc = concat!("Borrowed [`", stringify!($name), "`], valid while its parent is.")]
        #[derive(Clone, Copy)]
        pub struct $view<'a> {
            inner: $crate::ffi::View<'a, $kind>,
        }

        impl $name {
            /// # Safety
            ///
            /// `ptr` must be a reference owned by the caller.
            #[allow(dead_code)]
            pub(crate) unsafe fn from_owned(
                ptr: *mut <$kind as $crate::ffi::ForeignKind>::Raw,
            ) -> Self {
                Self {
                    inner: $crate::ffi::Shared::from_owned(ptr),
                }
            }

            #[allow(dead_code)]
            pub(crate) unsafe fn from_constructor(
                ptr: *mut <$kind as $crate::ffi::ForeignKind>::Raw,
            ) -> $crate::error::Result<Self> {
                $crate::ffi::Shared::from_constructor(ptr).map(|inner| Self { inner })
            }

            /// Take another native reference, reporting failure instead of
            /// panicking like `clone()` does.
            pub fn try_clone(&self) -> $crate::error::Result<Self> {
                self.inner.try_clone().map(|inner| Self { inner })
            }

            #[doc = concat!("Borrow this ", stringify!($name), " as a view.")]
            pub fn as_view(&self) -> $view<'_> {
                $view {
                    inner: unsafe { $crate::ffi::View::new(self.inner.as_ptr()) },
                }
            }
        }

        impl<'a> $view<'a> {
            /// # Safety
            ///
            /// `ptr` must stay valid for `'a`.
            pub(crate) unsafe fn from_ptr(
                ptr: *const <$kind as $crate::ffi::ForeignKind>::Raw,
            ) -> Self {
                Self {
                    inner: $crate::ffi::View::new(ptr),
                }
            }

            #[doc = concat!("Take an owned reference to this ", stringify!($name), ".")]
            pub fn copy(&self) -> $crate::error::Result<$name> {
                self.inner.to_shared().map(|inner| $name { inner })
            }
        }

        impl $crate::ffi::AsRaw<$kind> for $name {
            fn as_raw(&self) -> *const <$kind as $crate::ffi::ForeignKind>::Raw {
                self.inner.as_ptr()
            }
        }

        impl $crate::ffi::AsRaw<$kind> for $view<'_> {
            fn as_raw(&self) -> *const <$kind as $crate::ffi::ForeignKind>::Raw {
                self.inner.as_ptr()
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                Self {
                    inner: self.inner.clone(),
                }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }

        impl std::fmt::Debug for $view<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($view)).finish_non_exhaustive()
            }
        }

        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}
        unsafe impl Send for $view<'_> {}
        unsafe impl Sync for $view<'_> {}
    };
}

pub(crate) use shared_entity;


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::mock::{MockKind, MockObject};
    use super::*;

    #[test]
    fn test_owned_released_once_on_drop() {
        let obj = MockObject::leak();
        {
            let _owned = unsafe { Owned::<MockKind>::from_raw(obj.ptr()) };
        }
        assert_eq!(obj.releases(), 1);
        assert_eq!(obj.refs(), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let obj = MockObject::leak();
        let mut owned = unsafe { Owned::<MockKind>::from_raw(obj.ptr()) };
        owned.release();
        owned.release();
        assert!(owned.is_released());
        drop(owned);
        assert_eq!(obj.releases(), 1);
    }

    #[test]
    #[should_panic(expected = "mock object used after release")]
    fn test_use_after_release_panics() {
        let obj = MockObject::leak();
        let mut owned = unsafe { Owned::<MockKind>::from_raw(obj.ptr()) };
        owned.release();
        owned.as_ptr();
    }

    #[test]
    #[should_panic(expected = "cannot take ownership of a null mock object")]
    fn test_null_wrap_panics() {
        let _ = unsafe { Owned::<MockKind>::from_raw(ptr::null_mut()) };
    }

    #[test]
    fn test_null_constructor_is_instantiation_error() {
        let err = unsafe { Shared::<MockKind>::from_constructor(ptr::null_mut()) }.unwrap_err();
        assert!(matches!(err, Error::Instantiation("mock object")));
    }

    #[test]
    fn test_copy_outlives_original() {
        let obj = MockObject::leak();
        let mut original = unsafe { Shared::<MockKind>::from_owned(obj.ptr()) };
        let copy = original.try_clone().unwrap();
        assert_eq!(obj.refs(), 2);

        original.release();
        assert_eq!(obj.refs(), 1);
        assert_eq!(copy.as_ptr(), obj.ptr());

        drop(copy);
        assert_eq!(obj.refs(), 0);
        assert_eq!(obj.releases(), 2);
    }

    #[test]
    fn test_failed_duplicate_is_reported() {
        let obj = MockObject::leak();
        let shared = unsafe { Shared::<MockKind>::from_owned(obj.ptr()) };
        obj.fail_copy.store(true, Ordering::SeqCst);
        assert!(matches!(
            shared.try_clone(),
            Err(Error::Instantiation("mock object"))
        ));
        assert_eq!(obj.refs(), 1);
    }

    #[test]
    #[should_panic(expected = "failed to instantiate mock object")]
    fn test_failed_clone_panics() {
        let obj = MockObject::leak();
        let shared = unsafe { Shared::<MockKind>::from_owned(obj.ptr()) };
        obj.fail_copy.store(true, Ordering::SeqCst);
        let _ = shared.clone();
    }

    #[test]
    fn test_view_never_releases() {
        let obj = MockObject::leak();
        {
            let view = unsafe { View::<MockKind>::new(obj.ptr()) };
            let again = view;
            assert_eq!(again.as_ptr(), obj.ptr() as *const MockObject);
        }
        assert_eq!(obj.releases(), 0);
        assert_eq!(obj.refs(), 1);
    }

    #[test]
    fn test_view_promotes_to_shared() {
        let obj = MockObject::leak();
        let view = unsafe { View::<MockKind>::new(obj.ptr()) };
        let owned = view.to_shared().unwrap();
        assert_eq!(obj.refs(), 2);
        drop(owned);
        assert_eq!(obj.refs(), 1);
    }

    #[test]
    fn test_nullable_view() {
        assert!(unsafe { View::<MockKind>::try_new(ptr::null()) }.is_none());
    }

    #[test]
    #[should_panic(expected = "native library returned a null mock object")]
    fn test_null_view_panics() {
        let _ = unsafe { View::<MockKind>::new(ptr::null()) };
    }
}
