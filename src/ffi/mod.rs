//! FFI bindings to libbitcoinkernel.
//!
//! This module contains the raw C types, the runtime-loaded symbol table
//! and the ownership and callback plumbing shared by every wrapper. Users
//! should prefer the safe Rust wrappers in the parent modules.

pub mod error;
pub mod handles;
pub mod kinds;
pub mod loader;
pub mod raw;
pub mod registry;
pub mod writer;

pub use error::{cast_string, check_index, check_parsed, check_status, from_c_bool, to_c_bool};
pub(crate) use handles::shared_entity;
pub use handles::{AsRaw, Duplicate, ForeignKind, Owned, Release, Shared, View};
pub use loader::{api, try_api};
pub use raw::*;
pub use registry::{CallbackRegistry, Token};
