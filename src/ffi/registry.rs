//! Token table connecting native callbacks to Rust closures.
//!
//! The native library only carries an opaque `user_data` pointer. Instead of
//! handing it a pointer to Rust memory, each registration mints an integer
//! token and passes that; the trampolines look the closures up by token.
//! A registration is removed exactly once, from the destroy callback the
//! native library invokes when it drops its reference.

use std::collections::HashMap;
use std::os::raw::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Identifier handed to the native library as `user_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(usize);

impl Token {
    pub fn as_user_data(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub fn from_user_data(user_data: *mut c_void) -> Self {
        Token(user_data as usize)
    }
}

/// Registered callback sets of one kind.
pub struct CallbackRegistry<T> {
    name: &'static str,
    next: AtomicUsize,
    entries: RwLock<HashMap<usize, Arc<T>>>,
}

impl<T: Send + Sync + 'static> CallbackRegistry<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            // Zero would travel as a null user_data pointer.
            next: AtomicUsize::new(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store `callbacks` and return the token identifying them.
    pub fn register(&self, callbacks: T) -> Token {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.entries.write().insert(id, Arc::new(callbacks));
        log::debug!("registered {} callbacks as token {}", self.name, id);
        Token(id)
    }

    /// Look up the callbacks for `token`.
    ///
    /// # Panics
    ///
    /// Panics on an unknown token: the native library called back after
    /// destroying its user data, or with a pointer this crate never issued.
    pub fn get(&self, token: Token) -> Arc<T> {
        match self.entries.read().get(&token.0) {
            Some(callbacks) => Arc::clone(callbacks),
            None => panic!("unknown {} callback token {}", self.name, token.0),
        }
    }

    /// Drop the registration for `token`.
    ///
    /// # Panics
    ///
    /// Panics if `token` is not registered, which means it was unregistered
    /// twice.
    pub fn unregister(&self, token: Token) {
        if self.remove(token).is_none() {
            panic!("unknown {} callback token {}", self.name, token.0);
        }
        log::debug!("unregistered {} callbacks for token {}", self.name, token.0);
    }

    /// Remove a registration that never reached the native library.
    pub fn remove(&self, token: Token) -> Option<Arc<T>> {
        self.entries.write().remove(&token.0)
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if a token is registered.
    pub fn contains(&self, token: Token) -> bool {
        self.entries.read().contains_key(&token.0)
    }

    /// Resolve `user_data` and run `f` with the callbacks.
    ///
    /// The lock is not held while `f` runs, so callbacks may register or
    /// unregister other callbacks. A panic in `f` is logged and swallowed so
    /// that it never unwinds into native frames.
    pub fn dispatch<F>(&self, user_data: *mut c_void, event: &'static str, f: F)
    where
        F: FnOnce(&T),
    {
        let callbacks = self.get(Token::from_user_data(user_data));
        if panic::catch_unwind(AssertUnwindSafe(|| f(&callbacks))).is_err() {
            log::error!("{} callback panicked while handling {}", self.name, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread;

    use super::*;

    struct Recorder {
        seen: Mutex<Vec<u32>>,
    }

    fn recorder() -> Recorder {
        Recorder {
            seen: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_register_get_unregister() {
        let registry = CallbackRegistry::new("test");
        let token = registry.register(recorder());
        assert!(registry.contains(token));
        assert_eq!(registry.len(), 1);

        registry.get(token).seen.lock().unwrap().push(7);
        assert_eq!(*registry.get(token).seen.lock().unwrap(), vec![7]);

        registry.unregister(token);
        assert!(!registry.contains(token));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_token_is_never_null() {
        let registry = CallbackRegistry::new("test");
        let token = registry.register(recorder());
        assert!(!token.as_user_data().is_null());
        assert_eq!(Token::from_user_data(token.as_user_data()), token);
    }

    #[test]
    fn test_tokens_are_not_reused() {
        let registry = CallbackRegistry::new("test");
        let first = registry.register(recorder());
        registry.unregister(first);
        let second = registry.register(recorder());
        assert_ne!(first, second);
    }

    #[test]
    #[should_panic(expected = "unknown test callback token")]
    fn test_unknown_token_panics() {
        let registry: CallbackRegistry<Recorder> = CallbackRegistry::new("test");
        registry.get(Token(42));
    }

    #[test]
    #[should_panic(expected = "unknown test callback token")]
    fn test_double_unregister_panics() {
        let registry = CallbackRegistry::new("test");
        let token = registry.register(recorder());
        registry.unregister(token);
        registry.unregister(token);
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let registry: CallbackRegistry<Recorder> = CallbackRegistry::new("test");
        assert!(registry.remove(Token(9)).is_none());
    }

    #[test]
    fn test_dispatch_in_order() {
        let registry = CallbackRegistry::new("test");
        let token = registry.register(recorder());
        for i in 0..5 {
            registry.dispatch(token.as_user_data(), "event", |r| {
                r.seen.lock().unwrap().push(i)
            });
        }
        assert_eq!(*registry.get(token).seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_dispatch_swallows_panics() {
        let registry = CallbackRegistry::new("test");
        let token = registry.register(recorder());
        registry.dispatch(token.as_user_data(), "event", |_| panic!("boom"));
        registry.dispatch(token.as_user_data(), "event", |r| {
            r.seen.lock().unwrap().push(1)
        });
        assert_eq!(*registry.get(token).seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(CallbackRegistry::new("test"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    (0..50)
                        .map(|_| registry.register(recorder()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut tokens: Vec<Token> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(registry.len(), 400);

        tokens.sort_by_key(|t| t.0);
        tokens.dedup();
        assert_eq!(tokens.len(), 400);

        for token in tokens {
            registry.unregister(token);
        }
        assert_eq!(registry.len(), 0);
    }
}
