//! Process-wide registry for user-defined custom types.
//!
//! Built-in extension kinds are dedicated [`Value`] variants handled
//! directly by the codec, so user registrations can never shadow them. The
//! registry only covers the user range: it maps a type qualifier to an
//! encode function (payload value → wire fields) and a decode function
//! (wire fields → payload value).
//!
//! Entries persist across pack/unpack calls until replaced or cleared;
//! the codec never mutates the registry. Reads take the lock shared, so
//! concurrent pack/unpack traffic is fine; the expected usage is still to
//! register everything during single-threaded setup.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use crate::error::PackError;
use crate::types::Value;

/// Reduces a custom value's payload to plain wire fields.
pub type EncodeFn = Arc<dyn Fn(&Value) -> Result<Value, PackError> + Send + Sync>;

/// Reconstructs a custom value's payload from wire fields.
pub type DecodeFn = Arc<dyn Fn(Value) -> Result<Value, PackError> + Send + Sync>;

struct Entry {
    encode: EncodeFn,
    decode: DecodeFn,
}

static REGISTRY: LazyLock<RwLock<HashMap<String, Entry>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Registers (or replaces) the handler pair for a type qualifier.
pub fn register<E, D>(qualifier: impl Into<String>, encode: E, decode: D)
where
    E: Fn(&Value) -> Result<Value, PackError> + Send + Sync + 'static,
    D: Fn(Value) -> Result<Value, PackError> + Send + Sync + 'static,
{
    let qualifier = qualifier.into();
    let entry = Entry {
        encode: Arc::new(encode),
        decode: Arc::new(decode),
    };
    let replaced = lock_write().insert(qualifier.clone(), entry).is_some();
    tracing::debug!(%qualifier, replaced, "registered custom type");
}

/// Removes every user-registered entry. Built-in kinds are unaffected.
pub fn clear_registry() {
    let mut map = lock_write();
    let removed = map.len();
    map.clear();
    tracing::debug!(removed, "cleared custom type registry");
}

/// Looks up the encode function for a qualifier.
pub(crate) fn resolve_encoder(qualifier: &str) -> Result<EncodeFn, PackError> {
    lock_read()
        .get(qualifier)
        .map(|entry| Arc::clone(&entry.encode))
        .ok_or_else(|| PackError::UnregisteredType(qualifier.to_owned()))
}

/// Looks up the decode function for a qualifier. A miss is a hard
/// [`PackError::UnknownExtension`] failure: silently dropping type
/// information would break round-trip correctness.
pub(crate) fn resolve_decoder(qualifier: &str) -> Result<DecodeFn, PackError> {
    lock_read()
        .get(qualifier)
        .map(|entry| Arc::clone(&entry.decode))
        .ok_or_else(|| PackError::UnknownExtension(qualifier.to_owned()))
}

fn lock_read() -> std::sync::RwLockReadGuard<'static, HashMap<String, Entry>> {
    REGISTRY.read().unwrap_or_else(|e| e.into_inner())
}

fn lock_write() -> std::sync::RwLockWriteGuard<'static, HashMap<String, Entry>> {
    REGISTRY.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard};

    /// The registry is process-wide, so tests that mutate it serialize
    /// through this lock to keep the parallel test runner deterministic.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    pub(crate) fn lock() -> MutexGuard<'static, ()> {
        TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Custom;

    #[test]
    fn register_then_resolve() {
        let _guard = test_support::lock();
        register("test.Resolve", |v| Ok(v.clone()), |v| Ok(v));
        assert!(resolve_encoder("test.Resolve").is_ok());
        assert!(resolve_decoder("test.Resolve").is_ok());
        clear_registry();
    }

    #[test]
    fn register_replaces_prior_entry() {
        let _guard = test_support::lock();
        register(
            "test.Replace",
            |_| Ok(Value::Int(1)),
            |v| Ok(v),
        );
        register(
            "test.Replace",
            |_| Ok(Value::Int(2)),
            |v| Ok(v),
        );
        let enc = resolve_encoder("test.Replace").unwrap();
        assert_eq!(enc(&Value::Nil).unwrap(), Value::Int(2));
        clear_registry();
    }

    #[test]
    fn clear_makes_encoding_fail() {
        let _guard = test_support::lock();
        register("test.Money", |v| Ok(v.clone()), |v| Ok(v));
        clear_registry();

        let value = Value::Custom(Custom {
            qualifier: "test.Money".into(),
            payload: Box::new(Value::Int(100)),
        });
        let mut buf = bytes::BytesMut::new();
        match crate::codec::encode_value(&mut buf, &value) {
            Err(PackError::UnregisteredType(q)) => assert_eq!(q, "test.Money"),
            other => panic!("expected unregistered type, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_decoder_is_unknown_extension() {
        let _guard = test_support::lock();
        clear_registry();
        match resolve_decoder("test.Nowhere") {
            Err(PackError::UnknownExtension(q)) => assert_eq!(q, "test.Nowhere"),
            Err(other) => panic!("expected unknown extension, got {other:?}"),
            Ok(_) => panic!("expected unknown extension, got an entry"),
        }
    }
}
