//! Memoization of expensive per-configuration computations.
use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
    sync::Mutex,
};

use serde::Serialize;

use crate::error::EvalError;

/// Key of a serializable value, computed over its JSON form.
///
/// Equal values give equal keys within one process. The hash comes from
/// `DefaultHasher`, whose output may change between Rust releases, so keys must
/// not be persisted or compared across builds.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<u64, EvalError> {
    let json = serde_json::to_string(value)?;
    let mut hasher = DefaultHasher::new();
    json.hash(&mut hasher);
    Ok(hasher.finish())
}

/// Wraps a function and caches its results by key.
///
/// The computation runs outside the lock, so two threads asking for the same
/// missing key may both compute it; the first stored value wins.
pub struct Memoized<F, KF, K, V> {
    func: F,
    key_of: KF,
    cache: Mutex<HashMap<K, V>>,
}

impl<F, KF, K, V> Memoized<F, KF, K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// # Arguments
    ///
    /// * `func` - The wrapped computation.
    /// * `key_of` - Maps an argument to its cache key.
    pub fn new(func: F, key_of: KF) -> Self {
        Self {
            func,
            key_of,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &K) -> Option<V> {
        let cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.get(key).cloned()
    }

    fn store(&self, key: K, value: V) -> V {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.entry(key).or_insert(value).clone()
    }

    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Cached value for `arg`, computing it on a miss.
    pub fn call<A: ?Sized>(&self, arg: &A) -> V
    where
        F: Fn(&A) -> V,
        KF: Fn(&A) -> K,
    {
        let key = (self.key_of)(arg);
        if let Some(value) = self.lookup(&key) {
            return value;
        }
        self.store(key, (self.func)(arg))
    }

    /// Like [`Memoized::call`] for fallible computations. Errors are not cached.
    pub fn try_call<A: ?Sized, E>(&self, arg: &A) -> Result<V, E>
    where
        F: Fn(&A) -> Result<V, E>,
        KF: Fn(&A) -> Result<K, E>,
    {
        let key = (self.key_of)(arg)?;
        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }
        let value = (self.func)(arg)?;
        Ok(self.store(key, value))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_derive::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Settings {
        points: usize,
        stereo: bool,
    }

    #[test]
    fn test_fingerprint() {
        let a = fingerprint(&Settings { points: 150, stereo: true }).unwrap();
        let b = fingerprint(&Settings { points: 150, stereo: true }).unwrap();
        let c = fingerprint(&Settings { points: 100, stereo: true }).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fingerprint_depends_on_content_only() {
        let memo = Memoized::new(
            |settings: &Settings| Ok::<_, EvalError>(settings.points * 2),
            fingerprint::<Settings>,
        );
        assert_eq!(memo.try_call(&Settings { points: 10, stereo: false }).unwrap(), 20);
        assert_eq!(memo.try_call(&Settings { points: 10, stereo: false }).unwrap(), 20);
        assert_eq!(memo.len(), 1);
        memo.try_call(&Settings { points: 10, stereo: true }).unwrap();
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn test_call_computes_once() {
        let calls = AtomicUsize::new(0);
        let memo = Memoized::new(
            |x: &u32| {
                calls.fetch_add(1, Ordering::SeqCst);
                x * 2
            },
            |x: &u32| *x,
        );

        assert_eq!(memo.call(&4), 8);
        assert_eq!(memo.call(&4), 8);
        assert_eq!(memo.call(&5), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(memo.len(), 2);

        memo.clear();
        assert!(memo.is_empty());
    }

    #[test]
    fn test_try_call_skips_errors() {
        let memo = Memoized::new(
            |x: &i32| if *x < 0 { Err("negative") } else { Ok(*x as u32) },
            |x: &i32| Ok::<_, &str>(*x),
        );

        assert_eq!(memo.try_call(&-1), Err("negative"));
        assert!(memo.is_empty());
        assert_eq!(memo.try_call(&3), Ok(3));
        assert_eq!(memo.len(), 1);
    }
}
