//! # Deterministic Cache
//!
//! Memoizes pure solver calls. Inputs are first *normalized*: every float is
//! quantized to a fixed number of significant digits, so numerically
//! insignificant differences (1.0000001 vs 1.0000002) share a key. The wrapped
//! function is then evaluated on the normalized input, never the raw one, so
//! every input that maps to a key yields the same result no matter which of
//! them happened to populate the entry.
//!
//! The cache is an owned object with an injected [`CachePolicy`]; callers wrap
//! a solver explicitly with [`DeterministicCache::get_or_compute`] or
//! [`memoize`].
//!
//! ## Example
//!
//! ```rust
//! use serde::Serialize;
//! use signcalc_core::cache::{quantize, CachePolicy, DeterministicCache, Normalize};
//!
//! #[derive(Clone, Serialize)]
//! struct Square(f64);
//!
//! impl Normalize for Square {
//!     fn normalized(&self, digits: u32) -> Self {
//!         Square(quantize(self.0, digits))
//!     }
//! }
//!
//! let cache = DeterministicCache::new(CachePolicy::default());
//! let a = cache.get_or_compute(&Square(1.0000001), |s| Ok(s.0 * s.0)).unwrap();
//! let b = cache.get_or_compute(&Square(1.0000002), |s| Ok(s.0 * s.0)).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(cache.stats().misses, 1);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::errors::CalcResult;

/// Size and quantization policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    /// Maximum number of entries. Zero disables caching.
    pub capacity: usize,
    /// Significant digits kept when quantizing floats
    pub significant_digits: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            capacity: 256,
            significant_digits: 6,
        }
    }
}

/// Round `value` to `digits` significant digits.
///
/// The result depends only on the retained mantissa and exponent, so two
/// inputs that round to the same digits produce bit-identical floats.
/// Zero and non-finite values pass through unchanged.
pub fn quantize(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let digits = digits.clamp(1, 15) as i32;
    let exponent = value.abs().log10().floor() as i32 - (digits - 1);
    let mantissa = if exponent >= 0 {
        (value / 10f64.powi(exponent)).round()
    } else {
        (value * 10f64.powi(-exponent)).round()
    };
    if exponent >= 0 {
        mantissa * 10f64.powi(exponent)
    } else {
        mantissa / 10f64.powi(-exponent)
    }
}

/// Inputs that can be cached.
///
/// `normalized` returns a copy with every float passed through [`quantize`];
/// the serialized normalized value is the cache key.
pub trait Normalize: Serialize + Sized {
    fn normalized(&self, digits: u32) -> Self;
}

impl Normalize for f64 {
    fn normalized(&self, digits: u32) -> Self {
        quantize(*self, digits)
    }
}

impl<T: Normalize> Normalize for Vec<T> {
    fn normalized(&self, digits: u32) -> Self {
        self.iter().map(|v| v.normalized(digits)).collect()
    }
}

impl<T: Normalize> Normalize for Option<T> {
    fn normalized(&self, digits: u32) -> Self {
        self.as_ref().map(|v| v.normalized(digits))
    }
}

/// Counters reported by [`DeterministicCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

struct Entry<V> {
    value: V,
    last_used: u64,
}

struct Slots<V> {
    entries: HashMap<String, Entry<V>>,
    /// last_used tick -> key, oldest first
    recency: BTreeMap<u64, String>,
    tick: u64,
}

impl<V> Slots<V> {
    fn touch(&mut self, key: &str) {
        self.tick += 1;
        let tick = self.tick;
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.last_used);
            entry.last_used = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            let Some((_, key)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&key);
        }
    }
}

/// Bounded LRU memo table.
///
/// Thread-safe. Two threads missing on the same key at once both compute;
/// the first insert wins and both see a deterministic value.
pub struct DeterministicCache<V> {
    policy: CachePolicy,
    slots: Mutex<Slots<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> DeterministicCache<V> {
    pub fn new(policy: CachePolicy) -> Self {
        DeterministicCache {
            policy,
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Slots<V>> {
        // A panic inside `compute` never holds the lock, so a poisoned
        // table is still consistent.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Key for an input under this cache's policy.
    pub fn key_for<I: Normalize>(&self, input: &I) -> CalcResult<String> {
        Ok(serde_json::to_string(&input.normalized(self.policy.significant_digits))?)
    }

    /// Return the cached value for `input`, computing it on a miss.
    ///
    /// `compute` receives the normalized input. Errors are returned to the
    /// caller and never cached.
    pub fn get_or_compute<I, F>(&self, input: &I, compute: F) -> CalcResult<V>
    where
        I: Normalize,
        F: FnOnce(&I) -> CalcResult<V>,
    {
        let normalized = input.normalized(self.policy.significant_digits);
        if self.policy.capacity == 0 {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return compute(&normalized);
        }
        let key = serde_json::to_string(&normalized)?;

        {
            let mut slots = self.lock();
            if slots.entries.contains_key(&key) {
                slots.touch(&key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                if let Some(entry) = slots.entries.get(&key) {
                    return Ok(entry.value.clone());
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = compute(&normalized)?;

        let mut slots = self.lock();
        if let Some(existing) = slots.entries.get(&key) {
            return Ok(existing.value.clone());
        }
        slots.tick += 1;
        let tick = slots.tick;
        slots.entries.insert(
            key.clone(),
            Entry {
                value: value.clone(),
                last_used: tick,
            },
        );
        slots.recency.insert(tick, key);
        let capacity = self.policy.capacity;
        slots.evict_to(capacity);
        Ok(value)
    }

    pub fn contains<I: Normalize>(&self, input: &I) -> bool {
        match self.key_for(input) {
            Ok(key) => self.lock().entries.contains_key(&key),
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut slots = self.lock();
        slots.entries.clear();
        slots.recency.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.policy.capacity,
        }
    }
}

/// Wrap a pure function in a cache.
///
/// ```rust
/// use signcalc_core::cache::{memoize, CachePolicy, DeterministicCache};
///
/// let cache = DeterministicCache::new(CachePolicy::default());
/// let cube = memoize(&cache, |x: &f64| Ok(x * x * x));
/// assert_eq!(cube(&2.0).unwrap(), 8.0);
/// assert_eq!(cube(&2.0000000001).unwrap(), 8.0);
/// ```
pub fn memoize<'a, I, V, F>(
    cache: &'a DeterministicCache<V>,
    f: F,
) -> impl Fn(&I) -> CalcResult<V> + 'a
where
    I: Normalize,
    V: Clone,
    F: Fn(&I) -> CalcResult<V> + 'a,
{
    move |input: &I| cache.get_or_compute(input, &f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(1.0000001, 6), quantize(1.0000002, 6));
        assert_eq!(quantize(123456.7, 6), 123457.0);
        assert_eq!(quantize(-0.0012345678, 3), -0.00123);
        assert_eq!(quantize(0.0, 6), 0.0);
        assert!(quantize(f64::NAN, 6).is_nan());
        assert_ne!(quantize(1.00001, 6), quantize(1.00002, 6));
    }

    #[test]
    fn test_single_evaluation_per_key() {
        let cache: DeterministicCache<f64> = DeterministicCache::new(CachePolicy::default());
        let calls = Cell::new(0);
        let f = |x: &f64| {
            calls.set(calls.get() + 1);
            Ok(x * 2.0)
        };
        let a = cache.get_or_compute(&3.0000001, f).unwrap();
        let b = cache.get_or_compute(&3.0000002, f).unwrap();
        let c = cache.get_or_compute(&3.0, f).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn test_result_independent_of_call_order() {
        let f = |x: &f64| Ok(*x);
        let first: DeterministicCache<f64> = DeterministicCache::new(CachePolicy::default());
        let a = first.get_or_compute(&1.0000001, f).unwrap();
        let second: DeterministicCache<f64> = DeterministicCache::new(CachePolicy::default());
        let b = second.get_or_compute(&1.0000002, f).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_lru_eviction() {
        let cache: DeterministicCache<f64> = DeterministicCache::new(CachePolicy {
            capacity: 2,
            significant_digits: 6,
        });
        let f = |x: &f64| Ok(*x);
        cache.get_or_compute(&1.0, f).unwrap();
        cache.get_or_compute(&2.0, f).unwrap();
        // touch 1.0 so 2.0 becomes the oldest
        cache.get_or_compute(&1.0, f).unwrap();
        cache.get_or_compute(&3.0, f).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&1.0));
        assert!(!cache.contains(&2.0));
        assert!(cache.contains(&3.0));
    }

    #[test]
    fn test_errors_not_cached() {
        let cache: DeterministicCache<f64> = DeterministicCache::new(CachePolicy::default());
        let r = cache.get_or_compute(&-1.0, |_| {
            Err(crate::errors::CalcError::invalid_input("x", "-1", "negative"))
        });
        assert!(r.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache: DeterministicCache<f64> = DeterministicCache::new(CachePolicy {
            capacity: 0,
            significant_digits: 6,
        });
        let calls = Cell::new(0);
        let f = |x: &f64| {
            calls.set(calls.get() + 1);
            Ok(*x)
        };
        cache.get_or_compute(&1.0, f).unwrap();
        cache.get_or_compute(&1.0, f).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let cache: DeterministicCache<f64> = DeterministicCache::new(CachePolicy::default());
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for i in 0..50 {
                        let v = cache.get_or_compute(&(i as f64), |x| Ok(x * 10.0)).unwrap();
                        assert_eq!(v, i as f64 * 10.0);
                    }
                });
            }
        });
        assert_eq!(cache.len(), 50);
    }
}
