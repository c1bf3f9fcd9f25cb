//! Size-bucketed array pools shared across threads.
//!
//! Two process-wide pools back the hot paths: one for the value arrays that
//! messages carry, one for the byte buffers that blobs copy into. Arrays are
//! grouped in power-of-two buckets (16, 32, 64, ... up to the configured
//! maximum length); each bucket keeps at most `bucket_capacity` idle arrays.
//!
//! Renting never waits: if no idle array fits, a fresh one is allocated.

use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::error::PoolError;
use crate::value::Value;

/// Length of the smallest bucket.
const MIN_BUCKET_LEN: usize = 16;

/// Tunables for an [`ArrayPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Idle arrays kept per bucket.
    pub bucket_capacity: usize,
    /// Largest array length the pool tracks. Bigger requests bypass it.
    pub max_array_length: usize,
}

impl PoolConfig {
    /// Defaults for the message value pool.
    pub const VALUES: PoolConfig = PoolConfig {
        bucket_capacity: 1024,
        max_array_length: 512,
    };

    /// Defaults for the blob byte pool.
    pub const BYTES: PoolConfig = PoolConfig {
        bucket_capacity: 1024,
        max_array_length: 32 * 1024,
    };
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Fresh allocations made so far (the pool's high-water mark).
    pub allocations: usize,
    /// Idle arrays currently held across all buckets.
    pub retained: usize,
}

/// A thread-safe pool of `Vec<T>` grouped by capacity.
pub struct ArrayPool<T> {
    config: PoolConfig,
    buckets: Box<[Mutex<Vec<Vec<T>>>]>,
    allocations: AtomicUsize,
}

impl<T: Default> ArrayPool<T> {
    pub fn new(config: PoolConfig) -> Self {
        let count = bucket_index(config.max_array_length.max(MIN_BUCKET_LEN)) + 1;
        let buckets = (0..count).map(|_| Mutex::new(Vec::new())).collect();
        Self {
            config,
            buckets,
            allocations: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Rent an empty vector whose capacity is at least `min_len`.
    ///
    /// Idle arrays are looked up from the best-fitting bucket upward; when all
    /// of them are empty a new array of the bucket's length is allocated.
    pub fn rent(&self, min_len: usize) -> Vec<T> {
        if min_len == 0 {
            return Vec::new();
        }
        if min_len > self.config.max_array_length {
            self.allocations.fetch_add(1, Ordering::Relaxed);
            return Vec::with_capacity(min_len);
        }

        let first = bucket_index(min_len);
        for bucket in &self.buckets[first..] {
            if let Some(mut array) = lock(bucket).pop() {
                array.clear();
                return array;
            }
        }

        self.allocations.fetch_add(1, Ordering::Relaxed);
        Vec::with_capacity(bucket_len(first))
    }

    /// Return an array for reuse.
    ///
    /// With `clear` set every element is reset to `T::default()` first, which
    /// zeroes byte buffers; the zeroed elements stay in place until the array
    /// is rented again. Without it the array is emptied. The array is dropped
    /// instead of retained when it is too small, larger than the pool tracks,
    /// or its bucket is full.
    pub fn give_back(&self, mut array: Vec<T>, clear: bool) {
        if clear {
            array.iter_mut().for_each(|slot| *slot = T::default());
        } else {
            array.clear();
        }

        let Some(index) = self.bucket_for_capacity(array.capacity()) else {
            return;
        };
        let mut bucket = lock(&self.buckets[index]);
        if bucket.len() < self.config.bucket_capacity {
            bucket.push(array);
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            retained: self.buckets.iter().map(|b| lock(b).len()).sum(),
        }
    }

    fn bucket_for_capacity(&self, capacity: usize) -> Option<usize> {
        if capacity < MIN_BUCKET_LEN || capacity > bucket_len(self.buckets.len() - 1) {
            return None;
        }
        // floor: every array in bucket `i` holds at least `bucket_len(i)` elements
        let floor = (usize::BITS - 1 - capacity.leading_zeros()) as usize;
        Some(floor - MIN_BUCKET_LEN.trailing_zeros() as usize)
    }
}

impl<T> fmt::Debug for ArrayPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayPool")
            .field("config", &self.config)
            .field("buckets", &self.buckets.len())
            .field("allocations", &self.allocations.load(Ordering::Relaxed))
            .finish()
    }
}

/// Bucket whose length is the smallest power of two `>= len`.
fn bucket_index(len: usize) -> usize {
    let len = len.max(MIN_BUCKET_LEN);
    let ceil = (usize::BITS - (len - 1).leading_zeros()) as usize;
    ceil - MIN_BUCKET_LEN.trailing_zeros() as usize
}

fn bucket_len(index: usize) -> usize {
    MIN_BUCKET_LEN << index
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

static VALUE_POOL: OnceLock<ArrayPool<Value>> = OnceLock::new();
static BYTE_POOL: OnceLock<ArrayPool<u8>> = OnceLock::new();

/// Process-wide pool of message value arrays.
pub fn value_pool() -> &'static ArrayPool<Value> {
    VALUE_POOL.get_or_init(|| ArrayPool::new(PoolConfig::VALUES))
}

/// Process-wide pool of blob byte buffers.
pub fn byte_pool() -> &'static ArrayPool<u8> {
    BYTE_POOL.get_or_init(|| ArrayPool::new(PoolConfig::BYTES))
}

/// Size the process-wide pools. Must run before anything rents from them.
pub fn configure(values: PoolConfig, bytes: PoolConfig) -> Result<(), PoolError> {
    VALUE_POOL
        .set(ArrayPool::new(values))
        .map_err(|_| PoolError::AlreadyInitialized("value"))?;
    BYTE_POOL
        .set(ArrayPool::new(bytes))
        .map_err(|_| PoolError::AlreadyInitialized("byte"))
}

/// Byte storage rented from a byte pool ([`byte_pool`] unless stated
/// otherwise), returned (zeroed) to that pool on drop.
pub struct PooledBytes {
    buf: Vec<u8>,
    pool: &'static ArrayPool<u8>,
}

impl PooledBytes {
    pub fn copy_from(data: &[u8]) -> Self {
        Self::copy_in(byte_pool(), data)
    }

    /// Copy `data` into a buffer rented from `pool`.
    pub fn copy_in(pool: &'static ArrayPool<u8>, data: &[u8]) -> Self {
        let mut buf = pool.rent(data.len());
        buf.extend_from_slice(data);
        Self { buf, pool }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

impl Clone for PooledBytes {
    fn clone(&self) -> Self {
        Self::copy_in(self.pool, &self.buf)
    }
}

impl Drop for PooledBytes {
    fn drop(&mut self) {
        let buf = mem::take(&mut self.buf);
        if buf.capacity() > 0 {
            self.pool.give_back(buf, true);
        }
    }
}

impl fmt::Debug for PooledBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PooledBytes({} bytes)", self.buf.len())
    }
}

/// The value storage of a message, rented from [`value_pool`] unless built
/// with [`with_capacity_in`](ValueBatch::with_capacity_in).
///
/// Dropping the batch drops every value in it (releasing owned blob buffers)
/// and then returns the array to the pool it came from, once.
pub struct ValueBatch {
    values: Vec<Value>,
    // None: the process-wide pool, looked up only when storage is returned
    pool: Option<&'static ArrayPool<Value>>,
}

impl ValueBatch {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            pool: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(value_pool(), capacity)
    }

    pub fn with_capacity_in(pool: &'static ArrayPool<Value>, capacity: usize) -> Self {
        Self {
            values: pool.rent(capacity),
            pool: Some(pool),
        }
    }

    fn pool(&self) -> &'static ArrayPool<Value> {
        self.pool.unwrap_or_else(value_pool)
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}

impl Default for ValueBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for ValueBatch {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.values
    }
}

impl DerefMut for ValueBatch {
    fn deref_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }
}

impl Clone for ValueBatch {
    fn clone(&self) -> Self {
        let mut batch = Self::with_capacity_in(self.pool(), self.values.len());
        batch.values.extend(self.values.iter().cloned());
        batch
    }
}

impl FromIterator<Value> for ValueBatch {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut batch = Self::with_capacity(iter.size_hint().0);
        for value in iter {
            batch.push(value);
        }
        batch
    }
}

impl PartialEq for ValueBatch {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Drop for ValueBatch {
    fn drop(&mut self) {
        let values = mem::take(&mut self.values);
        if values.capacity() > 0 {
            self.pool().give_back(values, true);
        }
    }
}

impl fmt::Debug for ValueBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}
