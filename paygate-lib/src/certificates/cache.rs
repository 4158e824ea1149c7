//! Concurrency-safe certificate store.
//!
//! # Semantics
//!
//! - Keyed by serial number
//! - Insert-if-absent only: the first record stored for a serial wins
//! - Nothing is ever removed or expired here
//! - Thread-safe (uses RwLock); readers never block each other

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::CertificateRecord;

/// Store of resolved certificates.
///
/// A client owns two independent instances: one for its own client
/// certificates and one for gateway platform certificates.
#[derive(Debug, Default)]
pub struct CertificateCache {
    entries: RwLock<HashMap<String, Arc<CertificateRecord>>>,
}

impl CertificateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning cannot leave the map half-written: the only mutation is a
    // single insert.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<CertificateRecord>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<CertificateRecord>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a certificate by serial.
    pub fn try_get(&self, serial_no: &str) -> Option<Arc<CertificateRecord>> {
        self.read().get(serial_no).cloned()
    }

    /// Store `record` under `serial_no` unless a record is already present.
    ///
    /// Returns `true` if this call inserted. Concurrent callers racing on the
    /// same serial converge: exactly one insert succeeds and every later
    /// [`try_get`](Self::try_get) returns that record.
    pub fn try_insert_if_absent(
        &self,
        serial_no: impl Into<String>,
        record: impl Into<Arc<CertificateRecord>>,
    ) -> bool {
        let mut entries = self.write();
        let serial_no = serial_no.into();
        if entries.contains_key(&serial_no) {
            return false;
        }
        entries.insert(serial_no, record.into());
        true
    }

    /// Whether a serial is cached.
    pub fn contains(&self, serial_no: &str) -> bool {
        self.read().contains_key(serial_no)
    }

    /// Number of cached certificates.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Cached serial numbers, sorted.
    pub fn serial_numbers(&self) -> Vec<String> {
        let mut serials: Vec<String> = self.read().keys().cloned().collect();
        serials.sort();
        serials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{
        platform_a_record, platform_b_record, PLATFORM_A_SERIAL_NO, PLATFORM_B_SERIAL_NO,
    };

    #[test]
    fn test_miss_then_insert() {
        let cache = CertificateCache::new();
        assert!(cache.try_get(PLATFORM_A_SERIAL_NO).is_none());
        assert!(cache.is_empty());

        assert!(cache.try_insert_if_absent(PLATFORM_A_SERIAL_NO, platform_a_record()));
        let record = cache.try_get(PLATFORM_A_SERIAL_NO).unwrap();
        assert_eq!(record.serial_no(), PLATFORM_A_SERIAL_NO);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_does_not_overwrite() {
        let cache = CertificateCache::new();
        assert!(cache.try_insert_if_absent("SERIAL", platform_a_record()));
        assert!(!cache.try_insert_if_absent("SERIAL", platform_b_record()));

        let record = cache.try_get("SERIAL").unwrap();
        assert_eq!(record.serial_no(), PLATFORM_A_SERIAL_NO);
    }

    #[test]
    fn test_instances_are_independent() {
        let client = CertificateCache::new();
        let platform = CertificateCache::new();
        platform.try_insert_if_absent(PLATFORM_B_SERIAL_NO, platform_b_record());

        assert!(!client.contains(PLATFORM_B_SERIAL_NO));
        assert!(platform.contains(PLATFORM_B_SERIAL_NO));
    }

    #[test]
    fn test_serial_numbers_sorted() {
        let cache = CertificateCache::new();
        cache.try_insert_if_absent(PLATFORM_A_SERIAL_NO, platform_a_record());
        cache.try_insert_if_absent(PLATFORM_B_SERIAL_NO, platform_b_record());
        assert_eq!(
            cache.serial_numbers(),
            vec![PLATFORM_B_SERIAL_NO.to_string(), PLATFORM_A_SERIAL_NO.to_string()]
        );
    }
}
