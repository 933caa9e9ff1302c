//! Load-once cache in front of a `ShipmentSource`.

use crate::domain::error::ShipscopeError;
use crate::domain::shipment::ShipmentRecord;
use crate::ports::data_port::ShipmentSource;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Caches each path's table for the life of the process. Failed loads are
/// not cached.
pub struct CachedShipmentSource<S> {
    inner: S,
    tables: RefCell<HashMap<PathBuf, Arc<[ShipmentRecord]>>>,
}

impl<S: ShipmentSource> CachedShipmentSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            tables: RefCell::new(HashMap::new()),
        }
    }

    pub fn cached_paths(&self) -> usize {
        self.tables.borrow().len()
    }
}

impl<S: ShipmentSource> ShipmentSource for CachedShipmentSource<S> {
    fn load_shipments(&self, path: &Path) -> Result<Arc<[ShipmentRecord]>, ShipscopeError> {
        if let Some(table) = self.tables.borrow().get(path) {
            log::debug!("cache hit for {}", path.display());
            return Ok(Arc::clone(table));
        }
        let table = self.inner.load_shipments(path)?;
        self.tables
            .borrow_mut()
            .insert(path.to_path_buf(), Arc::clone(&table));
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl ShipmentSource for CountingSource {
        fn load_shipments(&self, path: &Path) -> Result<Arc<[ShipmentRecord]>, ShipscopeError> {
            self.calls.set(self.calls.get() + 1);
            if path.ends_with("missing.csv") {
                return Err(ShipscopeError::DataLoad {
                    path: path.display().to_string(),
                    reason: "not found".into(),
                });
            }
            Ok(vec![ShipmentRecord {
                shipment_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                exporter: "A".into(),
                importer: "B".into(),
                loading_port: "Busan".into(),
                arrival_port: "Tokyo".into(),
                arrival_country: "Japan".into(),
                carrier: "ONE".into(),
                container_count: 1,
            }]
            .into())
        }
    }

    fn source() -> CachedShipmentSource<CountingSource> {
        CachedShipmentSource::new(CountingSource { calls: Cell::new(0) })
    }

    #[test]
    fn loads_each_path_once() {
        let cache = source();
        let first = cache.load_shipments(Path::new("a.csv")).unwrap();
        let second = cache.load_shipments(Path::new("a.csv")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.inner.calls.get(), 1);

        cache.load_shipments(Path::new("b.csv")).unwrap();
        assert_eq!(cache.inner.calls.get(), 2);
        assert_eq!(cache.cached_paths(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = source();
        assert!(cache.load_shipments(Path::new("missing.csv")).is_err());
        assert!(cache.load_shipments(Path::new("missing.csv")).is_err());
        assert_eq!(cache.inner.calls.get(), 2);
        assert_eq!(cache.cached_paths(), 0);
    }
}
