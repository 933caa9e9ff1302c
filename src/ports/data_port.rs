//! Shipment data access port trait.

use crate::domain::error::ShipscopeError;
use crate::domain::shipment::ShipmentRecord;
use std::path::Path;
use std::sync::Arc;

pub trait ShipmentSource {
    /// Load every record from `path`. Column presence is checked here, once.
    fn load_shipments(&self, path: &Path) -> Result<Arc<[ShipmentRecord]>, ShipscopeError>;
}
