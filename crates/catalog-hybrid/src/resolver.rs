use std::sync::Arc;
use tracing::{debug, warn};

use catalog_core::traits::SupplierDirectory;
use catalog_core::types::SupplierFilter;
use catalog_core::Result;

/// Turns an optional supplier name fragment into a `SupplierFilter`.
///
/// An unknown supplier is not an error: the search runs unfiltered.
#[derive(Clone)]
pub struct SupplierResolver {
    directory: Arc<dyn SupplierDirectory>,
}

impl SupplierResolver {
    pub fn new(directory: Arc<dyn SupplierDirectory>) -> Self { Self { directory } }

    pub async fn resolve(&self, fragment: Option<&str>) -> Result<SupplierFilter> {
        let Some(fragment) = fragment.map(str::trim).filter(|f| !f.is_empty()) else {
            return Ok(SupplierFilter::Unfiltered);
        };
        match self.directory.find_supplier(fragment).await {
            Ok(Some(id)) => {
                debug!(fragment, supplier_id = %id, "supplier resolved");
                Ok(SupplierFilter::Supplier(id))
            }
            Ok(None) => {
                debug!(fragment, "no supplier matched; searching unfiltered");
                Ok(SupplierFilter::Unfiltered)
            }
            Err(e) => {
                warn!(fragment, error = %e, "supplier lookup failed; searching unfiltered");
                Ok(SupplierFilter::Unfiltered)
            }
        }
    }
}
