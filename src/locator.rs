//! Pick an adapter by a fragment of its path or comm identifier.

use crate::driver::{Adapter, CecDriver};
use crate::{CecError, Result};

/// How many adapters are asked of the driver.
pub const MAX_ADAPTERS: usize = 10;

/// First adapter whose path or comm contains `fragment`, in the order given.
///
/// Matching is a plain, case sensitive substring test.
/// An empty fragment matches any adapter.
pub fn select<'a>(adapters: &'a [Adapter], fragment: &str) -> Option<&'a Adapter> {
    adapters
        .iter()
        .find(|a| a.path.contains(fragment) || a.comm.contains(fragment))
}

/// Ask `driver` for its adapters and [select] one.
pub fn find_matching(driver: &mut dyn CecDriver, fragment: &str) -> Result<Adapter> {
    let adapters = driver.enumerate_adapters(MAX_ADAPTERS)?;
    log::debug!("{} adapters found", adapters.len());
    for a in &adapters {
        log::trace!("adapter {} ({})", a.path, a.comm);
    }
    select(&adapters, fragment)
        .cloned()
        .ok_or_else(|| CecError::NoAdapterFound(fragment.to_string()))
}
