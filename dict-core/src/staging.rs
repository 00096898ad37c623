//! Tab set copied into the staging spreadsheet.

use std::collections::BTreeSet;

/// Tab holding entries that failed to map to the registry.
///
/// It is not one of the managed dictionary tabs but is always staged.
pub const MAPPING_FAILURES_TAB: &str = "Mapping Failures";

/// Build the staging tab set: the managed tabs plus [`MAPPING_FAILURES_TAB`].
pub fn staging_tabs<I, S>(managed: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tabs: BTreeSet<String> = managed.into_iter().map(Into::into).collect();
    tabs.insert(MAPPING_FAILURES_TAB.to_string());
    tabs
}
