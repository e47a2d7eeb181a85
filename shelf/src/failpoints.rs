use fail::fail_point;

use crate::error::CatalogResult;

pub const OPEN_LOAN__BEFORE_RECORD: &str = "open_loan.before_record";
pub const CLOSE_LOAN__BEFORE_BOOK_UPDATE: &str = "close_loan.before_book_update";

/// Evaluates the fail point `name`, returning an injected error when it is configured.
///
/// Compiles to a no-op unless the `failpoints` feature is enabled.
pub fn shelf_fail_point(name: &str) -> CatalogResult<()> {
    fail_point!(name, |_| {
        crate::bail!(
            crate::error::ErrorKind::InjectedFault,
            "An error occurred in a fail point",
            format!("The failpoint '{name}' returned an error")
        );
    });

    Ok(())
}
