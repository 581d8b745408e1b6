use thiserror::Error;

/// External collaborator that owns the record source view.
///
/// The engine only ever asks it to advance and to re-read what is currently
/// visible. How the view is acquired, authenticated or rendered is entirely
/// the driver's concern; the core never sees markup, only flattened cells.
pub trait PageDriver {
    /// Best-effort request to reveal more rows (scroll or equivalent).
    /// Failures are logged and otherwise ignored.
    fn advance(&mut self) -> Result<(), DriverError>;

    /// A full, fresh snapshot of the currently visible rows as ordered cell
    /// arrays. Rows with fewer than [`crate::MIN_ROW_CELLS`] cells are
    /// unparseable and must already be dropped here, not in the core.
    fn visible_rows(&mut self) -> Result<Vec<Vec<String>>, DriverError>;

    /// Optional secondary advance affordance (an explicit next-page
    /// control). Drivers without one keep the default no-op.
    fn request_next_page(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The underlying resource (browser, session, endpoint) has terminated;
    /// the harvest winds down gracefully instead of burning the stall
    /// budget.
    #[error("view source gone: {0}")]
    Gone(String),
    /// A single read failed; worth retrying on the next tick.
    #[error("read failed: {0}")]
    Read(String),
    /// The driver could not be constructed. Fatal at startup.
    #[error("driver setup failed: {0}")]
    Setup(String),
}
