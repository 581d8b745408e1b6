#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A fresh full snapshot of the currently visible rows, re-read from
    /// scratch this tick. Only the trailing rows beyond the last seen count
    /// are processed.
    RowsObserved(Vec<Vec<String>>),
    /// The driver failed to produce a snapshot this tick.
    ObservationFailed,
}
