use thiserror::Error;

/// Errors raised when a table cannot be sized as requested.
///
/// Lookups and removals never fail; only construction and the growth step
/// performed ahead of an insert can.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeError {
    /// The requested initial capacity is zero or its slot array cannot be
    /// laid out in memory.
    #[error("invalid table capacity: {requested}")]
    InvalidCapacity {
        /// The capacity that was asked for.
        requested: usize,
    },

    /// The table needs to grow but the next capacity would overflow the
    /// addressable size.
    #[error("cannot grow table beyond {capacity} slots")]
    CapacityExceeded {
        /// The capacity of the table when growth was attempted.
        capacity: usize,
    },
}
