//! Transaction log statistics

use serde::Serialize;

/// Sizes of the logs held by a transaction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransactionStats {
    /// Objects with at least one captured field
    pub objects_count: usize,
    /// Captured field values across all objects
    pub field_values_count: usize,
    /// Arrays with at least one captured element
    pub array_count: usize,
    /// Captured element values across all arrays
    pub array_values_count: usize,
    /// Logged intern table operations
    pub intern_string_count: usize,
    /// Logged string resolutions
    pub resolve_string_count: usize,
}

impl TransactionStats {
    /// Whether the transaction logged nothing
    pub fn is_empty(&self) -> bool {
        *self == TransactionStats::default()
    }

    /// Generate a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "objects_count={}, field_values_count={}, array_count={}, array_values_count={}, \
             intern_string_count={}, resolve_string_count={}",
            self.objects_count,
            self.field_values_count,
            self.array_count,
            self.array_values_count,
            self.intern_string_count,
            self.resolve_string_count
        )
    }
}
