//! Status codes returned across the C ABI.

use crate::metrics::Collected;

/// Result of an exported read call.
///
/// Non-negative values mean the output record was written.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryStatus {
    /// Every field group was read
    Ok = 0,
    /// Some field groups failed; their fields are zero
    Partial = 1,
    /// The output pointer was null; nothing was written
    NullPointer = -1,
    /// An argument could not be decoded; the record was zeroed
    InvalidArgument = -2,
    /// Collection panicked; the record was zeroed
    Panicked = -3,
}

impl TelemetryStatus {
    /// Status for a finished collection.
    pub fn from_collected<S>(collected: &Collected<S>) -> Self {
        if collected.is_complete() {
            TelemetryStatus::Ok
        } else {
            TelemetryStatus::Partial
        }
    }

    /// Whether the output record holds data from this call.
    pub fn is_written(self) -> bool {
        (self as i32) >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{FieldFailure, FieldGroup, MemorySnapshot};

    #[test]
    fn test_status_from_collected() {
        let mut collected: Collected<MemorySnapshot> = Collected::new();
        assert_eq!(TelemetryStatus::from_collected(&collected), TelemetryStatus::Ok);

        collected.failures.push(FieldFailure {
            group: FieldGroup::Handles,
            reason: "unsupported".to_string(),
        });
        assert_eq!(TelemetryStatus::from_collected(&collected), TelemetryStatus::Partial);
    }

    #[test]
    fn test_status_codes_are_stable() {
        assert_eq!(TelemetryStatus::Ok as i32, 0);
        assert_eq!(TelemetryStatus::Partial as i32, 1);
        assert_eq!(TelemetryStatus::NullPointer as i32, -1);
        assert!(TelemetryStatus::Partial.is_written());
        assert!(!TelemetryStatus::Panicked.is_written());
    }
}
