use thiserror::Error;

/// Errors surfaced by the radio control surface.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Transmitter is not powered and could not be brought up.
    #[error("radio is not powered")]
    NotPowered,
    /// Another advertisement set is still active on the controller.
    #[error("radio is busy with another advertisement")]
    AlreadyBusy,
    /// The address kind cannot carry a caller-chosen address.
    #[error("address kind cannot carry an explicit address")]
    IncompatibleAddressMode,
    /// Controller refused the command with a platform status code.
    #[error("hardware rejected command (status {0:#06x})")]
    HardwareRejected(u16),
    /// Command did not complete in time.
    #[error("radio command timed out")]
    Timeout,
    /// Advertising parameters failed validation before any hardware call.
    #[error("invalid advertising parameters: {0}")]
    InvalidParameters(&'static str),
}

#[cfg(test)]
mod tests {
    use super::RadioError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(RadioError::NotPowered.to_string(), "radio is not powered");
        assert_eq!(
            RadioError::HardwareRejected(0x0c).to_string(),
            "hardware rejected command (status 0x000c)"
        );
        assert_eq!(
            RadioError::InvalidParameters("min_interval_ms > max_interval_ms").to_string(),
            "invalid advertising parameters: min_interval_ms > max_interval_ms"
        );
    }
}
