use derive_more::Display;

/// The target used for structured probe events.
pub const TARGET: &str = "relay_probe";

/// The Kind of the Probe.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// When the Lifecycle of the Relay changes, like starting or shutting down.
    #[display(fmt = "lifecycle")]
    Lifecycle,
    /// Registration state of the relay on the hub.
    #[display(fmt = "registration")]
    Registration,
    /// Relaying a transaction state.
    #[display(fmt = "relay_tx")]
    RelayTx,
    /// Resending a stuck transaction with a bumped gas price.
    #[display(fmt = "resend")]
    Resend,
}
