//! Output classification.

use shared_types::Location;

/// What an output script represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputClass {
    /// An ordinary standard payment.
    Payment,
    JigCommitment(JigCommitment),
    ChannelUpdate(ChannelUpdate),
    /// Anything else. Not an error.
    Unrecognized,
}

/// Decoded jig state commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JigCommitment {
    pub kind: String,
    pub type_name: String,
    /// `None` when this output is the jig's first state.
    pub origin: Option<Location>,
    pub owner: String,
}

/// Decoded channel update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUpdate {
    pub recipients: Vec<String>,
    pub owner: String,
}
