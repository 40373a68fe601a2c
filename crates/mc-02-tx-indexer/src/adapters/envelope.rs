//! # Envelope Decoder
//!
//! Default `CommitmentDecoder`. Reads `<tag> <json> OP_2DROP <locking>`
//! envelopes:
//!
//! | Tag    | Body                                            |
//! |--------|-------------------------------------------------|
//! | `jig`  | `{"kind": str, "type": str, "origin": loc?}`    |
//! | `chan` | `{"recipients": [address, ...]}`                |
//!
//! The owner is always whoever the locking script pays.

use serde::Deserialize;
use shared_types::bitcoin::{Address, Network, Script};
use shared_types::{owner_of, split_envelope, Location, CHANNEL_TAG, JIG_TAG};

use crate::domain::{ChannelUpdate, DecodeError, JigCommitment, OutputClass};
use crate::ports::outbound::CommitmentDecoder;

#[derive(Deserialize)]
struct JigBody {
    #[serde(default)]
    kind: String,
    #[serde(rename = "type", default)]
    type_name: String,
    #[serde(default)]
    origin: Option<Location>,
}

#[derive(Deserialize)]
struct ChannelBody {
    recipients: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EnvelopeDecoder {
    network: Network,
}

impl EnvelopeDecoder {
    pub fn new(network: Network) -> Self {
        Self { network }
    }
}

impl Default for EnvelopeDecoder {
    fn default() -> Self {
        Self::new(Network::Testnet)
    }
}

impl CommitmentDecoder for EnvelopeDecoder {
    fn classify(&self, script: &Script) -> Result<OutputClass, DecodeError> {
        let Some(envelope) = split_envelope(script) else {
            return Ok(if Address::from_script(script, self.network).is_ok() {
                OutputClass::Payment
            } else {
                OutputClass::Unrecognized
            });
        };

        let owner = owner_of(envelope.locking, self.network);
        match envelope.tag.as_slice() {
            JIG_TAG => {
                let body: JigBody = serde_json::from_slice(&envelope.body)
                    .map_err(|e| DecodeError::new(format!("jig body: {e}")))?;
                Ok(OutputClass::JigCommitment(JigCommitment {
                    kind: body.kind,
                    type_name: body.type_name,
                    origin: body.origin,
                    owner,
                }))
            }
            CHANNEL_TAG => {
                let body: ChannelBody = serde_json::from_slice(&envelope.body)
                    .map_err(|e| DecodeError::new(format!("channel body: {e}")))?;
                Ok(OutputClass::ChannelUpdate(ChannelUpdate {
                    recipients: body.recipients,
                    owner,
                }))
            }
            _ => Ok(OutputClass::Unrecognized),
        }
    }
}
