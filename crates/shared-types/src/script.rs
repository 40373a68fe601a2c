//! # Script Helpers
//!
//! Commitment outputs wrap an ordinary locking script in a data envelope:
//!
//! ```text
//! <tag> <body> OP_2DROP <locking script>
//! ```
//!
//! The envelope is dropped before the locking script runs, so the output
//! stays spendable by its owner. Ownership, address derivation and the UTXO
//! index always look at the locking script.

use bitcoin::opcodes::all::OP_2DROP;
use bitcoin::script::{Builder, Instruction, PushBytesBuf};
use bitcoin::{Address, Network, Script, ScriptBuf};
use std::str::FromStr;

use crate::errors::CodecError;

/// Envelope tag for jig state commitments.
pub const JIG_TAG: &[u8] = b"jig";

/// Envelope tag for channel updates.
pub const CHANNEL_TAG: &[u8] = b"chan";

/// A decoded `<tag> <body> OP_2DROP` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub tag: Vec<u8>,
    pub body: Vec<u8>,
    pub locking: &'a Script,
}

/// Split an envelope prefix off `script`, if it has one.
pub fn split_envelope(script: &Script) -> Option<Envelope<'_>> {
    let mut pushes: Vec<Vec<u8>> = Vec::with_capacity(2);

    for item in script.instruction_indices() {
        let (index, instruction) = item.ok()?;
        match instruction {
            Instruction::PushBytes(bytes) if pushes.len() < 2 => {
                pushes.push(bytes.as_bytes().to_vec());
            }
            Instruction::Op(op) if op == OP_2DROP && pushes.len() == 2 => {
                let body = pushes.pop()?;
                let tag = pushes.pop()?;
                let locking = Script::from_bytes(&script.as_bytes()[index + 1..]);
                return Some(Envelope { tag, body, locking });
            }
            _ => return None,
        }
    }

    None
}

/// The part of `script` that actually locks the output.
pub fn locking_script(script: &Script) -> &Script {
    split_envelope(script).map_or(script, |envelope| envelope.locking)
}

/// Address of the locking script on `network`, or its hex when non-standard.
pub fn owner_of(script: &Script, network: Network) -> String {
    let locking = locking_script(script);
    Address::from_script(locking, network)
        .map(|address| address.to_string())
        .unwrap_or_else(|_| hex::encode(locking.as_bytes()))
}

/// Parse an address on any network.
pub fn parse_address(value: &str) -> Result<Address, CodecError> {
    Address::from_str(value)
        .map(|address| address.assume_checked())
        .map_err(|e| CodecError::Address {
            value: value.to_string(),
            message: e.to_string(),
        })
}

/// Resolve an "address or script" query to the script it indexes under.
pub fn script_for_query(value: &str) -> Result<ScriptBuf, CodecError> {
    if let Ok(address) = parse_address(value) {
        return Ok(address.script_pubkey());
    }
    match hex::decode(value) {
        Ok(bytes) if !bytes.is_empty() => Ok(ScriptBuf::from_bytes(bytes)),
        _ => Err(CodecError::Address {
            value: value.to_string(),
            message: "not an address or hex script".to_string(),
        }),
    }
}

/// Build `<tag> <body> OP_2DROP <locking>`.
pub fn envelope_script(tag: &[u8], body: &[u8], locking: &Script) -> Result<ScriptBuf, CodecError> {
    let tag = PushBytesBuf::try_from(tag.to_vec())?;
    let body = PushBytesBuf::try_from(body.to_vec())?;

    let mut bytes = Builder::new()
        .push_slice(tag)
        .push_slice(body)
        .push_opcode(OP_2DROP)
        .into_script()
        .into_bytes();
    bytes.extend_from_slice(locking.as_bytes());

    Ok(ScriptBuf::from_bytes(bytes))
}
