//! REST handlers.
//!
//! | Method | Path                            | Response                    |
//! |--------|---------------------------------|-----------------------------|
//! | POST   | `/broadcast`                    | `{txid}`                    |
//! | GET    | `/tx/:txid`                     | transaction view            |
//! | GET    | `/txns`                         | every transaction           |
//! | GET    | `/utxos/:address?history=`      | UTXOs                       |
//! | POST   | `/utxos` `{locs}`               | UTXOs at known locations    |
//! | GET    | `/utxos/:loc/spent`             | spent status                |
//! | GET    | `/fund/:address?satoshis=`      | funding UTXO                |
//! | GET    | `/jigs`                         | every jig record            |
//! | GET    | `/jig/:loc`                     | jig record                  |
//! | GET    | `/jigs/:address`                | jig records held            |
//! | POST   | `/jigs/search`                  | jig records equal to body   |
//! | POST   | `/jigs/address/:address` query  | projected held jig records  |
//! | POST   | `/jigs/script/:script` query    | projected held jig records  |
//! | POST   | `/jigs/kind/:kind` query        | locations                   |
//! | POST   | `/jigs/origin/:origin` query    | locations                   |
//! | GET    | `/jigs/origin/:origin/current`  | latest jig record           |
//! | GET    | `/channel/:loc`                 | channel record              |
//! | POST   | `/messages` message             | `true`                      |
//! | GET    | `/messages/:id`                 | message                     |

pub mod ledger;
pub mod messages;
pub mod records;
