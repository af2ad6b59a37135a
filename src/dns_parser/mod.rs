//! DNS wire format: building queries and reading responses
//!
//! Nothing in here does I/O.

mod builder;
mod enums;
mod error;
mod header;
mod name;
mod parser;
mod rrdata;
mod structs;

pub use self::builder::{Builder, Questions};
pub use self::enums::{Opcode, QueryClass, QueryType, ResponseCode, UnknownQueryType};
pub use self::error::Error;
pub use self::header::Header;
pub use self::name::{Name, MAX_LABEL_LEN, MAX_POINTER_JUMPS};
pub use self::rrdata::RRData;
pub use self::structs::{Packet, ResourceRecord, Section};

use rand::Rng;

/// Encodes a recursive, single-question query with the given transaction id
pub fn encode_query(domain: &str, qtype: QueryType, id: u16) -> Result<Vec<u8>, Error> {
    let name = Name::parse(domain)?;
    Ok(Builder::new_query(id, true)
        .add_question(&name, qtype, QueryClass::IN)
        .build())
}

/// Like [`encode_query`], drawing the transaction id from `rng`
pub fn encode_query_with<R: Rng + ?Sized>(
    rng: &mut R,
    domain: &str,
    qtype: QueryType,
) -> Result<(u16, Vec<u8>), Error> {
    let id = rng.gen::<u16>();
    encode_query(domain, qtype, id).map(|packet| (id, packet))
}

/// Decodes a response into its header and usable records
pub fn decode_response(data: &[u8]) -> Result<Packet, Error> {
    Packet::parse(data)
}
