use std::fmt;
use std::str::FromStr;

/// The record types this crate knows how to ask for
///
/// Each variant carries its QTYPE wire code as the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryType {
    A = 1,
    NS = 2,
    CNAME = 5,
    SOA = 6,
    PTR = 12,
    MX = 15,
    TXT = 16,
    AAAA = 28,
    SRV = 33,
    All = 255,
    CAA = 257,
}

impl QueryType {
    /// Every concrete record type, in the order they are expanded for a
    /// domain. `All` is left out, it would duplicate the others.
    pub const CONCRETE: [QueryType; 10] = [
        QueryType::A,
        QueryType::AAAA,
        QueryType::MX,
        QueryType::TXT,
        QueryType::NS,
        QueryType::SOA,
        QueryType::CNAME,
        QueryType::PTR,
        QueryType::SRV,
        QueryType::CAA,
    ];

    pub fn from_code(code: u16) -> Option<QueryType> {
        use self::QueryType::*;
        match code {
            1 => Some(A),
            2 => Some(NS),
            5 => Some(CNAME),
            6 => Some(SOA),
            12 => Some(PTR),
            15 => Some(MX),
            16 => Some(TXT),
            28 => Some(AAAA),
            33 => Some(SRV),
            255 => Some(All),
            257 => Some(CAA),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        use self::QueryType::*;
        match self {
            A => "A",
            NS => "NS",
            CNAME => "CNAME",
            SOA => "SOA",
            PTR => "PTR",
            MX => "MX",
            TXT => "TXT",
            AAAA => "AAAA",
            SRV => "SRV",
            All => "ANY",
            CAA => "CAA",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a record type name is not one of the supported types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown record type {0:?}")]
pub struct UnknownQueryType(pub String);

impl FromStr for QueryType {
    type Err = UnknownQueryType;

    fn from_str(s: &str) -> Result<QueryType, UnknownQueryType> {
        let upper = s.trim().to_ascii_uppercase();
        [QueryType::All]
            .into_iter()
            .chain(QueryType::CONCRETE)
            .find(|typ| typ.name() == upper)
            .ok_or_else(|| UnknownQueryType(s.to_owned()))
    }
}

/// The class of a query; only the Internet class is ever sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClass {
    IN = 1,
}

/// The operation requested by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    StandardQuery,
    InverseQuery,
    ServerStatusRequest,
    Reserved(u8),
}

impl From<u8> for Opcode {
    fn from(code: u8) -> Opcode {
        match code {
            0 => Opcode::StandardQuery,
            1 => Opcode::InverseQuery,
            2 => Opcode::ServerStatusRequest,
            x => Opcode::Reserved(x),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        match op {
            Opcode::StandardQuery => 0,
            Opcode::InverseQuery => 1,
            Opcode::ServerStatusRequest => 2,
            Opcode::Reserved(x) => x,
        }
    }
}

/// The RCODE carried in the low nibble of the header flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(u8),
}

impl From<u8> for ResponseCode {
    fn from(code: u8) -> ResponseCode {
        use self::ResponseCode::*;
        match code {
            0 => NoError,
            1 => FormatError,
            2 => ServerFailure,
            3 => NameError,
            4 => NotImplemented,
            5 => Refused,
            x => Reserved(x & 0x0F),
        }
    }
}

impl From<ResponseCode> for u8 {
    fn from(r: ResponseCode) -> u8 {
        use self::ResponseCode::*;
        match r {
            NoError => 0,
            FormatError => 1,
            ServerFailure => 2,
            NameError => 3,
            NotImplemented => 4,
            Refused => 5,
            Reserved(x) => x,
        }
    }
}
