use byteorder::{BigEndian, ByteOrder};

use super::{Error, Opcode, ResponseCode};

mod flag {
    pub const QUERY: u16 = 0b1000_0000_0000_0000;
    pub const OPCODE_MASK: u16 = 0b0111_1000_0000_0000;
    pub const AUTHORITATIVE: u16 = 0b0000_0100_0000_0000;
    pub const TRUNCATED: u16 = 0b0000_0010_0000_0000;
    pub const RECURSION_DESIRED: u16 = 0b0000_0001_0000_0000;
    pub const RECURSION_AVAILABLE: u16 = 0b0000_0000_1000_0000;
    pub const RESPONSE_CODE_MASK: u16 = 0b0000_0000_0000_1111;
}

pub const HEADER_SIZE: usize = 12;

/// Represents parsed header of the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    /// Set on queries, clear on responses. This mirrors the QR bit inverted.
    pub query: bool,
    pub opcode: Opcode,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub response_code: ResponseCode,
    pub questions: u16,
    pub answers: u16,
    pub nameservers: u16,
    pub additional: u16,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Header, Error> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Truncated);
        }
        let flags = BigEndian::read_u16(&data[2..4]);
        Ok(Header {
            id: BigEndian::read_u16(&data[..2]),
            query: flags & flag::QUERY == 0,
            opcode: Opcode::from(((flags & flag::OPCODE_MASK) >> flag::OPCODE_MASK.trailing_zeros()) as u8),
            authoritative: flags & flag::AUTHORITATIVE != 0,
            truncated: flags & flag::TRUNCATED != 0,
            recursion_desired: flags & flag::RECURSION_DESIRED != 0,
            recursion_available: flags & flag::RECURSION_AVAILABLE != 0,
            response_code: ResponseCode::from((flags & flag::RESPONSE_CODE_MASK) as u8),
            questions: BigEndian::read_u16(&data[4..6]),
            answers: BigEndian::read_u16(&data[6..8]),
            nameservers: BigEndian::read_u16(&data[8..10]),
            additional: BigEndian::read_u16(&data[10..12]),
        })
    }

    /// Write a header to a buffer slice
    ///
    /// # Panics
    ///
    /// When buffer size is not exactly 12 bytes
    pub fn write(&self, data: &mut [u8]) {
        assert_eq!(data.len(), HEADER_SIZE);

        let mut flags = 0u16;
        if !self.query {
            flags |= flag::QUERY;
        }
        flags |= (u8::from(self.opcode) as u16) << flag::OPCODE_MASK.trailing_zeros() & flag::OPCODE_MASK;
        if self.authoritative {
            flags |= flag::AUTHORITATIVE;
        }
        if self.truncated {
            flags |= flag::TRUNCATED;
        }
        if self.recursion_desired {
            flags |= flag::RECURSION_DESIRED;
        }
        if self.recursion_available {
            flags |= flag::RECURSION_AVAILABLE;
        }
        flags |= u8::from(self.response_code) as u16 & flag::RESPONSE_CODE_MASK;

        BigEndian::write_u16(&mut data[..2], self.id);
        BigEndian::write_u16(&mut data[2..4], flags);
        BigEndian::write_u16(&mut data[4..6], self.questions);
        BigEndian::write_u16(&mut data[6..8], self.answers);
        BigEndian::write_u16(&mut data[8..10], self.nameservers);
        BigEndian::write_u16(&mut data[10..12], self.additional);
    }

    pub fn inc_questions(data: &mut [u8]) -> Option<u16> {
        let count = BigEndian::read_u16(&data[4..6]).checked_add(1)?;
        BigEndian::write_u16(&mut data[4..6], count);
        Some(count)
    }

    pub fn question_count(data: &[u8]) -> u16 {
        BigEndian::read_u16(&data[4..6])
    }

    /// Total number of resource records across the answer, authority and
    /// additional sections
    pub fn record_count(&self) -> usize {
        self.answers as usize + self.nameservers as usize + self.additional as usize
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_response_header() {
        let data = b"\x06%\x81\x83\x00\x01\x00\x00\x00\x01\x00\x00";
        let header = Header::parse(data).unwrap();
        assert_eq!(header.id, 1573);
        assert!(!header.query);
        assert_eq!(header.opcode, Opcode::StandardQuery);
        assert!(header.recursion_desired);
        assert!(header.recursion_available);
        assert_eq!(header.response_code, ResponseCode::NameError);
        assert_eq!(header.questions, 1);
        assert_eq!(header.nameservers, 1);
        assert_eq!(header.record_count(), 1);
    }

    #[test]
    fn write_query_header() {
        let header = Header {
            id: 1573,
            query: true,
            opcode: Opcode::StandardQuery,
            authoritative: false,
            truncated: false,
            recursion_desired: true,
            recursion_available: false,
            response_code: ResponseCode::NoError,
            questions: 1,
            answers: 0,
            nameservers: 0,
            additional: 0,
        };
        let mut buf = [0u8; 12];
        header.write(&mut buf);
        assert_eq!(&buf[..], b"\x06%\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00");
        assert_eq!(Header::parse(&buf).unwrap(), header);
    }

    #[test]
    fn short_header() {
        assert_eq!(Header::parse(b"\x00\x01\x81"), Err(Error::Truncated));
    }
}
