use byteorder::{BigEndian, ByteOrder};
use log::trace;

use super::header::HEADER_SIZE;
use super::{Error, Header, Name, Packet, RRData, ResourceRecord, ResponseCode, Section};

/// Type, class, TTL and RDLENGTH following a record's owner name
const RR_FIXED_SIZE: usize = 10;

impl Packet {
    /// Parse a response packet
    ///
    /// Only the header is read when the response code is not `NoError`.
    /// Otherwise the question section is skipped and records are decoded
    /// best-effort: a record that fails to decode is dropped, and the first
    /// record that runs past the end of the buffer ends the walk.
    pub fn parse(data: &[u8]) -> Result<Packet, Error> {
        let header = Header::parse(data)?;
        if header.response_code != ResponseCode::NoError {
            return Ok(Packet {
                header,
                records: Vec::new(),
            });
        }

        let mut offset = HEADER_SIZE;
        for _ in 0..header.questions {
            offset = Name::skip(data, offset)? + 4;
        }

        let mut records = Vec::new();
        for index in 0..header.record_count() {
            if offset >= data.len() {
                break;
            }
            let Ok(after_name) = Name::skip(data, offset) else {
                break;
            };
            let Some(fixed) = data.get(after_name..after_name + RR_FIXED_SIZE) else {
                break;
            };
            let typ = BigEndian::read_u16(&fixed[..2]);
            let rdlen = BigEndian::read_u16(&fixed[8..10]) as usize;
            let rdata_at = after_name + RR_FIXED_SIZE;
            if rdata_at + rdlen > data.len() {
                break;
            }

            match RRData::parse(typ, data, rdata_at, rdlen) {
                Ok(rr) if rr.is_unknown() => trace!("skipping record of type {}", typ),
                Ok(rr) => records.push(ResourceRecord {
                    section: section_of(&header, index),
                    data: rr,
                }),
                Err(err) => trace!("skipping malformed record of type {}: {}", typ, err),
            }
            offset = rdata_at + rdlen;
        }

        Ok(Packet { header, records })
    }
}

fn section_of(header: &Header, index: usize) -> Section {
    let answers = header.answers as usize;
    if index < answers {
        Section::Answer
    } else if index < answers + header.nameservers as usize {
        Section::Authority
    } else {
        Section::Additional
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;

    const QUESTION: &[u8] = b"\x07example\x03com\x00\x00\x01\x00\x01";

    fn response(flags: &[u8; 2], counts: [u16; 3], body: &[u8]) -> Vec<u8> {
        let mut packet = b"\x06%".to_vec();
        packet.extend_from_slice(flags);
        packet.extend_from_slice(&1u16.to_be_bytes());
        for count in counts {
            packet.extend_from_slice(&count.to_be_bytes());
        }
        packet.extend_from_slice(QUESTION);
        packet.extend_from_slice(body);
        packet
    }

    const A_RECORD: &[u8] = b"\xc0\x0c\x00\x01\x00\x01\x00\x00\x0e\x10\x00\x04\x5d\xb8\xd8\x22";

    #[test]
    fn parse_a_answer() {
        let packet = Packet::parse(&response(b"\x81\x80", [1, 0, 0], A_RECORD)).unwrap();
        assert_eq!(packet.response_code(), ResponseCode::NoError);
        assert_eq!(
            packet.records,
            vec![ResourceRecord {
                section: Section::Answer,
                data: RRData::A(Ipv4Addr::new(93, 184, 216, 34)),
            }]
        );
    }

    #[test]
    fn error_code_skips_body() {
        let packet = Packet::parse(&response(b"\x81\x83", [1, 0, 0], A_RECORD)).unwrap();
        assert_eq!(packet.response_code(), ResponseCode::NameError);
        assert!(packet.records.is_empty());
    }

    #[test]
    fn sections_follow_counts() {
        let mut body = A_RECORD.to_vec();
        // NS ns1.example.com in authority
        body.extend_from_slice(b"\xc0\x0c\x00\x02\x00\x01\x00\x00\x0e\x10\x00\x06\x03ns1\xc0\x0c");
        // glue A in additional
        body.extend_from_slice(A_RECORD);
        let packet = Packet::parse(&response(b"\x81\x80", [1, 1, 1], &body)).unwrap();
        let sections: Vec<_> = packet.records.iter().map(|rr| rr.section).collect();
        assert_eq!(
            sections,
            vec![Section::Answer, Section::Authority, Section::Additional]
        );
        assert_eq!(
            packet.section(Section::Authority).collect::<Vec<_>>(),
            vec![&RRData::NS("ns1.example.com".to_owned())]
        );
    }

    #[test]
    fn bad_record_does_not_sink_packet() {
        // A record with 3 data bytes, then an unknown HINFO, then a good A
        let mut body = b"\xc0\x0c\x00\x01\x00\x01\x00\x00\x0e\x10\x00\x03\x01\x02\x03".to_vec();
        body.extend_from_slice(b"\xc0\x0c\x00\x0d\x00\x01\x00\x00\x0e\x10\x00\x02\x00\x00");
        body.extend_from_slice(A_RECORD);
        let packet = Packet::parse(&response(b"\x81\x80", [3, 0, 0], &body)).unwrap();
        assert_eq!(packet.records.len(), 1);
        assert_eq!(packet.answers().next().unwrap().ip().unwrap(), "93.184.216.34");
    }

    #[test]
    fn self_referencing_cname_is_skipped() {
        // CNAME whose data is a pointer to itself, at offset 41
        let mut body = b"\xc0\x0c\x00\x05\x00\x01\x00\x00\x0e\x10\x00\x02\xc0\x29".to_vec();
        body.extend_from_slice(A_RECORD);
        let raw = response(b"\x81\x80", [2, 0, 0], &body);
        assert_eq!(&raw[41..43], b"\xc0\x29");
        let packet = Packet::parse(&raw).unwrap();
        assert_eq!(packet.records.len(), 1);
    }

    #[test]
    fn empty_cname_data_is_skipped() {
        // CNAME with RDLENGTH 0 directly followed by an A record
        let mut body = b"\xc0\x0c\x00\x05\x00\x01\x00\x00\x0e\x10\x00\x00".to_vec();
        body.extend_from_slice(A_RECORD);
        let packet = Packet::parse(&response(b"\x81\x80", [2, 0, 0], &body)).unwrap();
        assert_eq!(
            packet.answers().collect::<Vec<_>>(),
            vec![&RRData::A(Ipv4Addr::new(93, 184, 216, 34))]
        );
    }

    #[test]
    fn truncated_record_ends_walk() {
        let mut raw = response(b"\x81\x80", [2, 0, 0], A_RECORD);
        raw.extend_from_slice(&A_RECORD[..10]);
        let packet = Packet::parse(&raw).unwrap();
        assert_eq!(packet.records.len(), 1);
    }

    #[test]
    fn short_packet() {
        assert_eq!(Packet::parse(b"\x06%\x81\x80").unwrap_err(), Error::Truncated);
    }

    #[test]
    fn question_past_end() {
        let raw = b"\x06%\x81\x80\x00\x01\x00\x00\x00\x00\x00\x00\x07exa";
        assert_eq!(Packet::parse(raw).unwrap_err(), Error::UnexpectedEOF);
    }
}
