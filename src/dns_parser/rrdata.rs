use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use byteorder::{BigEndian, ByteOrder};

use super::{Error, Name, QueryType};

/// The enumeration that represents known types of DNS resource records data
///
/// Names embedded in the data are already decompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RRData {
    CNAME(String),
    NS(String),
    PTR(String),
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    MX {
        preference: u16,
        exchange: String,
    },
    TXT(Vec<String>),
    /// Only the primary nameserver of the SOA data is kept
    SOA {
        primary_ns: String,
    },
    CAA {
        flags: u8,
        tag: String,
        value: String,
    },
    // Anything that can't be parsed
    Unknown {
        typ: u16,
        data: Vec<u8>,
    },
}

impl RRData {
    pub fn typ(&self) -> u16 {
        match *self {
            RRData::CNAME(..) => QueryType::CNAME.code(),
            RRData::NS(..) => QueryType::NS.code(),
            RRData::PTR(..) => QueryType::PTR.code(),
            RRData::A(..) => QueryType::A.code(),
            RRData::AAAA(..) => QueryType::AAAA.code(),
            RRData::SRV { .. } => QueryType::SRV.code(),
            RRData::MX { .. } => QueryType::MX.code(),
            RRData::TXT(..) => QueryType::TXT.code(),
            RRData::SOA { .. } => QueryType::SOA.code(),
            RRData::CAA { .. } => QueryType::CAA.code(),
            RRData::Unknown { typ, .. } => typ,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, RRData::Unknown { .. })
    }

    /// The address carried by an A or AAAA record, rendered as text
    pub fn ip(&self) -> Option<String> {
        match *self {
            RRData::A(ip) => Some(ip.to_string()),
            RRData::AAAA(ip) => Some(expanded_ipv6(&ip)),
            _ => None,
        }
    }

    /// Decodes the data of a record of type `typ`
    ///
    /// `offset` is where the data starts inside `original` and `len` is the
    /// RDLENGTH. Embedded names are read from `original` so compression
    /// pointers resolve against the whole packet.
    pub fn parse(typ: u16, original: &[u8], offset: usize, len: usize) -> Result<RRData, Error> {
        let rdata = original
            .get(offset..offset + len)
            .ok_or(Error::UnexpectedEOF)?;
        // Embedded names must end inside the record data
        let name_at = |skip: usize| -> Result<String, Error> {
            if skip >= len {
                return Err(Error::WrongRdataLength);
            }
            let (name, after) = Name::scan(original, offset + skip)?;
            if after > offset + len {
                return Err(Error::WrongRdataLength);
            }
            Ok(name)
        };

        match QueryType::from_code(typ) {
            Some(QueryType::A) => {
                if rdata.len() != 4 {
                    return Err(Error::WrongRdataLength);
                }
                Ok(RRData::A(Ipv4Addr::from(BigEndian::read_u32(rdata))))
            }
            Some(QueryType::AAAA) => {
                if rdata.len() != 16 {
                    return Err(Error::WrongRdataLength);
                }
                Ok(RRData::AAAA(Ipv6Addr::from(BigEndian::read_u128(rdata))))
            }
            Some(QueryType::CNAME) => Ok(RRData::CNAME(name_at(0)?)),
            Some(QueryType::NS) => Ok(RRData::NS(name_at(0)?)),
            Some(QueryType::PTR) => Ok(RRData::PTR(name_at(0)?)),
            Some(QueryType::SOA) => Ok(RRData::SOA {
                primary_ns: name_at(0)?,
            }),
            Some(QueryType::MX) => {
                if rdata.len() < 4 {
                    return Err(Error::WrongRdataLength);
                }
                Ok(RRData::MX {
                    preference: BigEndian::read_u16(&rdata[..2]),
                    exchange: name_at(2)?,
                })
            }
            Some(QueryType::SRV) => {
                if rdata.len() < 8 {
                    return Err(Error::WrongRdataLength);
                }
                Ok(RRData::SRV {
                    priority: BigEndian::read_u16(&rdata[..2]),
                    weight: BigEndian::read_u16(&rdata[2..4]),
                    port: BigEndian::read_u16(&rdata[4..6]),
                    target: name_at(6)?,
                })
            }
            Some(QueryType::TXT) => parse_txt(rdata).map(RRData::TXT),
            Some(QueryType::CAA) => parse_caa(rdata),
            Some(QueryType::All) | None => Ok(RRData::Unknown {
                typ,
                data: rdata.to_vec(),
            }),
        }
    }
}

/// Character strings are kept up to the first one that overruns the data
fn parse_txt(rdata: &[u8]) -> Result<Vec<String>, Error> {
    let mut parts = Vec::new();
    let mut pos = 0;
    while pos < rdata.len() {
        let len = rdata[pos] as usize;
        pos += 1;
        let Some(part) = rdata.get(pos..pos + len) else {
            break;
        };
        parts.push(String::from_utf8_lossy(part).into_owned());
        pos += len;
    }
    if parts.is_empty() {
        return Err(Error::WrongRdataLength);
    }
    Ok(parts)
}

fn parse_caa(rdata: &[u8]) -> Result<RRData, Error> {
    if rdata.len() < 2 {
        return Err(Error::WrongRdataLength);
    }
    let tag_end = 2 + rdata[1] as usize;
    let tag = rdata.get(2..tag_end).ok_or(Error::WrongRdataLength)?;
    Ok(RRData::CAA {
        flags: rdata[0],
        tag: String::from_utf8_lossy(tag).into_owned(),
        value: String::from_utf8_lossy(&rdata[tag_end..]).into_owned(),
    })
}

/// Eight colon-separated hex groups, without `::` shortening
fn expanded_ipv6(ip: &Ipv6Addr) -> String {
    ip.segments()
        .iter()
        .map(|segment| format!("{:x}", segment))
        .collect::<Vec<_>>()
        .join(":")
}

/// The `TYPE:data` form used in result record lists
impl fmt::Display for RRData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RRData::A(ip) => write!(f, "{}", ip),
            RRData::AAAA(ref ip) => f.write_str(&expanded_ipv6(ip)),
            RRData::CNAME(ref name) => write!(f, "CNAME:{}", name),
            RRData::NS(ref name) => write!(f, "NS:{}", name),
            RRData::PTR(ref name) => write!(f, "PTR:{}", name),
            RRData::MX {
                preference,
                ref exchange,
            } => write!(f, "MX:{} {}", preference, exchange),
            RRData::TXT(ref parts) => write!(f, "TXT:{}", parts.join(" ")),
            RRData::SRV {
                priority,
                weight,
                port,
                ref target,
            } => write!(f, "SRV:{} {} {} {}", priority, weight, port, target),
            RRData::SOA { ref primary_ns } => write!(f, "SOA:{}", primary_ns),
            RRData::CAA {
                flags,
                ref tag,
                ref value,
            } => write!(f, "CAA:{} {} {}", flags, tag, value),
            RRData::Unknown { typ, ref data } => write!(f, "TYPE{}:{} bytes", typ, data.len()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn a_record() {
        let data = [93u8, 184, 216, 34];
        let rr = RRData::parse(1, &data, 0, 4).unwrap();
        assert_eq!(rr, RRData::A(Ipv4Addr::new(93, 184, 216, 34)));
        assert_eq!(rr.ip().unwrap(), "93.184.216.34");
        assert_eq!(RRData::parse(1, &data, 0, 3), Err(Error::WrongRdataLength));
    }

    #[test]
    fn aaaa_record_is_not_shortened() {
        let mut data = [0u8; 16];
        data[..2].copy_from_slice(&[0x20, 0x01]);
        data[2..4].copy_from_slice(&[0x0d, 0xb8]);
        data[15] = 1;
        let rr = RRData::parse(28, &data, 0, 16).unwrap();
        assert_eq!(rr.ip().unwrap(), "2001:db8:0:0:0:0:0:1");
        assert_eq!(rr.to_string(), "2001:db8:0:0:0:0:0:1");
        assert_eq!(RRData::parse(28, &data, 0, 4), Err(Error::WrongRdataLength));
    }

    #[test]
    fn mx_with_compressed_exchange() {
        // "example.com" at 0, MX data at 13 pointing back to it
        let packet = b"\x07example\x03com\x00\x00\x0a\x04mail\xc0\x00";
        let rr = RRData::parse(15, packet, 13, 9).unwrap();
        assert_eq!(
            rr,
            RRData::MX {
                preference: 10,
                exchange: "mail.example.com".to_owned()
            }
        );
        assert_eq!(rr.to_string(), "MX:10 mail.example.com");
    }

    #[test]
    fn srv_record() {
        let packet = b"\x00\x01\x00\x05\x14\x66\x04host\x00";
        let rr = RRData::parse(33, packet, 0, packet.len()).unwrap();
        assert_eq!(rr.to_string(), "SRV:1 5 5222 host");
        assert_eq!(RRData::parse(33, packet, 0, 7), Err(Error::WrongRdataLength));
    }

    #[test]
    fn txt_fragments() {
        let data = b"\x05hello\x05world";
        let rr = RRData::parse(16, data, 0, data.len()).unwrap();
        assert_eq!(rr, RRData::TXT(vec!["hello".into(), "world".into()]));
        assert_eq!(rr.to_string(), "TXT:hello world");

        // second fragment overruns, first is kept
        let data = b"\x02hi\x09abc";
        let rr = RRData::parse(16, data, 0, data.len()).unwrap();
        assert_eq!(rr, RRData::TXT(vec!["hi".into()]));

        assert_eq!(RRData::parse(16, b"\x09abc", 0, 4), Err(Error::WrongRdataLength));
    }

    #[test]
    fn soa_keeps_primary_ns() {
        let data = b"\x03ns1\x00\x05admin\x00";
        let rr = RRData::parse(6, data, 0, data.len()).unwrap();
        assert_eq!(rr.to_string(), "SOA:ns1");
    }

    #[test]
    fn caa_record() {
        let data = b"\x00\x05issueletsencrypt.org";
        let rr = RRData::parse(257, data, 0, data.len()).unwrap();
        assert_eq!(
            rr,
            RRData::CAA {
                flags: 0,
                tag: "issue".into(),
                value: "letsencrypt.org".into()
            }
        );
        assert_eq!(rr.to_string(), "CAA:0 issue letsencrypt.org");
        assert_eq!(RRData::parse(257, b"\x00\x09iss", 0, 5), Err(Error::WrongRdataLength));
    }

    #[test]
    fn unknown_type() {
        let rr = RRData::parse(13, b"\x01\x02", 0, 2).unwrap();
        assert!(rr.is_unknown());
        assert_eq!(rr.typ(), 13);
    }

    #[test]
    fn names_must_end_inside_data() {
        let packet = b"\x07example\x03com\x00\x00\x0a\x04mail\xc0\x00";
        // the pointer falls outside the declared 7 bytes
        assert_eq!(RRData::parse(15, packet, 13, 7), Err(Error::WrongRdataLength));
        assert_eq!(RRData::parse(5, packet, 0, 0), Err(Error::WrongRdataLength));
        assert_eq!(RRData::parse(2, packet, 0, 12), Err(Error::WrongRdataLength));
        assert_eq!(
            RRData::parse(2, packet, 0, 13).unwrap(),
            RRData::NS("example.com".to_owned())
        );
    }

    #[test]
    fn data_past_end() {
        assert_eq!(RRData::parse(1, &[1, 2], 0, 4), Err(Error::UnexpectedEOF));
    }
}
