use super::{Header, RRData, ResponseCode};

/// The section of a response a record was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Answer,
    Authority,
    Additional,
}

/// Parsed DNS response
///
/// Holds every record that could be decoded, in wire order. Records of
/// unsupported types and records with malformed data are not included.
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: Header,
    pub records: Vec<ResourceRecord>,
}

/// A single decoded DNS record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub section: Section,
    pub data: RRData,
}

impl Packet {
    pub fn response_code(&self) -> ResponseCode {
        self.header.response_code
    }

    pub fn section(&self, section: Section) -> impl Iterator<Item = &RRData> {
        self.records
            .iter()
            .filter(move |rr| rr.section == section)
            .map(|rr| &rr.data)
    }

    pub fn answers(&self) -> impl Iterator<Item = &RRData> {
        self.section(Section::Answer)
    }
}
