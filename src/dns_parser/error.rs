use thiserror::Error;

/// Error building a DNS query or parsing a DNS packet
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("domain name is empty")]
    EmptyName,
    #[error("domain name has an empty label")]
    EmptyLabel,
    #[error("domain label of {0} bytes exceeds 63 bytes")]
    LabelTooLong(usize),
    #[error("packet is smaller than header size")]
    Truncated,
    #[error("packet has incomplete data")]
    UnexpectedEOF,
    #[error("wrong (too short or too long) size of RDATA")]
    WrongRdataLength,
    #[error("label in domain name has unknown label format")]
    UnknownLabelFormat,
    #[error("compression pointer loops back to offset {0}")]
    CompressionLoop(usize),
    #[error("too many compression pointer jumps")]
    TooManyJumps,
}

impl Error {
    /// Whether the error comes from building a query rather than reading a
    /// response
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::EmptyName | Error::EmptyLabel | Error::LabelTooLong(_)
        )
    }
}
