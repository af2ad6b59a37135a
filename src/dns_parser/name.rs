use std::collections::HashSet;
use std::fmt;
use std::io;

use byteorder::WriteBytesExt;

use super::Error;

/// Longest label the wire format can express
pub const MAX_LABEL_LEN: usize = 63;

/// Upper bound on compression pointers followed while reading one name
pub const MAX_POINTER_JUMPS: usize = 10;

const POINTER_MASK: u8 = 0b1100_0000;

/// A domain name checked for wire encoding
///
/// Holds borrowed labels of the presentation form, without the root label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name<'a> {
    labels: Vec<&'a str>,
}

impl<'a> Name<'a> {
    /// Splits a dotted domain name into labels
    ///
    /// A single trailing dot is accepted and dropped. Every remaining label
    /// must be non-empty and at most 63 bytes long.
    pub fn parse(name: &'a str) -> Result<Name<'a>, Error> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        let name = name.strip_suffix('.').unwrap_or(name);
        let labels = name
            .split('.')
            .map(|label| match label.len() {
                0 => Err(Error::EmptyLabel),
                len if len > MAX_LABEL_LEN => Err(Error::LabelTooLong(len)),
                _ => Ok(label),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Name { labels })
    }

    pub fn labels(&self) -> &[&'a str] {
        &self.labels
    }

    pub fn write_to<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        for label in &self.labels {
            writer.write_u8(label.len() as u8)?;
            writer.write_all(label.as_bytes())?;
        }
        writer.write_u8(0)
    }

    /// Reads a possibly compressed name starting at `offset` of `original`
    ///
    /// Returns the dotted name and the offset just past the name as it is
    /// laid out at `offset` (a pointer counts as two bytes there, wherever
    /// it leads). The root name reads as `"."`.
    pub fn scan(original: &[u8], offset: usize) -> Result<(String, usize), Error> {
        let mut labels = Vec::new();
        let mut visited = HashSet::new();
        let mut jumps = 0;
        let mut pos = offset;
        let mut end = None;

        loop {
            let byte = *original.get(pos).ok_or(Error::UnexpectedEOF)?;
            if !visited.insert(pos) {
                return Err(Error::CompressionLoop(pos));
            }

            if byte & POINTER_MASK == POINTER_MASK {
                let low = *original.get(pos + 1).ok_or(Error::UnexpectedEOF)?;
                jumps += 1;
                if jumps > MAX_POINTER_JUMPS {
                    return Err(Error::TooManyJumps);
                }
                end.get_or_insert(pos + 2);
                pos = ((byte & !POINTER_MASK) as usize) << 8 | low as usize;
            } else if byte & POINTER_MASK == 0 {
                if byte == 0 {
                    end.get_or_insert(pos + 1);
                    break;
                }
                let start = pos + 1;
                let stop = start + byte as usize;
                let label = original.get(start..stop).ok_or(Error::UnexpectedEOF)?;
                labels.push(String::from_utf8_lossy(label));
                pos = stop;
            } else {
                return Err(Error::UnknownLabelFormat);
            }
        }

        let name = if labels.is_empty() {
            ".".to_owned()
        } else {
            labels.join(".")
        };
        Ok((name, end.unwrap_or(pos + 1)))
    }

    /// Steps over a name without decoding it
    ///
    /// Compression pointers are not followed, so this never loops.
    pub fn skip(data: &[u8], offset: usize) -> Result<usize, Error> {
        let mut pos = offset;
        loop {
            let byte = *data.get(pos).ok_or(Error::UnexpectedEOF)?;
            if byte & POINTER_MASK == POINTER_MASK {
                return Ok(pos + 2);
            } else if byte & POINTER_MASK == 0 {
                if byte == 0 {
                    return Ok(pos + 1);
                }
                pos += 1 + byte as usize;
            } else {
                return Err(Error::UnknownLabelFormat);
            }
        }
    }
}

impl<'a> fmt::Display for Name<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&self.labels.join("."))
    }
}
