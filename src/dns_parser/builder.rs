use std::marker::PhantomData;

use byteorder::{BigEndian, WriteBytesExt};

use super::header::HEADER_SIZE;
use super::{Header, Name, Opcode, QueryClass, QueryType, ResponseCode};

pub enum Questions {}

/// Allows to build a DNS query packet
pub struct Builder<S> {
    buf: Vec<u8>,
    _state: PhantomData<S>,
}

impl Builder<Questions> {
    /// Creates a new query
    ///
    /// Initially all sections are empty. You're expected to fill
    /// the questions section with `add_question`
    pub fn new_query(id: u16, recursion: bool) -> Builder<Questions> {
        let mut buf = Vec::with_capacity(512);
        let head = Header {
            id,
            query: true,
            opcode: Opcode::StandardQuery,
            authoritative: false,
            truncated: false,
            recursion_desired: recursion,
            recursion_available: false,
            response_code: ResponseCode::NoError,
            questions: 0,
            answers: 0,
            nameservers: 0,
            additional: 0,
        };
        buf.extend([0u8; HEADER_SIZE].iter());
        head.write(&mut buf[..HEADER_SIZE]);
        Builder {
            buf,
            _state: PhantomData,
        }
    }

    /// Adds a question to the packet
    ///
    /// # Panics
    ///
    /// * There are already 65535 questions in the buffer.
    pub fn add_question(mut self, qname: &Name, qtype: QueryType, qclass: QueryClass) -> Self {
        // Writing into a Vec cannot fail
        let _ = qname.write_to(&mut self.buf);
        let _ = self.buf.write_u16::<BigEndian>(qtype.code());
        let _ = self.buf.write_u16::<BigEndian>(qclass as u16);
        Header::inc_questions(&mut self.buf).expect("Too many questions");
        self
    }

    pub fn is_empty(&self) -> bool {
        Header::question_count(&self.buf) == 0
    }

    /// Returns the final packet
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}
