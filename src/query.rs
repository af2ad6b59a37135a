use thiserror::Error;

use crate::address_family::IpFamily;
use crate::dns_parser::QueryType;
use crate::transport::Transport;

/// One query to perform: what to ask for and how to send it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySpec {
    pub domain: String,
    pub qtype: QueryType,
    pub transport: Transport,
    pub family: IpFamily,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSpec {
    #[error("domain cannot be empty")]
    EmptyDomain,
    #[error("domain must contain at least one dot")]
    NoDot,
    #[error("domain cannot contain whitespace")]
    Whitespace,
}

impl QuerySpec {
    pub fn new<S: Into<String>>(
        domain: S,
        qtype: QueryType,
        transport: Transport,
        family: IpFamily,
    ) -> QuerySpec {
        QuerySpec {
            domain: domain.into(),
            qtype,
            transport,
            family,
        }
    }

    /// Checks the domain the way rows are checked on ingestion
    pub fn validate(&self) -> Result<(), InvalidSpec> {
        if self.domain.is_empty() {
            return Err(InvalidSpec::EmptyDomain);
        }
        if !self.domain.contains('.') {
            return Err(InvalidSpec::NoDot);
        }
        if self.domain.chars().any(char::is_whitespace) {
            return Err(InvalidSpec::Whitespace);
        }
        Ok(())
    }

    pub fn with_transport(&self, transport: Transport) -> QuerySpec {
        QuerySpec {
            transport,
            ..self.clone()
        }
    }

    pub fn with_qtype(&self, qtype: QueryType) -> QuerySpec {
        QuerySpec {
            qtype,
            ..self.clone()
        }
    }

    /// One spec per concrete record type, keeping domain, transport and family
    pub fn expand_all_types(&self) -> impl Iterator<Item = QuerySpec> + '_ {
        QueryType::CONCRETE
            .into_iter()
            .map(move |qtype| self.with_qtype(qtype))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn spec(domain: &str) -> QuerySpec {
        QuerySpec::new(domain, QueryType::A, Transport::Udp, IpFamily::V4)
    }

    #[test]
    fn validation() {
        assert_eq!(spec("example.com").validate(), Ok(()));
        assert_eq!(spec("").validate(), Err(InvalidSpec::EmptyDomain));
        assert_eq!(spec("localhost").validate(), Err(InvalidSpec::NoDot));
        assert_eq!(spec("exa mple.com").validate(), Err(InvalidSpec::Whitespace));
    }

    #[test]
    fn overrides_keep_other_fields() {
        let base = spec("example.com");
        let tcp = base.with_transport(Transport::Tcp);
        assert_eq!(tcp.transport, Transport::Tcp);
        assert_eq!(tcp.domain, base.domain);
        assert_eq!(tcp.qtype, base.qtype);

        let mx = base.with_qtype(QueryType::MX);
        assert_eq!(mx.qtype, QueryType::MX);
        assert_eq!(mx.family, IpFamily::V4);
    }

    #[test]
    fn expansion_covers_concrete_types() {
        let all: Vec<_> = spec("example.com").expand_all_types().collect();
        assert_eq!(all.len(), QueryType::CONCRETE.len());
        assert!(all.iter().all(|s| s.domain == "example.com"));
        assert!(!all.iter().any(|s| s.qtype == QueryType::All));
    }
}
