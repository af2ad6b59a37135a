use multimap::MultiMap;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;

use crate::address_family::IpFamily;
use crate::dns_parser::{QueryType, ResponseCode};
use crate::query::QuerySpec;
use crate::transport::Transport;

/// Outcome of a single query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    NoAnswer,
    NXDomain,
    ServFail,
    Refused,
    Timeout,
    Error,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::Success,
        Status::NoAnswer,
        Status::NXDomain,
        Status::ServFail,
        Status::Refused,
        Status::Timeout,
        Status::Error,
    ];

    /// Maps a decoded response to a status
    ///
    /// `has_ip` tells whether the answer section carried an A or AAAA record.
    pub fn classify(code: ResponseCode, has_ip: bool) -> Status {
        match code {
            ResponseCode::NoError if has_ip => Status::Success,
            ResponseCode::NoError => Status::NoAnswer,
            ResponseCode::NameError => Status::NXDomain,
            ResponseCode::ServerFailure => Status::ServFail,
            ResponseCode::Refused => Status::Refused,
            _ => Status::Error,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::NoAnswer => "no_answer",
            Status::NXDomain => "nxdomain",
            Status::ServFail => "servfail",
            Status::Refused => "refused",
            Status::Timeout => "timeout",
            Status::Error => "error",
        }
    }

    /// Message attached to a decoded response with this status
    fn response_message(self, code: ResponseCode) -> Option<String> {
        match self {
            Status::Success => None,
            Status::NoAnswer => Some("no A/AAAA records found".to_owned()),
            Status::NXDomain => Some("domain does not exist".to_owned()),
            Status::ServFail => Some("server failure".to_owned()),
            Status::Refused => Some("query refused".to_owned()),
            Status::Timeout | Status::Error => {
                Some(format!("unexpected response code: {}", u8::from(code)))
            }
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything learnt from executing one [`QuerySpec`]
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub domain: String,
    pub qtype: QueryType,
    pub transport: Transport,
    pub family: IpFamily,
    pub status: Status,
    pub response_code: u8,
    pub resolved_ips: Vec<String>,
    /// Non-address records, formatted as `TYPE:data`
    pub records: Vec<String>,
    /// Empty when nothing could be discovered
    pub authoritative_ns: Vec<String>,
    pub latency: Duration,
    pub error: Option<String>,
    pub timestamp: SystemTime,
}

impl QueryResult {
    /// A result for a query that never produced a decodable response
    pub fn failed(spec: &QuerySpec, status: Status, error: String, latency: Duration) -> QueryResult {
        QueryResult {
            status,
            latency,
            error: Some(error),
            ..QueryResult::pending(spec)
        }
    }

    /// A result for a decoded response, with the status derived from it
    pub fn answered(
        spec: &QuerySpec,
        code: ResponseCode,
        resolved_ips: Vec<String>,
        records: Vec<String>,
    ) -> QueryResult {
        let status = Status::classify(code, !resolved_ips.is_empty());
        QueryResult {
            status,
            response_code: code.into(),
            resolved_ips,
            records,
            error: status.response_message(code),
            ..QueryResult::pending(spec)
        }
    }

    fn pending(spec: &QuerySpec) -> QueryResult {
        QueryResult {
            domain: spec.domain.clone(),
            qtype: spec.qtype,
            transport: spec.transport,
            family: spec.family,
            status: Status::Error,
            response_code: 0,
            resolved_ips: Vec::new(),
            records: Vec::new(),
            authoritative_ns: Vec::new(),
            latency: Duration::ZERO,
            error: None,
            timestamp: SystemTime::now(),
        }
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Running statistics over a stream of results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    total: usize,
    by_status: [usize; 7],
    total_latency: Duration,
    min_latency: Option<Duration>,
    max_latency: Duration,
}

impl Tally {
    pub fn new() -> Tally {
        Tally::default()
    }

    pub fn add(&mut self, result: &QueryResult) {
        self.total += 1;
        self.by_status[result.status.index()] += 1;
        self.total_latency += result.latency;
        self.min_latency = Some(match self.min_latency {
            Some(min) => min.min(result.latency),
            None => result.latency,
        });
        self.max_latency = self.max_latency.max(result.latency);
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn count(&self, status: Status) -> usize {
        self.by_status[status.index()]
    }

    pub fn successful(&self) -> usize {
        self.count(Status::Success)
    }

    pub fn no_answer(&self) -> usize {
        self.count(Status::NoAnswer)
    }

    /// Everything that is neither a success nor an empty answer
    pub fn failed(&self) -> usize {
        self.total - self.successful() - self.no_answer()
    }

    pub fn average_latency(&self) -> Duration {
        match u32::try_from(self.total) {
            Ok(0) => Duration::ZERO,
            Ok(total) => self.total_latency / total,
            Err(_) => Duration::from_secs_f64(self.total_latency.as_secs_f64() / self.total as f64),
        }
    }

    pub fn min_latency(&self) -> Duration {
        self.min_latency.unwrap_or_default()
    }

    pub fn max_latency(&self) -> Duration {
        self.max_latency
    }

    /// Throughput over a batch that took `elapsed` of wall-clock time
    pub fn queries_per_second(&self, elapsed: Duration) -> f64 {
        if elapsed.is_zero() {
            return 0.0;
        }
        self.total as f64 / elapsed.as_secs_f64()
    }
}

impl<'a> Extend<&'a QueryResult> for Tally {
    fn extend<I: IntoIterator<Item = &'a QueryResult>>(&mut self, iter: I) {
        for result in iter {
            self.add(result);
        }
    }
}

/// Drains a result queue until every sender is gone
pub async fn collect(results: &mut mpsc::Receiver<QueryResult>) -> (Vec<QueryResult>, Tally) {
    let mut collected = Vec::new();
    let mut tally = Tally::new();
    while let Some(result) = results.recv().await {
        tally.add(&result);
        collected.push(result);
    }
    (collected, tally)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub total_queries: usize,
    pub successful: usize,
    pub no_answer: usize,
    pub failed: usize,
    pub average_latency: Duration,
}

impl From<&Tally> for Summary {
    fn from(tally: &Tally) -> Summary {
        Summary {
            total_queries: tally.total(),
            successful: tally.successful(),
            no_answer: tally.no_answer(),
            failed: tally.failed(),
            average_latency: tally.average_latency(),
        }
    }
}

/// All results for one domain, keyed by record type name
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedResult {
    pub domain: String,
    pub query_types: BTreeMap<&'static str, QueryResult>,
    pub summary: Summary,
}

/// Groups results by domain, in order of first appearance
///
/// When a domain has several results for the same record type, the last one
/// is kept in `query_types`. The summary still counts all of them.
pub fn consolidate(results: Vec<QueryResult>) -> Vec<ConsolidatedResult> {
    let mut order = Vec::new();
    let mut by_domain = MultiMap::new();
    for result in results {
        if !by_domain.contains_key(&result.domain) {
            order.push(result.domain.clone());
        }
        by_domain.insert(result.domain.clone(), result);
    }

    order
        .into_iter()
        .filter_map(|domain| {
            let results = by_domain.remove(&domain)?;
            let mut tally = Tally::new();
            tally.extend(&results);
            let query_types = results
                .into_iter()
                .map(|result| (result.qtype.name(), result))
                .collect();
            Some(ConsolidatedResult {
                domain,
                query_types,
                summary: Summary::from(&tally),
            })
        })
        .collect()
}
