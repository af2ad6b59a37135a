//! Executes one query end to end
//!
//! A query goes through building, sending (with retries), decoding and
//! classification. When the response names no nameservers, one extra NS
//! lookup is made for the base domain.

use log::{debug, trace, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::address_family::IpFamily;
use crate::config::Config;
use crate::dns_parser::{self, Packet, QueryType, RRData, Section};
use crate::query::QuerySpec;
use crate::result::{QueryResult, Status};
use crate::transport::{Exchanger, Network, Target, Transport, TransportError};

/// How often and how patiently a failed exchange is repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub retries: u32,
    /// Pause before each retry
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> RetryPolicy {
        RetryPolicy {
            retries: config.retry_count,
            delay: config.retry_delay,
        }
    }
}

/// Runs queries against the configured servers
///
/// Cloning is cheap; clones share the configuration.
#[derive(Debug)]
pub struct Resolver<X: Exchanger = Network> {
    config: Arc<Config>,
    exchanger: Arc<X>,
}

impl<X: Exchanger> Clone for Resolver<X> {
    fn clone(&self) -> Resolver<X> {
        Resolver {
            config: self.config.clone(),
            exchanger: self.exchanger.clone(),
        }
    }
}

impl Resolver<Network> {
    pub fn new(config: Config) -> Resolver {
        Resolver::with_exchanger(config, Network)
    }
}

impl<X: Exchanger> Resolver<X> {
    pub fn with_exchanger(config: Config, exchanger: X) -> Resolver<X> {
        Resolver {
            config: Arc::new(config),
            exchanger: Arc::new(exchanger),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&*self.config)
    }

    /// Executes `spec`, always producing exactly one result
    ///
    /// Latency covers building, every attempt and decoding, but not the
    /// nameserver fallback lookup.
    pub async fn execute(&self, spec: &QuerySpec) -> QueryResult {
        let start = Instant::now();

        let Some(server) = self.config.server_for(spec.family) else {
            let error = format!("no DNS server configured for {}", spec.family);
            return QueryResult::failed(spec, Status::Error, error, start.elapsed());
        };

        let encoded = {
            let mut rng = rand::thread_rng();
            dns_parser::encode_query_with(&mut rng, &spec.domain, spec.qtype)
        };
        let (id, packet) = match encoded {
            Ok(encoded) => encoded,
            Err(err) => {
                let error = format!("failed to build query: {}", err);
                return QueryResult::failed(spec, Status::Error, error, start.elapsed());
            }
        };

        let target = Target {
            server,
            transport: spec.transport,
            family: spec.family,
            timeout: self.config.timeout,
        };
        debug!(
            "query {:#06x}: {} {} via {} over {}/{}",
            id, spec.domain, spec.qtype, server, spec.transport, spec.family
        );

        let response = match self.send(&packet, &target).await {
            Ok(response) => response,
            Err(err) => {
                let status = if err.is_timeout() {
                    Status::Timeout
                } else {
                    Status::Error
                };
                return QueryResult::failed(spec, status, err.to_string(), start.elapsed());
            }
        };

        let decoded = match dns_parser::decode_response(&response) {
            Ok(decoded) => decoded,
            Err(err) => {
                let error = format!("failed to parse response: {}", err);
                return QueryResult::failed(spec, Status::Error, error, start.elapsed());
            }
        };
        if decoded.header.id != id {
            debug!(
                "query {:#06x}: response carries id {:#06x}",
                id, decoded.header.id
            );
        }

        let (resolved_ips, records) = split_records(&decoded);
        let mut result =
            QueryResult::answered(spec, decoded.response_code(), resolved_ips, records);
        result.latency = start.elapsed();

        result.authoritative_ns = authority_nameservers(&decoded);
        if result.authoritative_ns.is_empty() {
            result.authoritative_ns = self.lookup_nameservers(&spec.domain).await;
        }

        debug!(
            "query {:#06x}: {} in {:?}",
            id, result.status, result.latency
        );
        result
    }

    async fn send(&self, packet: &[u8], target: &Target) -> Result<Vec<u8>, TransportError> {
        let policy = self.retry_policy();
        let mut attempt = 1;
        loop {
            match self.exchanger.exchange(packet, target).await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < policy.attempts() => {
                    warn!(
                        "attempt {}/{} to {} failed: {}",
                        attempt,
                        policy.attempts(),
                        target.server,
                        err
                    );
                    tokio::time::sleep(policy.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Asks the IPv4 server over UDP for the NS records of the base domain
    ///
    /// A single attempt is made and any failure yields an empty list.
    async fn lookup_nameservers(&self, domain: &str) -> Vec<String> {
        let Some(server) = self.config.ipv4_server else {
            return Vec::new();
        };
        let base = base_domain(domain);
        let encoded = {
            let mut rng = rand::thread_rng();
            dns_parser::encode_query_with(&mut rng, base, QueryType::NS)
        };
        let Ok((_, packet)) = encoded else {
            return Vec::new();
        };

        let target = Target {
            server,
            transport: Transport::Udp,
            family: IpFamily::V4,
            timeout: self.config.timeout,
        };
        let response = match self.exchanger.exchange(&packet, &target).await {
            Ok(response) => response,
            Err(err) => {
                trace!("NS lookup for {} failed: {}", base, err);
                return Vec::new();
            }
        };
        match dns_parser::decode_response(&response) {
            Ok(decoded) => delegated_nameservers(&decoded),
            Err(err) => {
                trace!("NS lookup for {} returned garbage: {}", base, err);
                Vec::new()
            }
        }
    }
}

/// The last two labels of `domain`, or `domain` itself if it has fewer
pub fn base_domain(domain: &str) -> &str {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    match domain.rmatch_indices('.').nth(1) {
        Some((dot, _)) => &domain[dot + 1..],
        None => domain,
    }
}

/// Addresses and formatted records reported for a response
///
/// Both come from the answer section. When it is empty, the non-address
/// records of the other sections are reported instead.
fn split_records(packet: &Packet) -> (Vec<String>, Vec<String>) {
    let mut ips = Vec::new();
    let mut records = Vec::new();
    for rr in packet.answers() {
        match rr.ip() {
            Some(ip) => ips.push(ip),
            None => records.push(rr.to_string()),
        }
    }
    if ips.is_empty() && records.is_empty() {
        records.extend(
            packet
                .section(Section::Authority)
                .chain(packet.section(Section::Additional))
                .filter(|rr| rr.ip().is_none())
                .map(RRData::to_string),
        );
    }
    (ips, records)
}

/// Nameservers named by the authority and additional sections, deduplicated
fn authority_nameservers(packet: &Packet) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let sections = packet
        .records
        .iter()
        .filter(|rr| rr.section != Section::Answer);
    for rr in sections {
        let ns = match rr.data {
            RRData::NS(ref name) => name.clone(),
            RRData::SOA { ref primary_ns } if rr.section == Section::Authority => {
                format!("SOA:{}", primary_ns)
            }
            _ => continue,
        };
        if !found.contains(&ns) {
            found.push(ns);
        }
    }
    found
}

/// NS records of the first section that has any
fn delegated_nameservers(packet: &Packet) -> Vec<String> {
    [Section::Answer, Section::Authority, Section::Additional]
        .into_iter()
        .map(|section| {
            packet
                .section(section)
                .filter_map(|rr| match rr {
                    RRData::NS(name) => Some(name.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
        })
        .find(|names| !names.is_empty())
        .unwrap_or_default()
}
