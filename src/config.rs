use log::{debug, warn};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

use crate::address_family::IpFamily;
use crate::dns_parser::QueryType;
use crate::query::QuerySpec;
use crate::transport::Transport;

pub const DNS_PORT: u16 = 53;

pub const MIN_WORKERS: usize = 1;
/// Auto-scaling never goes past this unless `max_workers` is raised
pub const DEFAULT_MAX_WORKERS: usize = 50;
/// Hard ceiling for any worker count
pub const ABSOLUTE_MAX_WORKERS: usize = 200;

pub const MAX_RETRIES: u32 = 10;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid DNS server {0:?}: {1}")]
    InvalidServer(String, &'static str),
    #[error("too many DNS server arguments (max 2: ipv4 and ipv6)")]
    TooManyServers,
    #[error("at least one DNS server (IPv4 or IPv6) must be specified")]
    NoServers,
    #[error("no DNS server configured for {0} queries")]
    NoServerFor(IpFamily),
    #[error("DNS port must be between 1 and 65535")]
    InvalidPort,
    #[error("timeout must be positive")]
    InvalidTimeout,
    #[error("retry count {0} must be between 0 and 10")]
    InvalidRetryCount(u32),
    #[error("worker count {0} must be between 1 and 200")]
    InvalidWorkerCount(usize),
}

/// Settings shared read-only by every query of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub ipv4_server: Option<SocketAddr>,
    pub ipv6_server: Option<SocketAddr>,
    /// Deadline of a single transport attempt
    pub timeout: Duration,
    /// Attempts made after the first one fails
    pub retry_count: u32,
    /// Pause between attempts
    pub retry_delay: Duration,
    /// Fixed worker count, or 0 to scale with the batch size
    pub workers: usize,
    /// Upper bound for the auto-scaled worker count
    pub max_workers: usize,
    pub transport_override: Option<Transport>,
    /// Query every record type for each distinct domain
    pub query_all: bool,
}

impl Default for Config {
    /// Google Public DNS for both families
    fn default() -> Config {
        Config {
            ipv4_server: Some(SocketAddr::new(
                Ipv4Addr::new(8, 8, 8, 8).into(),
                DNS_PORT,
            )),
            ipv6_server: Some(SocketAddr::new(
                Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888).into(),
                DNS_PORT,
            )),
            timeout: DEFAULT_TIMEOUT,
            retry_count: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            workers: 0,
            max_workers: DEFAULT_MAX_WORKERS,
            transport_override: None,
            query_all: false,
        }
    }
}

impl Config {
    /// Replaces the servers with up to two `IP`, `IP:PORT` or `[IPv6]:PORT`
    /// arguments
    ///
    /// No argument keeps the current servers. A single server answers for
    /// both families. Two servers of different families are assigned by
    /// family; two of the same family fall back to the first one for both.
    pub fn with_servers(mut self, args: &[&str]) -> Result<Config, ConfigError> {
        let servers = args
            .iter()
            .map(|&arg| parse_server(arg))
            .collect::<Result<Vec<_>, _>>()?;

        match servers[..] {
            [] => {}
            [only] => {
                self.ipv4_server = Some(only);
                self.ipv6_server = Some(only);
            }
            [first, second] => {
                let (v4, v6) = match (IpFamily::of(&first.ip()), IpFamily::of(&second.ip())) {
                    (IpFamily::V4, IpFamily::V6) => (first, second),
                    (IpFamily::V6, IpFamily::V4) => (second, first),
                    (family, _) => {
                        warn!(
                            "both DNS servers are {}, using {} for all queries",
                            family, first
                        );
                        (first, first)
                    }
                };
                self.ipv4_server = Some(v4);
                self.ipv6_server = Some(v6);
            }
            _ => return Err(ConfigError::TooManyServers),
        }
        Ok(self)
    }

    pub fn server_for(&self, family: IpFamily) -> Option<SocketAddr> {
        match family {
            IpFamily::V4 => self.ipv4_server,
            IpFamily::V6 => self.ipv6_server,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let servers = [self.ipv4_server, self.ipv6_server];
        if servers.iter().all(Option::is_none) {
            return Err(ConfigError::NoServers);
        }
        if servers.iter().flatten().any(|server| server.port() == 0) {
            return Err(ConfigError::InvalidPort);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.retry_count > MAX_RETRIES {
            return Err(ConfigError::InvalidRetryCount(self.retry_count));
        }
        if self.workers > ABSOLUTE_MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount(self.workers));
        }
        if !(MIN_WORKERS..=ABSOLUTE_MAX_WORKERS).contains(&self.max_workers) {
            return Err(ConfigError::InvalidWorkerCount(self.max_workers));
        }
        Ok(())
    }

    /// Validates the settings and that every family in `specs` has a server
    pub fn check_batch(&self, specs: &[QuerySpec]) -> Result<(), ConfigError> {
        self.validate()?;
        for spec in specs {
            if self.server_for(spec.family).is_none() {
                return Err(ConfigError::NoServerFor(spec.family));
            }
        }
        Ok(())
    }

    /// Workers to run for a batch of `batch_len` queries
    pub fn worker_count(&self, batch_len: usize) -> usize {
        if self.workers != 0 {
            debug!("using {} workers (manual override)", self.workers);
            return self.workers.min(ABSOLUTE_MAX_WORKERS);
        }
        let workers = auto_workers(batch_len, self.max_workers);
        debug!("using {} workers for {} queries (auto-scaled)", workers, batch_len);
        workers
    }

    /// Applies the transport override and the all-types expansion
    pub fn prepare(&self, mut specs: Vec<QuerySpec>) -> Vec<QuerySpec> {
        if let Some(transport) = self.transport_override {
            for spec in specs.iter_mut() {
                spec.transport = transport;
            }
        }

        if !self.query_all {
            return specs;
        }
        if specs.iter().any(|spec| spec.qtype == QueryType::All) {
            warn!("ANY queries are redundant when querying all types, expanding them to individual types");
        }
        let mut seen = HashSet::new();
        let input_len = specs.len();
        let expanded: Vec<QuerySpec> = specs
            .iter()
            .filter(|spec| seen.insert(spec.domain.clone()))
            .flat_map(QuerySpec::expand_all_types)
            .collect();
        debug!(
            "expanded {} queries over {} domains to {}",
            input_len,
            seen.len(),
            expanded.len()
        );
        expanded
    }
}

/// Worker count for a batch of `batch_len` queries
///
/// Small batches get a worker per query. Past that the count grows more
/// slowly the bigger the batch is. The result never decreases as the batch
/// grows and never exceeds `max` (itself capped at `ABSOLUTE_MAX_WORKERS`).
pub fn auto_workers(batch_len: usize, max: usize) -> usize {
    let max = max.clamp(MIN_WORKERS, ABSOLUTE_MAX_WORKERS);
    let workers = match batch_len {
        0..=10 => batch_len,
        11..=50 => 10,
        51..=250 => batch_len / 5 + 5,
        _ => 55 + (batch_len - 250) / 10,
    };
    workers.clamp(MIN_WORKERS, max)
}

/// Parses `IP`, `IP:PORT`, `[IPv6]` or `[IPv6]:PORT`, defaulting to port 53
pub fn parse_server(input: &str) -> Result<SocketAddr, ConfigError> {
    let input = input.trim();
    let invalid = |reason| ConfigError::InvalidServer(input.to_owned(), reason);

    if let Some(rest) = input.strip_prefix('[') {
        let (ip, after) = rest.split_once(']').ok_or_else(|| invalid("unclosed bracket"))?;
        let ip: Ipv6Addr = ip.parse().map_err(|_| invalid("invalid IPv6 address"))?;
        let port = match after {
            "" => DNS_PORT,
            _ => {
                let port = after
                    .strip_prefix(':')
                    .ok_or_else(|| invalid("expected ':' after IPv6 bracket"))?;
                parse_port(port).ok_or_else(|| invalid("invalid port"))?
            }
        };
        return Ok(SocketAddr::new(ip.into(), port));
    }

    if let Ok(ip) = input.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DNS_PORT));
    }

    let (ip, port) = input
        .split_once(':')
        .ok_or_else(|| invalid("invalid IP address"))?;
    let ip: Ipv4Addr = ip.parse().map_err(|_| invalid("invalid IP address"))?;
    let port = parse_port(port).ok_or_else(|| invalid("invalid port"))?;
    Ok(SocketAddr::new(ip.into(), port))
}

fn parse_port(port: &str) -> Option<u16> {
    port.parse::<u16>().ok().filter(|&port| port != 0)
}
