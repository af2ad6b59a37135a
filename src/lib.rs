//! Batch DNS resolution over raw UDP and TCP sockets
//!
//! Queries are encoded and decoded by [`dns_parser`], sent by [`transport`]
//! and executed by a [`Resolver`]. A [`WorkerPool`] runs many of them at
//! once against one upstream server per IP family.

pub mod address_family;
pub mod config;
pub mod dns_parser;
pub mod pool;
pub mod query;
pub mod resolver;
pub mod result;
pub mod transport;

pub use crate::address_family::IpFamily;
pub use crate::config::{Config, ConfigError, DNS_PORT};
pub use crate::dns_parser::QueryType;
pub use crate::pool::{run_batch, Batch, PoolClosed, PoolHandle, WorkerPool};
pub use crate::query::{InvalidSpec, QuerySpec};
pub use crate::resolver::{Resolver, RetryPolicy};
pub use crate::result::{consolidate, ConsolidatedResult, QueryResult, Status, Summary, Tally};
pub use crate::transport::{Exchanger, Network, Transport, TransportError};

/// Resolves a whole batch over the network
///
/// The transport override and all-types expansion are applied first. The
/// batch is rejected before any query is sent if the configuration is
/// invalid or lacks a server for a family the batch needs.
pub async fn resolve_batch(config: Config, specs: Vec<QuerySpec>) -> Result<Batch, ConfigError> {
    resolve_batch_with(config, specs, Network).await
}

/// Like [`resolve_batch`], exchanging packets through `exchanger`
pub async fn resolve_batch_with<X: Exchanger>(
    config: Config,
    specs: Vec<QuerySpec>,
    exchanger: X,
) -> Result<Batch, ConfigError> {
    let specs = config.prepare(specs);
    config.check_batch(&specs)?;
    let workers = config.worker_count(specs.len());
    let resolver = Resolver::with_exchanger(config, exchanger);
    Ok(run_batch(resolver, specs, workers).await)
}
