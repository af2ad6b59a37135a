use dnsbatch::{Config, IpFamily, QuerySpec, QueryType, Transport};
use std::env;
use std::process;

// usage: query [-s SERVER]... [-t TYPE] [--tcp] [--all] DOMAIN...
#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters("dnsbatch=debug");
    builder.init();

    let mut servers = Vec::new();
    let mut qtype = QueryType::A;
    let mut transport = Transport::Udp;
    let mut query_all = false;
    let mut domains = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-s" => servers.extend(args.next()),
            "-t" => match args.next().map(|t| t.parse::<QueryType>()) {
                Some(Ok(parsed)) => qtype = parsed,
                Some(Err(err)) => fail(&err.to_string()),
                None => fail("-t needs a record type"),
            },
            "--tcp" => transport = Transport::Tcp,
            "--all" => query_all = true,
            _ => domains.push(arg),
        }
    }
    if domains.is_empty() {
        fail("usage: query [-s SERVER]... [-t TYPE] [--tcp] [--all] DOMAIN...");
    }

    let servers: Vec<&str> = servers.iter().map(String::as_str).collect();
    let config = match Config::default().with_servers(&servers) {
        Ok(config) => Config { query_all, ..config },
        Err(err) => fail(&err.to_string()),
    };

    let specs: Vec<QuerySpec> = domains
        .into_iter()
        .map(|domain| QuerySpec::new(domain, qtype, transport, IpFamily::V4))
        .filter(|spec| match spec.validate() {
            Ok(()) => true,
            Err(err) => {
                eprintln!("skipping {}: {}", spec.domain, err);
                false
            }
        })
        .collect();

    let batch = match dnsbatch::resolve_batch(config, specs).await {
        Ok(batch) => batch,
        Err(err) => fail(&err.to_string()),
    };

    for result in &batch.results {
        println!(
            "{} {} {} {:.1}ms ips={:?} records={:?} ns={:?}{}",
            result.domain,
            result.qtype,
            result.status,
            result.latency_ms(),
            result.resolved_ips,
            result.records,
            result.authoritative_ns,
            result
                .error
                .as_ref()
                .map(|e| format!(" error={}", e))
                .unwrap_or_default()
        );
    }
    println!(
        "{} queries, {} ok, {} no answer, {} failed, avg {:?}, {:.1} q/s",
        batch.tally.total(),
        batch.tally.successful(),
        batch.tally.no_answer(),
        batch.tally.failed(),
        batch.tally.average_latency(),
        batch.queries_per_second()
    );
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}
