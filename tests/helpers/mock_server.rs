#![allow(dead_code)]
//! Loopback DNS server answering over UDP and TCP on the same port
//!
//! Answers depend on the first label of the question:
//! `nxdomain`, `servfail` and `refused` get that response code, `silent`
//! gets no reply at all and `cname` gets a CNAME without addresses. Anything
//! else is answered per record type.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::oneshot;

pub const ADDRESS: [u8; 4] = [93, 184, 216, 34];

#[derive(Default)]
pub struct Counters {
    pub udp: AtomicUsize,
    pub tcp: AtomicUsize,
}

pub struct MockDnsServer {
    addr: SocketAddr,
    counters: Arc<Counters>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    pub async fn start() -> io::Result<MockDnsServer> {
        MockDnsServer::start_on(Ipv4Addr::LOCALHOST.into()).await
    }

    pub async fn start_on(ip: IpAddr) -> io::Result<MockDnsServer> {
        let (udp, tcp) = bind_pair(ip).await?;
        let addr = udp.local_addr()?;
        let counters = Arc::new(Counters::default());
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let udp_counters = counters.clone();
        let tcp_counters = counters.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    received = udp.recv_from(&mut buf) => {
                        let Ok((len, peer)) = received else { continue };
                        udp_counters.udp.fetch_add(1, Ordering::SeqCst);
                        if let Some(response) = respond(&buf[..len]) {
                            let _ = udp.send_to(&response, peer).await;
                        }
                    }
                    accepted = tcp.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        tcp_counters.tcp.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(serve_tcp(stream));
                    }
                }
            }
        });

        Ok(MockDnsServer {
            addr,
            counters,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn udp_queries(&self) -> usize {
        self.counters.udp.load(Ordering::SeqCst)
    }

    pub fn tcp_connections(&self) -> usize {
        self.counters.tcp.load(Ordering::SeqCst)
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// UDP socket and TCP listener sharing one loopback port
async fn bind_pair(ip: IpAddr) -> io::Result<(UdpSocket, TcpListener)> {
    let mut last_err = None;
    for _ in 0..10 {
        let udp = UdpSocket::bind(SocketAddr::new(ip, 0)).await?;
        match TcpListener::bind(udp.local_addr()?).await {
            Ok(tcp) => return Ok((udp, tcp)),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| io::ErrorKind::AddrInUse.into()))
}

async fn serve_tcp(mut stream: TcpStream) {
    let mut len = [0u8; 2];
    if stream.read_exact(&mut len).await.is_err() {
        return;
    }
    let mut query = vec![0u8; u16::from_be_bytes(len) as usize];
    if stream.read_exact(&mut query).await.is_err() {
        return;
    }
    let Some(response) = respond(&query) else {
        // hold the connection open until the client gives up
        let _ = stream.read(&mut len).await;
        return;
    };
    // length prefix and body in two writes, as a slow server would
    let _ = stream.write_all(&(response.len() as u16).to_be_bytes()).await;
    let _ = stream.flush().await;
    let _ = stream.write_all(&response).await;
}

fn labels(query: &[u8]) -> Option<(Vec<String>, usize)> {
    let mut pos = 12;
    let mut labels = Vec::new();
    loop {
        let len = *query.get(pos)? as usize;
        pos += 1;
        if len == 0 {
            return Some((labels, pos));
        }
        labels.push(String::from_utf8_lossy(query.get(pos..pos + len)?).into_owned());
        pos += len;
    }
}

fn name(domain: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in domain.split('.') {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

fn record(typ: u16, rdata: &[u8]) -> Vec<u8> {
    let mut out = vec![0xc0, 0x0c];
    out.extend_from_slice(&typ.to_be_bytes());
    out.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x3c]);
    out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    out.extend_from_slice(rdata);
    out
}

fn soa() -> Vec<u8> {
    let mut rdata = name("ns1.mock.test");
    rdata.extend(name("hostmaster.mock.test"));
    rdata.extend_from_slice(&[0u8; 20]);
    record(6, &rdata)
}

/// Builds the reply to `query`, or `None` to stay silent
fn respond(query: &[u8]) -> Option<Vec<u8>> {
    let (labels, question_end) = labels(query)?;
    let qtype = u16::from_be_bytes([*query.get(question_end)?, *query.get(question_end + 1)?]);
    let question = query.get(12..question_end + 4)?;
    let domain = labels.join(".");

    let mut rcode = 0u8;
    let mut answers = Vec::new();
    let mut authority = Vec::new();
    match labels.first().map(String::as_str) {
        Some("silent") => return None,
        Some("nxdomain") => {
            rcode = 3;
            // must be ignored by the client
            answers.push(record(1, &ADDRESS));
        }
        Some("servfail") => rcode = 2,
        Some("refused") => rcode = 5,
        Some("cname") if qtype != 2 => answers.push(record(5, &name(&format!("target.{}", domain)))),
        _ => match qtype {
            1 => {
                answers.push(record(1, &ADDRESS));
                authority.push(record(2, &name("ns1.mock.test")));
            }
            28 => {
                let mut v6 = [0u8; 16];
                v6[..4].copy_from_slice(&[0x20, 0x01, 0x0d, 0xb8]);
                v6[15] = 1;
                answers.push(record(28, &v6));
                authority.push(record(2, &name("ns1.mock.test")));
            }
            2 => {
                answers.push(record(2, &name("ns1.mock.test")));
                answers.push(record(2, &name("ns2.mock.test")));
            }
            15 => {
                let mut mx = vec![0x00, 0x0a];
                mx.extend(name(&format!("mail.{}", domain)));
                answers.push(record(15, &mx));
                authority.push(record(2, &name("ns1.mock.test")));
            }
            16 => {
                answers.push(record(16, b"\x0bv=spf1 -all"));
                authority.push(record(2, &name("ns1.mock.test")));
            }
            _ => authority.push(soa()),
        },
    }

    let mut response = Vec::with_capacity(512);
    response.extend_from_slice(&query[0..2]);
    response.push(0x81);
    response.push(0x80 | rcode);
    response.extend_from_slice(&[0x00, 0x01]);
    response.extend_from_slice(&(answers.len() as u16).to_be_bytes());
    response.extend_from_slice(&(authority.len() as u16).to_be_bytes());
    response.extend_from_slice(&[0x00, 0x00]);
    response.extend_from_slice(question);
    for rr in answers.iter().chain(authority.iter()) {
        response.extend_from_slice(rr);
    }
    Some(response)
}
