use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::aggregator::{Aggregator, ServiceEntry};
use crate::config::SocketOptions;
use crate::enums::RecordType;
use crate::error::HollerError;
use crate::message::Message;
use crate::sockets::{self, multicast_socket, unicast_socket, Family};
use crate::utils::trim_dots;
use crate::{Header, MDNS_PORT, Question, UDP_BUFFER_SIZE};

/// How many parsed datagrams can sit between the socket readers and the
/// single aggregator consumer before readers back off.
const CHANNEL_DEPTH: usize = 32;

/// Parameters for one browse/discover run.
#[derive(Clone, Debug)]
pub struct QueryOptions {
    /// Service type to look up, eg `_http._tcp`
    pub service: String,
    /// Domain, practically always `local`
    pub domain: String,
    /// How long to collect answers for. Zero means run until closed.
    pub timeout: Duration,
    /// Pin traffic to one named interface
    pub interface: Option<String>,
    /// Set the U-bit on the question to ask for unicast replies
    pub want_unicast_response: bool,
    pub disable_ipv4: bool,
    pub disable_ipv6: bool,
    /// Hexdump datagrams at trace level
    pub capture_packets: bool,
    pub socket: SocketOptions,
}

impl QueryOptions {
    pub fn new(service: impl Into<String>) -> Self {
        QueryOptions {
            service: service.into(),
            domain: "local".to_string(),
            timeout: Duration::from_secs(3),
            interface: None,
            want_unicast_response: false,
            disable_ipv4: false,
            disable_ipv6: false,
            capture_packets: false,
            socket: SocketOptions::default(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interface(mut self, interface: Option<String>) -> Self {
        self.interface = interface;
        self
    }

    pub fn with_unicast_response(mut self, want_unicast_response: bool) -> Self {
        self.want_unicast_response = want_unicast_response;
        self
    }

    /// The dot-terminated name the PTR question asks for.
    pub fn query_name(&self) -> String {
        format!("{}.{}.", trim_dots(&self.service), trim_dots(&self.domain))
    }
}

/// One family's socket pair: a unicast socket on an ephemeral port that
/// sends the query and catches unicast replies, and a multicast socket on
/// 5353 that catches the group replies.
struct FamilySockets {
    family: Family,
    unicast: Arc<UdpSocket>,
    multicast: Arc<UdpSocket>,
}

fn family_sockets(family: Family, options: &QueryOptions) -> Result<FamilySockets, HollerError> {
    let multicast = multicast_socket(
        family,
        MDNS_PORT,
        &options.socket,
        options.interface.as_deref(),
    )?;

    // with a pinned interface the IPv4 query socket binds to that
    // interface's address, falling back to the wildcard
    let bind_ip = match (family, &options.interface) {
        (Family::Ipv4, Some(name)) => match sockets::interface_ip(name, family) {
            Ok(ip) => Some(ip),
            Err(err) => {
                warn!("Failed to find an IPv4 address on {name:?}: {err}");
                None
            }
        },
        _ => None,
    };
    let unicast = match unicast_socket(family, &options.socket, bind_ip) {
        Ok(socket) => socket,
        Err(err) if bind_ip.is_some() => {
            warn!("Failed to bind to {bind_ip:?}, falling back to wildcard: {err}");
            unicast_socket(family, &options.socket, None)?
        }
        Err(err) => return Err(err),
    };

    Ok(FamilySockets {
        family,
        unicast: Arc::new(unicast),
        multicast: Arc::new(multicast),
    })
}

/// Keeps a browse's reader tasks and sockets alive. Cancelling on drop
/// means an abandoned browse tears itself down.
struct BrowseGuard {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    /// Weak so the sockets really close when the reader tasks exit
    query_sockets: Vec<(Weak<UdpSocket>, Family)>,
    query_bytes: Vec<u8>,
    closed: bool,
}

impl BrowseGuard {
    async fn requery(&self) -> Result<(), HollerError> {
        if self.closed || self.cancel.is_cancelled() {
            return Err(HollerError::Closed);
        }
        let mut sent = 0;
        let mut last_error: Option<std::io::Error> = None;
        for (socket, family) in &self.query_sockets {
            let Some(socket) = socket.upgrade() else {
                continue;
            };
            let dest = SocketAddr::new(family.group(), MDNS_PORT);
            match socket.send_to(&self.query_bytes, dest).await {
                Ok(_) => sent += 1,
                Err(err) => {
                    error!("Failed to re-send query on {family}: {err:?}");
                    last_error = Some(err);
                }
            }
        }
        match sent {
            0 => Err(match last_error {
                Some(err) => HollerError::SendFailed(err),
                None => HollerError::Closed,
            }),
            _ => Ok(()),
        }
    }

    async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(err) = handle.await {
                error!("Browse task failed during shutdown: {err:?}");
            }
        }
        self.query_sockets.clear();
    }
}

impl Drop for BrowseGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A running browse: readers on up to four sockets funnel records into the
/// aggregator, and completed [ServiceEntry] values stream out of `recv`.
pub struct Browser {
    entries: mpsc::Receiver<ServiceEntry>,
    guard: BrowseGuard,
}

impl Browser {
    /// The next completed service, or `None` once the run has ended.
    pub async fn recv(&mut self) -> Option<ServiceEntry> {
        self.entries.recv().await
    }

    /// Re-sends the PTR question, the polite way to refresh a long-running
    /// browse. Fails with [HollerError::Closed] after `close` or timeout.
    pub async fn requery(&self) -> Result<(), HollerError> {
        self.guard.requery().await
    }

    /// Stops the readers and closes every socket. Idempotent.
    pub async fn close(&mut self) {
        // unblocks a consumer mid-send so the join below can't hang
        self.entries.close();
        self.guard.shutdown().await;
    }

    /// The lazy-stream variant: the entries as a [ReceiverStream], with the
    /// browse kept alive behind it.
    pub fn into_stream(self) -> BrowserStream {
        BrowserStream {
            stream: ReceiverStream::new(self.entries),
            guard: self.guard,
        }
    }
}

/// [Browser::into_stream]'s view of a browse; ends when the run does.
pub struct BrowserStream {
    stream: ReceiverStream<ServiceEntry>,
    guard: BrowseGuard,
}

impl BrowserStream {
    /// Re-sends the PTR question, as [Browser::requery] does.
    pub async fn requery(&self) -> Result<(), HollerError> {
        self.guard.requery().await
    }

    /// Stops the readers and closes every socket. Idempotent.
    pub async fn close(&mut self) {
        self.stream.close();
        self.guard.shutdown().await;
    }
}

impl Stream for BrowserStream {
    type Item = ServiceEntry;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().stream).poll_next(cx)
    }
}

/// Sends the PTR query and returns a [Browser] streaming back each service
/// as it completes.
pub async fn browse(options: QueryOptions) -> Result<Browser, HollerError> {
    let mut families: Vec<FamilySockets> = vec![];
    for family in [Family::Ipv4, Family::Ipv6] {
        let disabled = match family {
            Family::Ipv4 => options.disable_ipv4,
            Family::Ipv6 => options.disable_ipv6,
        };
        if disabled {
            continue;
        }
        match family_sockets(family, &options) {
            Ok(pair) => families.push(pair),
            Err(err) => error!("Disabling {family} for this query: {err}"),
        }
    }
    if families.is_empty() {
        return Err(HollerError::NoSocket);
    }

    // flags all zero; the id is random but mDNS responders echo it only on
    // unicast replies
    let question = Question::new(options.query_name(), RecordType::PTR)
        .with_unicast_response(options.want_unicast_response);
    let message = Message {
        header: Header::query(rand::random()),
        questions: vec![question],
        answers: vec![],
        authorities: vec![],
        additionals: vec![],
    };
    let query_bytes = message.as_bytes()?;

    let mut sent = 0;
    let mut last_error: Option<std::io::Error> = None;
    for pair in &families {
        let dest = SocketAddr::new(pair.family.group(), MDNS_PORT);
        match pair.unicast.send_to(&query_bytes, dest).await {
            Ok(_) => {
                trace!("Sent query to {dest:?}");
                sent += 1;
            }
            Err(err) => {
                error!("Failed to send query on {}: {err:?}", pair.family);
                last_error = Some(err);
            }
        }
    }
    if sent == 0 {
        return Err(match last_error {
            Some(err) => HollerError::SendFailed(err),
            None => HollerError::NoSocket,
        });
    }

    let cancel = CancellationToken::new();
    let (raw_tx, raw_rx) = mpsc::channel::<(Message, SocketAddr)>(CHANNEL_DEPTH);
    let (entry_tx, entry_rx) = mpsc::channel::<ServiceEntry>(CHANNEL_DEPTH);

    let mut handles: Vec<JoinHandle<()>> = vec![];
    let mut query_sockets: Vec<(Weak<UdpSocket>, Family)> = vec![];
    for pair in families {
        query_sockets.push((Arc::downgrade(&pair.unicast), pair.family));
        for socket in [pair.unicast, pair.multicast] {
            let tx = raw_tx.clone();
            let token = cancel.clone();
            let capture = options.capture_packets;
            handles.push(tokio::spawn(async move {
                run_reader(socket, tx, token, capture).await;
            }));
        }
    }
    drop(raw_tx);

    let aggregator = Aggregator::new(&options.service, &options.domain);
    handles.push(tokio::spawn(run_consumer(raw_rx, entry_tx, aggregator)));

    if !options.timeout.is_zero() {
        let token = cancel.clone();
        let timeout = options.timeout;
        handles.push(tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    debug!("Query deadline reached after {timeout:?}");
                    token.cancel();
                }
            }
        }));
    }

    Ok(Browser {
        entries: entry_rx,
        guard: BrowseGuard {
            cancel,
            handles,
            query_sockets,
            query_bytes,
            closed: false,
        },
    })
}

/// Runs a browse to completion and hands back everything it found.
pub async fn discover(options: QueryOptions) -> Result<Vec<ServiceEntry>, HollerError> {
    let mut browser = browse(options).await?;
    let mut entries = vec![];
    while let Some(entry) = browser.recv().await {
        debug!("Discovered {}", entry.name);
        entries.push(entry);
    }
    browser.close().await;
    Ok(entries)
}

/// One socket's read loop: parse datagrams, drop anything without records,
/// and push the survivors at the aggregator consumer.
async fn run_reader(
    socket: Arc<UdpSocket>,
    tx: mpsc::Sender<(Message, SocketAddr)>,
    cancel: CancellationToken,
    capture_packets: bool,
) {
    let mut buf = [0; UDP_BUFFER_SIZE];
    loop {
        let (len, addr) = tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(value) => value,
                Err(err) => {
                    error!("Error receiving mDNS reply: {err:?}");
                    continue;
                }
            },
        };
        if capture_packets {
            trace!("\n{}", crate::utils::hexdump(&buf[0..len]));
        }
        let message = match Message::from_bytes(&buf[0..len]) {
            Ok(value) => value,
            Err(err) => {
                debug!("Dropping unparseable packet from {addr:?}: {err}");
                continue;
            }
        };
        if !message.has_records() {
            continue;
        }
        if tx.send((message, addr)).await.is_err() {
            break;
        }
    }
}

/// The single consumer: owns the aggregator, nobody else touches it.
async fn run_consumer(
    mut raw_rx: mpsc::Receiver<(Message, SocketAddr)>,
    entry_tx: mpsc::Sender<ServiceEntry>,
    mut aggregator: Aggregator,
) {
    while let Some((message, addr)) = raw_rx.recv().await {
        trace!(
            "Aggregating {} answer / {} additional records from {addr:?}",
            message.answers.len(),
            message.additionals.len()
        );
        for record in message.answers.iter().chain(message.additionals.iter()) {
            for entry in aggregator.ingest(record) {
                if entry_tx.send(entry).await.is_err() {
                    return;
                }
            }
        }
    }
}
