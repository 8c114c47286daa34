use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::SocketOptions;
use crate::enums::{OpCode, PacketType, Rcode};
use crate::error::HollerError;
use crate::message::Message;
use crate::resourcerecord::ResourceRecord;
use crate::sockets::{multicast_socket, Family};
use crate::zones::Zone;
use crate::{Header, MDNS_PORT, UDP_BUFFER_SIZE};

/// Knobs for [Responder::new].
#[derive(Clone, Debug, Default)]
pub struct ResponderConfig {
    /// Pin multicast traffic to one named interface
    pub interface: Option<String>,
    /// Log queries that produced no answers
    pub log_empty_responses: bool,
    /// Hexdump datagrams at trace level
    pub capture_packets: bool,
    pub disable_ipv4: bool,
    pub disable_ipv6: bool,
    pub socket: SocketOptions,
}

/// An mDNS responder: joins the groups on port 5353 and authoritatively
/// answers questions its zone has records for. It never announces and never
/// defends a name, it only speaks when spoken to.
pub struct Responder {
    zone: Arc<dyn Zone + Send + Sync>,
    config: ResponderConfig,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    running: bool,
}

impl Responder {
    pub fn new(zone: Arc<dyn Zone + Send + Sync>, config: ResponderConfig) -> Self {
        Responder {
            zone,
            config,
            cancel: CancellationToken::new(),
            handles: vec![],
            running: false,
        }
    }

    /// Binds the per-family sockets and starts answering. One family
    /// failing is survivable, both failing is [HollerError::NoSocket].
    pub async fn start(&mut self) -> Result<(), HollerError> {
        if self.running {
            return Err(HollerError::AlreadyRunning);
        }

        let mut sockets: Vec<(Arc<UdpSocket>, Family)> = vec![];
        for family in [Family::Ipv4, Family::Ipv6] {
            let disabled = match family {
                Family::Ipv4 => self.config.disable_ipv4,
                Family::Ipv6 => self.config.disable_ipv6,
            };
            if disabled {
                continue;
            }
            match multicast_socket(
                family,
                MDNS_PORT,
                &self.config.socket,
                self.config.interface.as_deref(),
            ) {
                Ok(socket) => sockets.push((Arc::new(socket), family)),
                Err(err) => error!("Failed to set up {family} listener: {err}"),
            }
        }
        if sockets.is_empty() {
            return Err(HollerError::NoSocket);
        }

        self.cancel = CancellationToken::new();
        for (socket, family) in sockets {
            let zone = self.zone.clone();
            let config = self.config.clone();
            let cancel = self.cancel.clone();
            self.handles.push(tokio::spawn(async move {
                run_listener(socket, family, zone, config, cancel).await;
            }));
        }

        self.running = true;
        info!("Responder started");
        Ok(())
    }

    /// Cancels the listeners and closes the sockets. Safe to call twice;
    /// a stopped responder can be replaced with a fresh one.
    pub async fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(err) = handle.await {
                error!("Listener task failed during shutdown: {err:?}");
            }
        }
        self.running = false;
        info!("Responder stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

async fn run_listener(
    socket: Arc<UdpSocket>,
    family: Family,
    zone: Arc<dyn Zone + Send + Sync>,
    config: ResponderConfig,
    cancel: CancellationToken,
) {
    let mut buf = [0; UDP_BUFFER_SIZE];
    loop {
        let (len, addr) = tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(value) => value,
                Err(err) => {
                    error!("Error receiving on {family} listener: {err:?}");
                    continue;
                }
            },
        };
        trace!("{len} bytes received from {addr:?}");
        if config.capture_packets {
            trace!("\n{}", crate::utils::hexdump(&buf[0..len]));
        }
        handle_datagram(&socket, family, &buf[0..len], addr, &zone, &config).await;
    }
    debug!("{family} listener exiting");
}

async fn handle_datagram(
    socket: &UdpSocket,
    family: Family,
    buf: &[u8],
    addr: SocketAddr,
    zone: &Arc<dyn Zone + Send + Sync>,
    config: &ResponderConfig,
) {
    let message = match Message::from_bytes(buf) {
        Ok(value) => value,
        Err(err) => {
            // per-datagram errors never tear the server down
            debug!("Dropping unparseable packet from {addr:?}: {err}");
            return;
        }
    };

    let Some((multicast, unicast)) = answer_buckets(&message, zone.as_ref()) else {
        return;
    };

    if multicast.is_empty() && unicast.is_empty() {
        if config.log_empty_responses {
            let questions: Vec<String> = message
                .questions
                .iter()
                .map(|q| q.qname.clone())
                .collect();
            info!(
                "No responses for query with questions: {}",
                questions.join(", ")
            );
        }
        return;
    }

    if !multicast.is_empty() {
        // group-wide answers carry id 0, ref RFC 6762 section 18.1
        let response = build_response(0, multicast);
        let dest = SocketAddr::new(family.group(), MDNS_PORT);
        send_response(socket, &response, dest).await;
    }
    if !unicast.is_empty() {
        let response = build_response(message.header.id, unicast);
        send_response(socket, &response, addr).await;
    }
}

/// Splits a query's answers into the multicast and unicast buckets by each
/// question's U-bit. `None` means the message must be silently ignored:
/// it's a response, or its OPCODE or RCODE is non-zero (RFC 6762 section 18).
pub(crate) fn answer_buckets(
    message: &Message,
    zone: &dyn Zone,
) -> Option<(Vec<ResourceRecord>, Vec<ResourceRecord>)> {
    if message.header.qr == PacketType::Answer {
        return None;
    }
    if message.header.opcode != OpCode::Query {
        debug!("Ignoring query with OPCODE {:?}", message.header.opcode);
        return None;
    }
    if message.header.rcode != Rcode::NoError {
        debug!("Ignoring query with RCODE {:?}", message.header.rcode);
        return None;
    }

    let mut multicast: Vec<ResourceRecord> = vec![];
    let mut unicast: Vec<ResourceRecord> = vec![];
    for question in &message.questions {
        let records = zone.records(question);
        if records.is_empty() {
            continue;
        }
        match question.unicast_response {
            true => unicast.extend(records),
            false => multicast.extend(records),
        }
    }
    Some((multicast, unicast))
}

/// A response message per RFC 6762 section 18: QR and AA set, no questions,
/// everything in the answer section.
pub(crate) fn build_response(id: u16, answers: Vec<ResourceRecord>) -> Message {
    Message {
        header: Header::response(id, answers.len() as u16),
        questions: vec![],
        answers,
        authorities: vec![],
        additionals: vec![],
    }
}

async fn send_response(socket: &UdpSocket, response: &Message, dest: SocketAddr) {
    let bytes = match response.as_bytes() {
        Ok(value) => value,
        Err(err) => {
            error!("Failed to pack response: {err}");
            return;
        }
    };
    match socket.send_to(&bytes, dest).await {
        Ok(len) => trace!("{len} bytes sent to {dest:?}"),
        Err(err) => error!("Failed to send response to {dest:?}: {err:?}"),
    }
}
