//! # libp2p Kademlia Overlay
//!
//! Drives a `libp2p::Swarm` in a background task and exposes it through the
//! [`Overlay`] port. The swarm speaks tcp, dns and websocket transports with
//! noise and yamux, and runs Kademlia in client mode alongside identify.
//!
//! Every port call becomes a `Command` on an mpsc channel. The event loop
//! owns the swarm and answers on a oneshot (or streams neighbors through an
//! unbounded channel), so the port itself is `Send + Sync` and cheap to share.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use libp2p::core::ConnectedPoint;
use libp2p::swarm::dial_opts::DialOpts;
use libp2p::swarm::{ConnectionId, NetworkBehaviour, SwarmEvent};
use libp2p::{identify, identity, kad, noise, tcp, yamux, Multiaddr, PeerId, Swarm, SwarmBuilder};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, trace, warn};

use crate::config::ScannerConfig;
use crate::domain::{MultiAddress, OverlayError, PeerIdentifier};
use crate::ports::{NeighborStream, Overlay};

/// Protocol string announced over identify.
const IDENTIFY_PROTOCOL: &str = "/ipfs/id/1.0.0";
const COMMAND_BUFFER: usize = 64;
const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(NetworkBehaviour)]
struct ScanBehaviour {
    kademlia: kad::Behaviour<kad::store::MemoryStore>,
    identify: identify::Behaviour,
}

impl ScanBehaviour {
    fn new(key: &identity::Keypair, query_timeout: Duration) -> Self {
        let local_peer_id = key.public().to_peer_id();

        let mut kad_config = kad::Config::new(kad::PROTOCOL_NAME);
        kad_config.set_query_timeout(query_timeout);
        let mut kademlia = kad::Behaviour::with_config(
            local_peer_id,
            kad::store::MemoryStore::new(local_peer_id),
            kad_config,
        );
        // The scanner never serves records.
        kademlia.set_mode(Some(kad::Mode::Client));

        let identify = identify::Behaviour::new(identify::Config::new(
            IDENTIFY_PROTOCOL.to_string(),
            key.public(),
        ));

        Self { kademlia, identify }
    }
}

type NeighborSink = mpsc::UnboundedSender<Result<PeerIdentifier, OverlayError>>;

enum Command {
    Dial {
        addr: Multiaddr,
        reply: oneshot::Sender<Result<(), OverlayError>>,
    },
    ListPeers {
        reply: oneshot::Sender<Vec<PeerIdentifier>>,
    },
    QueryNear {
        peer: PeerId,
        sink: NeighborSink,
    },
    Resolve {
        peer: PeerId,
        reply: oneshot::Sender<Result<Vec<MultiAddress>, OverlayError>>,
    },
}

struct PendingResolve {
    target: PeerId,
    found: Vec<Multiaddr>,
    reply: oneshot::Sender<Result<Vec<MultiAddress>, OverlayError>>,
}

/// Overlay backed by a live libp2p swarm.
#[derive(Debug, Clone)]
pub struct Libp2pOverlay {
    commands: mpsc::Sender<Command>,
    local_peer_id: PeerId,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Dial { addr, .. } => f.debug_struct("Dial").field("addr", addr).finish(),
            Command::ListPeers { .. } => f.write_str("ListPeers"),
            Command::QueryNear { peer, .. } => {
                f.debug_struct("QueryNear").field("peer", peer).finish()
            }
            Command::Resolve { peer, .. } => {
                f.debug_struct("Resolve").field("peer", peer).finish()
            }
        }
    }
}

impl Libp2pOverlay {
    /// Build the swarm with a fresh ed25519 identity and start its event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn spawn(config: &ScannerConfig) -> Result<Self, OverlayError> {
        let keypair = identity::Keypair::generate_ed25519();
        let local_peer_id = keypair.public().to_peer_id();
        let query_timeout = config.query_timeout();

        let swarm = SwarmBuilder::with_existing_identity(keypair)
            .with_tokio()
            .with_tcp(tcp::Config::default(), noise::Config::new, yamux::Config::default)
            .map_err(transport_error)?
            .with_dns()
            .map_err(transport_error)?
            .with_websocket(noise::Config::new, yamux::Config::default)
            .await
            .map_err(transport_error)?
            .with_behaviour(|key| ScanBehaviour::new(key, query_timeout))
            .map_err(transport_error)?
            .with_swarm_config(|c| c.with_idle_connection_timeout(IDLE_CONNECTION_TIMEOUT))
            .build();

        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(EventLoop::new(swarm, receiver).run());

        info!(peer_id = %local_peer_id, "libp2p overlay started");
        Ok(Self {
            commands,
            local_peer_id,
        })
    }

    /// Identity this node presents to the network.
    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    async fn send(&self, command: Command) -> Result<(), OverlayError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| OverlayError::Closed)
    }
}

#[async_trait]
impl Overlay for Libp2pOverlay {
    async fn connect(&self, addr: &MultiAddress) -> Result<(), OverlayError> {
        let addr = parse_multiaddr(addr)?;
        let (reply, response) = oneshot::channel();
        self.send(Command::Dial { addr, reply }).await?;
        response.await.map_err(|_| OverlayError::Closed)?
    }

    async fn list_peers(&self) -> Result<Vec<PeerIdentifier>, OverlayError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::ListPeers { reply }).await?;
        response.await.map_err(|_| OverlayError::Closed)
    }

    async fn query_near(&self, peer: &PeerIdentifier) -> Result<NeighborStream, OverlayError> {
        let peer = parse_peer_id(peer)?;
        let (sink, neighbors) = mpsc::unbounded_channel();
        self.send(Command::QueryNear { peer, sink }).await?;
        Ok(UnboundedReceiverStream::new(neighbors).boxed())
    }

    async fn resolve_addresses(
        &self,
        peer: &PeerIdentifier,
    ) -> Result<Vec<MultiAddress>, OverlayError> {
        let peer = parse_peer_id(peer)?;
        let (reply, response) = oneshot::channel();
        self.send(Command::Resolve { peer, reply }).await?;
        response.await.map_err(|_| OverlayError::Closed)?
    }
}

struct EventLoop {
    swarm: Swarm<ScanBehaviour>,
    commands: mpsc::Receiver<Command>,
    pending_dials: HashMap<ConnectionId, oneshot::Sender<Result<(), OverlayError>>>,
    neighbor_queries: HashMap<kad::QueryId, NeighborSink>,
    address_queries: HashMap<kad::QueryId, PendingResolve>,
    /// Listen addresses learned over identify.
    identified: HashMap<PeerId, Vec<Multiaddr>>,
    bootstrapped: bool,
}

impl EventLoop {
    fn new(swarm: Swarm<ScanBehaviour>, commands: mpsc::Receiver<Command>) -> Self {
        Self {
            swarm,
            commands,
            pending_dials: HashMap::new(),
            neighbor_queries: HashMap::new(),
            address_queries: HashMap::new(),
            identified: HashMap::new(),
            bootstrapped: false,
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                event = self.swarm.select_next_some() => self.handle_swarm_event(event),
            }
        }
        debug!("overlay handle dropped, stopping swarm event loop");
    }

    fn handle_command(&mut self, command: Command) {
        trace!(?command, "overlay command");
        match command {
            Command::Dial { addr, reply } => {
                let opts = DialOpts::from(addr.clone());
                let connection_id = opts.connection_id();
                match self.swarm.dial(opts) {
                    Ok(()) => {
                        self.pending_dials.insert(connection_id, reply);
                    }
                    Err(err) => {
                        let _ = reply.send(Err(OverlayError::Dial(format!("{addr}: {err}"))));
                    }
                }
            }
            Command::ListPeers { reply } => {
                let peers = self
                    .swarm
                    .connected_peers()
                    .map(|peer| PeerIdentifier::new(peer.to_string()))
                    .collect();
                let _ = reply.send(peers);
            }
            Command::QueryNear { peer, sink } => {
                let query_id = self.swarm.behaviour_mut().kademlia.get_closest_peers(peer);
                self.neighbor_queries.insert(query_id, sink);
            }
            Command::Resolve { peer, reply } => {
                let query_id = self.swarm.behaviour_mut().kademlia.get_closest_peers(peer);
                self.address_queries.insert(
                    query_id,
                    PendingResolve {
                        target: peer,
                        found: Vec::new(),
                        reply,
                    },
                );
            }
        }
    }

    fn handle_swarm_event(&mut self, event: SwarmEvent<ScanBehaviourEvent>) {
        match event {
            SwarmEvent::ConnectionEstablished {
                peer_id,
                connection_id,
                endpoint,
                ..
            } => {
                if let ConnectedPoint::Dialer { address, .. } = endpoint {
                    self.swarm
                        .behaviour_mut()
                        .kademlia
                        .add_address(&peer_id, address);
                }
                if let Some(reply) = self.pending_dials.remove(&connection_id) {
                    let _ = reply.send(Ok(()));
                    self.bootstrap_once();
                }
            }
            SwarmEvent::OutgoingConnectionError {
                connection_id,
                peer_id,
                error,
                ..
            } => {
                if let Some(reply) = self.pending_dials.remove(&connection_id) {
                    let _ = reply.send(Err(OverlayError::Dial(error.to_string())));
                } else {
                    trace!(?peer_id, %error, "outgoing connection error");
                }
            }
            SwarmEvent::Behaviour(ScanBehaviourEvent::Kademlia(event)) => {
                self.handle_kademlia_event(event)
            }
            SwarmEvent::Behaviour(ScanBehaviourEvent::Identify(event)) => {
                self.handle_identify_event(event)
            }
            other => trace!(?other, "swarm event"),
        }
    }

    fn bootstrap_once(&mut self) {
        if self.bootstrapped {
            return;
        }
        match self.swarm.behaviour_mut().kademlia.bootstrap() {
            Ok(query_id) => {
                self.bootstrapped = true;
                debug!(?query_id, "started kademlia bootstrap");
            }
            Err(err) => debug!(%err, "kademlia bootstrap deferred"),
        }
    }

    fn handle_identify_event(&mut self, event: identify::Event) {
        if let identify::Event::Received { peer_id, info, .. } = event {
            if info.protocols.contains(&kad::PROTOCOL_NAME) {
                for address in &info.listen_addrs {
                    self.swarm
                        .behaviour_mut()
                        .kademlia
                        .add_address(&peer_id, address.clone());
                }
            }
            self.identified.insert(peer_id, info.listen_addrs);
        }
    }

    fn handle_kademlia_event(&mut self, event: kad::Event) {
        let kad::Event::OutboundQueryProgressed {
            id, result, step, ..
        } = event
        else {
            return;
        };
        let kad::QueryResult::GetClosestPeers(result) = result else {
            return;
        };

        let peers = match result {
            Ok(kad::GetClosestPeersOk { peers, .. }) => peers,
            Err(kad::GetClosestPeersError::Timeout { peers, .. }) => {
                debug!(?id, found = peers.len(), "closest-peers query timed out");
                peers
            }
        };

        if self.neighbor_queries.contains_key(&id) {
            self.forward_neighbors(id, peers, step.last);
        } else if self.address_queries.contains_key(&id) {
            self.collect_addresses(id, peers, step.last);
        }
    }

    fn forward_neighbors(&mut self, id: kad::QueryId, peers: Vec<kad::PeerInfo>, last: bool) {
        let Some(sink) = self.neighbor_queries.get(&id) else {
            return;
        };
        let mut receiver_gone = false;
        for info in &peers {
            if sink.send(Ok(PeerIdentifier::new(info.peer_id.to_string()))).is_err() {
                receiver_gone = true;
                break;
            }
        }

        if receiver_gone {
            if let Some(mut query) = self.swarm.behaviour_mut().kademlia.query_mut(&id) {
                query.finish();
            }
            self.neighbor_queries.remove(&id);
        } else if last {
            // Dropping the sink ends the stream.
            self.neighbor_queries.remove(&id);
        }
    }

    fn collect_addresses(&mut self, id: kad::QueryId, peers: Vec<kad::PeerInfo>, last: bool) {
        let Some(pending) = self.address_queries.get_mut(&id) else {
            return;
        };
        for info in peers.into_iter().filter(|info| info.peer_id == pending.target) {
            for addr in info.addrs {
                if !pending.found.contains(&addr) {
                    pending.found.push(addr);
                }
            }
        }
        if !last {
            return;
        }

        let Some(pending) = self.address_queries.remove(&id) else {
            return;
        };
        let addrs = if pending.found.is_empty() {
            self.identified
                .get(&pending.target)
                .cloned()
                .unwrap_or_default()
        } else {
            pending.found
        };
        let result = if addrs.is_empty() {
            warn!(peer = %pending.target, "no addresses found for peer");
            Err(OverlayError::NotFound)
        } else {
            Ok(addrs
                .iter()
                .map(|addr| MultiAddress::new(addr.to_string()))
                .collect())
        };
        let _ = pending.reply.send(result);
    }
}

fn transport_error(err: impl std::fmt::Display) -> OverlayError {
    OverlayError::Transport(err.to_string())
}

fn parse_peer_id(peer: &PeerIdentifier) -> Result<PeerId, OverlayError> {
    PeerId::from_str(peer.as_str())
        .map_err(|err| OverlayError::Malformed(format!("{peer}: {err}")))
}

fn parse_multiaddr(addr: &MultiAddress) -> Result<Multiaddr, OverlayError> {
    Multiaddr::from_str(addr.as_str())
        .map_err(|err| OverlayError::Malformed(format!("{addr}: {err}")))
}
