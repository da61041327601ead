use std::collections::HashMap;
use std::time::Instant;

use flume::{Receiver, Sender, TryRecvError};

use realm_ai::TreeFactory;
use realm_server::{
    transport::{PacketReceiver, PacketSender, RecvError, SendError},
    PersistenceHandle, RealmServer, ServerConfig, ServerError, UserKey,
};
use realm_world::NpcActor;

use super::test_client::TestClient;

struct HarnessSender {
    outbound: Sender<(UserKey, Vec<u8>)>,
}

impl PacketSender for HarnessSender {
    fn send(&self, user: UserKey, payload: &[u8]) -> Result<(), SendError> {
        self.outbound
            .send((user, payload.to_vec()))
            .map_err(|_| SendError {
                user: user.to_u64(),
            })
    }
}

struct HarnessReceiver {
    inbound: Receiver<(UserKey, Vec<u8>)>,
}

impl PacketReceiver for HarnessReceiver {
    fn receive(&mut self) -> Result<Option<(UserKey, Vec<u8>)>, RecvError> {
        match self.inbound.try_recv() {
            Ok(packet) => Ok(Some(packet)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RecvError),
        }
    }
}

/// A server plus loopback clients, with packet pumping between them.
pub struct TestHarness {
    pub server: RealmServer,
    pub clients: HashMap<UserKey, TestClient>,
    server_out: Receiver<(UserKey, Vec<u8>)>,
    server_in: Sender<(UserKey, Vec<u8>)>,
}

impl TestHarness {
    pub fn new(config: ServerConfig, persistence: Option<PersistenceHandle>) -> Self {
        Self::with_factory(config, persistence, TreeFactory::new)
    }

    pub fn with_factory(
        config: ServerConfig,
        persistence: Option<PersistenceHandle>,
        behavior_factory: impl Fn() -> TreeFactory<NpcActor>,
    ) -> Self {
        let (out_tx, out_rx) = flume::unbounded();
        let (in_tx, in_rx) = flume::unbounded();

        let server = RealmServer::new(
            config,
            Box::new(HarnessSender { outbound: out_tx }),
            Box::new(HarnessReceiver { inbound: in_rx }),
            persistence,
            behavior_factory,
        );

        Self {
            server,
            clients: HashMap::new(),
            server_out: out_rx,
            server_in: in_tx,
        }
    }

    /// Connects a new loopback client.
    pub fn connect_client(&mut self) -> Result<UserKey, ServerError> {
        let user = self.server.connect()?;
        self.clients.insert(user, TestClient::new(user));
        Ok(user)
    }

    pub fn client(&self, user: UserKey) -> &TestClient {
        self.clients.get(&user).expect("client is connected")
    }

    pub fn client_mut(&mut self, user: UserKey) -> &mut TestClient {
        self.clients.get_mut(&user).expect("client is connected")
    }

    /// Routes server-outbound packets into the clients, drains the client
    /// pipelines (producing acks), and feeds everything client-side back
    /// to the server's inbound queue.
    pub fn pump(&mut self, now: Instant) {
        while let Ok((user, payload)) = self.server_out.try_recv() {
            if let Some(client) = self.clients.get_mut(&user) {
                let _ = client.receive_packet(&payload, now);
            }
        }

        for (user, client) in &mut self.clients {
            client.drain(now);
            for payload in client.take_outgoing() {
                let _ = self.server_in.send((*user, payload));
            }
        }
    }

    /// One server tick followed by a full packet exchange.
    pub fn tick_and_pump(&mut self, dt: f32, now: Instant) {
        self.server.tick(dt, now);
        self.pump(now);
    }

    /// Runs `count` ticks with `dt` seconds between them, pumping packets
    /// after each. The simulated clock starts at `start`.
    pub fn run_ticks(&mut self, count: u32, dt: f32, start: Instant) -> Instant {
        let mut now = start;
        for _ in 0..count {
            self.tick_and_pump(dt, now);
            now += std::time::Duration::from_secs_f32(dt);
        }
        now
    }
}
