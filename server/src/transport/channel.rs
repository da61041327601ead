use flume::{Receiver, Sender, TryRecvError};

use super::{PacketReceiver as TransportReceiver, PacketSender as TransportSender, RecvError, SendError};
use crate::user::UserKey;

/// An in-process packet transport over a flume channel. Tests and
/// single-process deployments wire a server's sender to a peer's receiver.
pub struct PacketChannel;

impl PacketChannel {
    pub fn unbounded() -> (Box<dyn TransportSender>, Box<dyn TransportReceiver>) {
        let (packet_sender, packet_receiver) = flume::unbounded();
        (
            Box::new(packet_sender),
            Box::new(PacketChannelReceiver::new(packet_receiver)),
        )
    }
}

impl TransportSender for Sender<(UserKey, Vec<u8>)> {
    fn send(&self, user: UserKey, payload: &[u8]) -> Result<(), SendError> {
        self.send((user, payload.to_vec())).map_err(|_| SendError {
            user: user.to_u64(),
        })
    }
}

struct PacketChannelReceiver {
    receiver: Receiver<(UserKey, Vec<u8>)>,
}

impl PacketChannelReceiver {
    fn new(receiver: Receiver<(UserKey, Vec<u8>)>) -> Self {
        Self { receiver }
    }
}

impl TransportReceiver for PacketChannelReceiver {
    fn receive(&mut self) -> Result<Option<(UserKey, Vec<u8>)>, RecvError> {
        match self.receiver.try_recv() {
            Ok(packet) => Ok(Some(packet)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RecvError),
        }
    }
}
