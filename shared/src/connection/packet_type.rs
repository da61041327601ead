// An enum representing the different types of packets that can be
// sent/received

use realm_serde::SerdeErr;

#[derive(Copy, Debug, Clone, Eq, PartialEq)]
pub enum PacketType {
    // A packet containing game data payloads
    Data,
    // A packet containing several aggregated child payloads
    Aggregate,
    // A packet acknowledging received sequences
    Ack,
    // A packet sent to maintain the connection by preventing a timeout
    Heartbeat,
    // A packet estimating round-trip time
    Ping,
    // The response to a Ping packet
    Pong,
    // A packet indicating the remote end is closing the connection
    Disconnect,
}

impl PacketType {
    pub fn to_u16(self) -> u16 {
        match self {
            PacketType::Data => 1,
            PacketType::Aggregate => 2,
            PacketType::Ack => 3,
            PacketType::Heartbeat => 4,
            PacketType::Ping => 5,
            PacketType::Pong => 6,
            PacketType::Disconnect => 7,
        }
    }

    pub fn from_u16(value: u16) -> Result<Self, SerdeErr> {
        match value {
            1 => Ok(PacketType::Data),
            2 => Ok(PacketType::Aggregate),
            3 => Ok(PacketType::Ack),
            4 => Ok(PacketType::Heartbeat),
            5 => Ok(PacketType::Ping),
            6 => Ok(PacketType::Pong),
            7 => Ok(PacketType::Disconnect),
            _ => Err(SerdeErr::UnknownDiscriminant {
                type_name: "PacketType",
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PacketType;

    #[test]
    fn round_trips_through_wire_code() {
        for packet_type in [
            PacketType::Data,
            PacketType::Aggregate,
            PacketType::Ack,
            PacketType::Heartbeat,
            PacketType::Ping,
            PacketType::Pong,
            PacketType::Disconnect,
        ] {
            assert_eq!(
                PacketType::from_u16(packet_type.to_u16()).unwrap(),
                packet_type
            );
        }
    }

    #[test]
    fn unknown_code_is_an_error() {
        assert!(PacketType::from_u16(0).is_err());
        assert!(PacketType::from_u16(999).is_err());
    }
}
