use crate::net::codec::{BitReader, BitWriter, CodecError};
use crate::net::protocol::{read_small, Message, PacketType, Payload};

/// Raw frame injection for client debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugInject {
    pub broadcast: bool,
    pub packet_type: u16,
    pub payload: Vec<u8>,
}

impl Payload for DebugInject {
    fn encode(&self, w: &mut BitWriter) {
        w.write_bool(self.broadcast);
        w.write_bits(self.packet_type as u32, 16);
        w.write_list(&self.payload, |w, b| w.write_bits(*b as u32, 8));
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            broadcast: r.read_bool()?,
            packet_type: r.read_bits(16)? as u16,
            payload: r.read_list(|r| read_small(r, 8))?,
        })
    }
}

impl Message for DebugInject {
    const TYPE: PacketType = PacketType::DebugInject;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_payload_list() {
        let inject = DebugInject {
            broadcast: true,
            packet_type: 0x1B,
            payload: vec![0, 2, b'h', b'i', 0x80],
        };
        assert_eq!(
            DebugInject::from_payload(&inject.to_payload()).unwrap(),
            inject
        );
    }
}
