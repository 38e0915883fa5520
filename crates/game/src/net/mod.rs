mod codec;
mod frame;
pub mod packets;
mod protocol;

pub use codec::{BitReader, BitWriter, CodecError, MAX_STRING_LEN, VAR_HEADER_BITS};
pub use frame::{Frame, FrameError, FrameReader, FrameWriter, HEADER_LEN, MAX_PAYLOAD_LEN};
pub use protocol::{Message, NoFields, PacketType, Payload, SpeedUp, DEFAULT_PORT, MAX_CHARACTERS};
