//! Peer-to-peer networking
//!
//! The typed message set, length-prefix framed TCP transport, and the node
//! server that ties chain, pool, and peers together.

pub mod message;
pub mod server;
pub mod transport;

pub use message::{
    BlocksMessage, GetBlocksMessage, GetPeersMessage, GetStatusMessage, Message, MessageType,
    PeersMessage, StatusMessage,
};
pub use server::{Server, NODE_VERSION};
pub use transport::{
    read_frame, write_frame, NetEvent, TcpPeer, TcpTransport, MAX_FRAME_SIZE, RPC,
};
