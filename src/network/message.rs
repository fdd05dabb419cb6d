use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use serde::{Deserialize, Serialize};

/// Wire type codes. `GetPeers`/`Peers` are reserved: encoded and decoded,
/// but not yet handled by any node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Tx = 0x1,
    Block = 0x2,
    GetBlocks = 0x3,
    Blocks = 0x4,
    GetStatus = 0x5,
    Status = 0x6,
    GetPeers = 0x7,
    Peers = 0x8,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = BlockchainError;

    fn try_from(code: u8) -> Result<MessageType> {
        match code {
            0x1 => Ok(MessageType::Tx),
            0x2 => Ok(MessageType::Block),
            0x3 => Ok(MessageType::GetBlocks),
            0x4 => Ok(MessageType::Blocks),
            0x5 => Ok(MessageType::GetStatus),
            0x6 => Ok(MessageType::Status),
            0x7 => Ok(MessageType::GetPeers),
            0x8 => Ok(MessageType::Peers),
            other => Err(BlockchainError::Serialization(format!(
                "unknown message type code: {other:#x}"
            ))),
        }
    }
}

/// The outer envelope every RPC travels in: a type code and the encoded
/// type-specific body.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Message {
    pub msg_type: u8,
    pub body: Vec<u8>,
}

impl Message {
    /// Encode `body` and wrap it in the envelope, ready for framing.
    pub fn encode<T: Serialize + bincode::Encode>(
        msg_type: MessageType,
        body: &T,
    ) -> Result<Vec<u8>> {
        let body = serialize(body)?;
        serialize(&Message {
            msg_type: msg_type.as_u8(),
            body,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Message> {
        deserialize(bytes)
    }
}

/// Request blocks at heights `[from, to]` inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetBlocksMessage {
    pub from: u32,
    pub to: u32,
}

/// A contiguous run of blocks, the reply to `GetBlocks` and the trigger for
/// reorganization.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct BlocksMessage {
    pub blocks: Vec<Block>,
}

impl BlocksMessage {
    pub fn first_block(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetStatusMessage {}

/// Lightweight gossip record used to decide whether to request blocks from
/// a peer.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct StatusMessage {
    pub id: String,
    pub version: u32,
    pub current_height: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetPeersMessage {}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct PeersMessage {
    pub peers: Vec<String>,
}
