mod codec;
mod message;

pub use codec::MessageCodec;
pub use message::{HealthReport, Message, MessageType, TaskAssignment, TaskResultReport};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid message type: {0}")]
    InvalidMessageType(u8),

    #[error("Empty frame")]
    EmptyFrame,

    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Maximum frame size. Task results carry captured command output, which is
/// expected to stay well under this.
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;
