//! ACE Core - Layer identities, bus routing, and the layer message model

pub mod error;
pub mod message;
pub mod protocol;
pub mod router;
pub mod types;

pub use error::{Error, Result};
pub use message::{merge_messages, render_sub_messages, LayerMessage, LayerSubMessage, MessageType};
pub use protocol::*;
pub use router::{next_hop, BUSSES_DOWN, BUSSES_UP};
pub use types::*;
