//! NETCONF-style management sessions over TCP.
//!
//! - [`framing`]: `]]>]]>`-delimited message framing
//! - [`rpc`]: request decoding, reply rendering, hello documents
//! - [`dispatcher`]: request execution against the topology
//! - [`session`]: the per-connection handshake and request loop
//! - [`server`]: the TCP listener

pub mod dispatcher;
pub mod framing;
pub mod rpc;
pub mod server;
pub mod session;

pub use dispatcher::Dispatcher;
pub use framing::{FrameReader, FrameWriter, FramingError, DELIMITER};
pub use rpc::{Datastore, ErrorTag, ErrorType, Message, Operation, RpcError, RpcReply, RpcRequest};
pub use server::NetconfServer;
pub use session::{Session, SessionError, SessionSettings, SessionState};
