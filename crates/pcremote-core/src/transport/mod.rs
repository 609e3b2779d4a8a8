//! Transport layer module.

pub mod mock;
pub mod tcp;
pub mod traits;

pub use mock::{MockConnector, MockTransport};
pub use tcp::{TcpConnector, TcpTransport};
pub use traits::{Connector, RemoteTransport, TransportError};
