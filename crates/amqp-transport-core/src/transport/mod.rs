//! Socket transport to an AMQP broker.
//!
//! - [`Transport`] - connect, exact-length reads, full writes, heartbeat liveness
//! - [`AmqpStream`] - plain TCP or TLS socket
//! - [`Endpoint`] - `tcp://` / `ssl://` target address

mod connection;
mod endpoint;
mod stream;

pub use connection::{SocketMode, Transport};
pub use endpoint::{Endpoint, Scheme};
pub use stream::AmqpStream;
