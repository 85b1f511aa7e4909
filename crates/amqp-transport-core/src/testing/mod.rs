//! Test utilities for the AMQP transport.
//!
//! - [`MockPeer`] - a loopback server that records traffic and replies on a script
//!
//! # Example
//!
//! ```rust,ignore
//! use amqp_transport_core::testing::{MockPeer, PeerBehavior};
//! use amqp_transport_core::Transport;
//!
//! #[tokio::test]
//! async fn test_round_trip() {
//!     let peer = MockPeer::start(PeerBehavior::Echo).await.unwrap();
//!     let mut transport = Transport::open(peer.transport_config()).await.unwrap();
//!
//!     transport.write(b"AMQP\x00\x00\x09\x01").await.unwrap();
//!     assert_eq!(&transport.read(8).await.unwrap()[..4], b"AMQP");
//! }
//! ```

pub mod mock_peer;

pub use mock_peer::{MockPeer, PeerBehavior, PeerScript};
