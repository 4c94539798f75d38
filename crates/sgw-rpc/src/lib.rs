//! SGW RPC - the message-passing boundary between host and sandbox
//!
//! Host and worklet never share memory. Everything that crosses the boundary
//! is one of two message enums:
//! - [`ToWorklet`]: model-change notifications, request completions, termination
//! - [`FromWorklet`]: mutation requests, outward messages, script errors
//!
//! Every mutation request carries a [`RequestId`] allocated by the caller's
//! [`PendingTable`]; the host answers each request with exactly one
//! [`RpcResponse`] carrying the same id.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod channel;
pub mod error;
pub mod message;
pub mod pending;

pub use channel::{channel, HostEndpoint, WorkletEndpoint};
pub use error::{FailureKind, RpcFailure};
pub use message::{required_capability, FromWorklet, RequestId, RpcRequest, RpcResponse, ToWorklet};
pub use pending::PendingTable;
