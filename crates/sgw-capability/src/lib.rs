//! SGW Capability - worklet permission model
//!
//! A worklet declares what it may do through an `allow` string such as
//! `"material-properties; messaging"`. This crate turns that string into an
//! immutable [`CapabilitySet`] that the host consults before applying any
//! mutation requested from inside the sandbox.
//!
//! # Example
//!
//! ```rust
//! use sgw_capability::{Capability, CapabilitySet};
//!
//! let caps = CapabilitySet::parse("material-properties; messaging");
//! assert!(caps.contains(Capability::MaterialProperties));
//! assert!(!caps.contains(Capability::Textures));
//! ```

#![warn(unreachable_pub)]

pub mod capability;
pub mod error;
pub mod set;

pub use capability::Capability;
pub use error::CapabilityError;
pub use set::CapabilitySet;
