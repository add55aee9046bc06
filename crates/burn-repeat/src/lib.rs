#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Burn repeat: element replication along an axis, for local and sharded arrays.
//!
//! The entry point is [`repeat`], which mirrors the reference `repeat(array, repeats, axis)`
//! contract. [`ShardedArray::repeat`] runs the same operation over an array partitioned
//! across a [`DeviceMesh`](sharding::DeviceMesh), using an exclusive scan of the repeat
//! counts as its only synchronization point.

extern crate alloc;

mod array;
mod error;
mod sharded;

pub mod repeat;
pub mod sharding;

pub use array::*;
pub use error::*;
pub use repeat::{ArrayArg, AxisArg, Number, RepeatsArg, repeat};
pub use sharded::*;
