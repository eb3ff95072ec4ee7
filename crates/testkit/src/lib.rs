//! # Preinit Testkit
//!
//! Test utilities for preinit:
//! - [`SimHeap`]: in-memory object model with a base image and object moves
//! - [`SimInternTable`]: strong and weak intern sets
//! - [`Relocator`]: root visitor applying a forwarding table
//! - proptest strategies in [`generators`]
//!
//! ```rust,ignore
//! use preinit_testkit::prelude::*;
//!
//! let mut heap = SimHeap::new();
//! let class = heap.alloc_class("LFoo;");
//! let obj = heap.alloc_instance(class);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod generators;
pub mod heap;
pub mod intern;
pub mod relocator;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::generators::*;
    pub use crate::heap::SimHeap;
    pub use crate::intern::SimInternTable;
    pub use crate::relocator::Relocator;
}

pub use heap::SimHeap;
pub use intern::SimInternTable;
pub use relocator::Relocator;
