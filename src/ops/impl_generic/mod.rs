//! Generic implementations of composite operations.
//!
//! Composite operations (operations built from primitives) are defined here as
//! generic functions with trait bounds. Clients provide thin wrappers that call
//! these implementations.
//!
//! ```text
//! impl_generic/einsum.rs
//!     └── einsum_impl<C>()
//!             │
//!             └── cpu/einsum.rs delegates here
//! ```

pub mod einsum;
