//! Runtime backends
//!
//! Only the CPU backend exists. Tensors live in host memory and every kernel
//! runs synchronously on the calling thread, optionally fanning out to the
//! rayon pool for large workloads.

pub mod cpu;

pub use cpu::{CpuClient, CpuConfig};
