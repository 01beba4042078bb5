//! Per-symbol tick pipeline and decision fusion (C8): sliding windows over
//! recent ticks/books, `MicroMetrics` computation, and a weighted fusion of
//! many small sub-signal kernels into a single scalar.

#![deny(dead_code)]
#![forbid(unsafe_code)]

pub mod fusion;
pub mod pipeline;
pub mod window;

pub use fusion::{FusionTable, Kernel, KernelId};
pub use pipeline::SymbolPipeline;
pub use window::SymbolWindow;
