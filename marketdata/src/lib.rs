//! Market-data normalization (C7): FIX snapshot/incremental and
//! Binance-style JSON decoders, both producing [`lob::OrderBook`] updates
//! and [`common::CanonicalTick`]s through a shared per-symbol
//! [`normalizer::SymbolNormalizer`].

#![deny(dead_code)]
#![forbid(unsafe_code)]

pub mod binance;
pub mod fix_md;
pub mod normalizer;

pub use normalizer::{NormalizerError, SymbolNormalizer};
