//! `ntally` is a set of libraries for scoring Monte Carlo particle transport
//! estimators
//!
#![doc = include_str!("../readme.md")]
#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Re-exports of library crates.
#[doc(inline)]
pub use ntally_utils as utils;

#[cfg(feature = "geometry")]
#[cfg_attr(docsrs, doc(cfg(feature = "geometry")))]
#[doc(inline)]
pub use ntally_geometry as geometry;

#[cfg(feature = "estimator")]
#[cfg_attr(docsrs, doc(cfg(feature = "estimator")))]
#[doc(inline)]
pub use ntally_estimator as estimator;
