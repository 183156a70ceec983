//! # Router Module
//!
//! Path template compilation and matching.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling path templates (e.g. `/show/<show_id>`) into [`Rule`]s at
//!   registration time
//! - Matching decoded request path segments against compiled rules
//! - Extracting variable bindings from matched paths
//! - Regenerating concrete paths from a rule plus keyword values
//!
//! ## Architecture
//!
//! Matching is a two-phase design:
//!
//! 1. **Compilation**: templates are split into literal and variable
//!    segments once, when the registry is built. Malformed templates fail
//!    startup with [`crate::PluginError::InvalidRule`].
//!
//! 2. **Matching**: a request path is compared segment-by-segment against
//!    each rule in registration order. Segment counts must be equal;
//!    literal segments compare byte-for-byte; variable segments bind.
//!
//! Registration order is significant: it is the deterministic tie-break
//! for both matching and reverse generation, so rules are always scanned
//! in insertion order.

mod core;

pub use core::{BindingVec, Rule, Segment, MAX_INLINE_BINDINGS};
