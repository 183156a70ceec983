//! # Dispatcher Module
//!
//! Orchestration of one dispatch run.
//!
//! ## Overview
//!
//! The dispatcher ties the pieces together for a single process
//! invocation. It:
//! - Parses the raw invocation arguments into a [`crate::Request`]
//! - Runs the matcher over the aggregated registry
//! - Invokes the bound view with merged keyword arguments
//! - Routes the view's outcome to the renderer or resolver
//! - Flushes open storage instances when the run reaches `Done`
//!
//! ## State machine
//!
//! A run moves through three states: `Idle → Dispatching → Done`. `Done`
//! is terminal; `run` consumes the dispatcher so no further dispatch can
//! happen through it. Data flows one direction per run:
//!
//! ```text
//! raw URL → Request → match → view → ViewOutcome → renderer/resolver
//! ```
//!
//! ## View outcomes
//!
//! Views return a closed tagged union, [`ViewOutcome`]: a directory
//! listing, a redirect to another URL (re-entering matching within the
//! same run, bounded by [`MAX_REDIRECT_HOPS`]), or a single resolved
//! playable item.
//!
//! ## Error handling
//!
//! A failed match terminates the run with `NotFound` and no partial
//! output. Errors raised by view code propagate unmodified; there is no
//! catch, no retry, and no way to abort a view mid-execution.

mod core;

pub use core::{
    DispatchState, Dispatcher, View, ViewContext, ViewOutcome, ViewResult, MAX_REDIRECT_HOPS,
};
