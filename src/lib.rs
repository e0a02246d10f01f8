//! # Fmait
//!
//! Fmait is a library which maps a sequence of values through an ordered list of asynchronous
//! stages.
//!
//! ## Stages
//!
//! A stage is a unary transformation applied to every element of the working sequence. Every
//! element of a stage is launched at once and the stage is joined before the next stage begins.
//! Results always keep the positional order of the input, regardless of which element resolves
//! first.
//!
//! ```
//! # use std::convert::Infallible;
//! # use fmait::prelude::*;
//! let stages = vec![
//!     stage::from_fn(|x: i32| x + 1).boxed(),
//!     stage::from_fn(|x: i32| x * 2).boxed(),
//! ];
//! let result: Result<Vec<i32>, Infallible> =
//!     tokio_test::block_on(fmait::map(&stages, vec![1, 2, 3]));
//! assert_eq!(result.unwrap(), vec![4, 6, 8]);
//! ```
//!
//! ## Pipelines
//!
//! Stages which change the element type between steps can be composed with a `Link`, built
//! either through the `link!` macro or through the `StagedMapper` builder methods.
//!
//! ## Failures
//!
//! The first failing element aborts the whole pipeline. The error is handed back exactly as the
//! stage produced it, the pipeline never wraps it.

/// An error type and rejection macros for stage functions.
pub mod error;
/// Running stages over whole sequences, with a barrier between every stage.
pub mod pipeline;
pub mod prelude;
/// The per-element transformation trait and its adapters.
pub mod stage;

pub use pipeline::map;
