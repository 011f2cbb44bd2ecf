//! reforge-core: spaced-repetition scoring and session composition.
//!
//! Given a snapshot of one user's practice history, this crate ranks the
//! problems most in need of review and packs them into a time-boxed session.
//! Everything here is a pure computation over the snapshot; the loaders in
//! [`snapshot`], [`config`] and [`report`] are the only file I/O.

pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod model;
pub mod report;
pub mod scheduler;
pub mod scoring;
pub mod snapshot;
pub mod templates;
