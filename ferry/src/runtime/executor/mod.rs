//! The worker run loop.
//!
//! A single [`worker::Worker`] drives one cooperative scheduler on its
//! own thread. Tasks are interleaved on that thread only, switching at
//! their suspension points.

pub(crate) mod worker;
