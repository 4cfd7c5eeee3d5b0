//! Host-side test suite for the scheduling core.
//!
//! Everything runs against the hosted simulator port: the mock clock is
//! advanced explicitly, context switches are logical commits, and the
//! recorded timer exposes what the scheduler programmed. Tests that touch
//! kernel globals go through `helpers::TestEnvironment`, which serializes
//! them and resets the world.

pub(crate) mod helpers;

mod integration;
