//! Behavioural tests for the protocol crate.

mod validation_behaviour;
