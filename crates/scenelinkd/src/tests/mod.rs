//! Test suites for the command server.

mod lifecycle;
mod socket_behaviour;
