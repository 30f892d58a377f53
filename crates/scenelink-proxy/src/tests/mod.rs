//! Test suites for the REST proxy.

mod proxy_behaviour;
mod routes;
mod support;
