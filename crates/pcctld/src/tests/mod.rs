//! Test suites for the PC control daemon.

pub(crate) mod support;
mod unit;
