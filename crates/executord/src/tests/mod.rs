//! Test suites for the executor daemon.

mod support;
