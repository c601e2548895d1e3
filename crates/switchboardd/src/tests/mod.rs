//! Test suites for the switchboard daemon.

mod support;
