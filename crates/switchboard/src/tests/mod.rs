//! Behavioural test suites for the dispatch pipeline.

mod behaviour;
