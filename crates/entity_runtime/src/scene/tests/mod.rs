//! Scene manager integration tests

mod commit_integration;
