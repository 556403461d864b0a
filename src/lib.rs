//! kgate CLI library — exposes modules for integration testing.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod bridge;
pub mod cli;
pub mod command_runner;
pub mod commands;
pub mod docker;
pub mod domain;
pub mod gateway;
pub mod gcloud;
pub mod output;
