//! Docker CLI abstraction — image build and registry push.

use std::process::Output;

use anyhow::{Context, Result};

use crate::command_runner::{CommandRunner, DEFAULT_MUTATE_TIMEOUT, TokioCommandRunner};

/// Abstraction over the image build/push toolchain.
#[allow(async_fn_in_trait)]
pub trait ImageBuilder {
    /// Run `docker build -t <tag> <context_dir>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn build(&self, context_dir: &str, tag: &str) -> Result<Output>;

    /// Run `docker push <tag>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn push(&self, tag: &str) -> Result<Output>;
}

/// Production implementation — shells out to the `docker` binary.
pub struct DockerCli<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> DockerCli<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl DockerCli<TokioCommandRunner> {
    /// Convenience constructor for production use. Builds and pushes are
    /// slow, so the mutate timeout applies to both.
    #[must_use]
    pub fn default_runner() -> Self {
        Self {
            runner: TokioCommandRunner::new(DEFAULT_MUTATE_TIMEOUT),
        }
    }
}

impl<R: CommandRunner> ImageBuilder for DockerCli<R> {
    async fn build(&self, context_dir: &str, tag: &str) -> Result<Output> {
        self.runner
            .run("docker", &["build", "-t", tag, context_dir])
            .await
            .context("failed to run docker build")
    }

    async fn push(&self, tag: &str) -> Result<Output> {
        self.runner
            .run("docker", &["push", tag])
            .await
            .context("failed to run docker push")
    }
}
