//! Application bootstrap
//!
//! Wires the state controller, the background timers and the HTTP server
//! together and keeps them running until the process is interrupted.

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::controller::Controller;
use crate::server::{self, ServerHandle};
use crate::timers;

/// Running dashboard
pub struct App {
    controller: Controller,
    server: ServerHandle,
    /// Status ticker and probe emitter
    timers: Vec<JoinHandle<()>>,
}

impl App {
    /// Start every component from the given settings
    pub async fn new(config: Config) -> Result<Self> {
        let runtime = config.runtime_config()?;
        let controller = Controller::spawn_with(runtime, config.channel_buffer);

        let started = Instant::now();
        let timers = vec![
            tokio::spawn(timers::run_status_ticker(
                controller.clone(),
                controller.period_updates(),
                started,
            )),
            tokio::spawn(timers::run_probe_emitter(
                controller.clone(),
                config.probe_interval(),
            )),
        ];

        let server = server::start(config.listen_addr(), controller.clone()).await?;

        Ok(Self {
            controller,
            server,
            timers,
        })
    }

    /// Address the dashboard is served on
    pub fn addr(&self) -> SocketAddr {
        self.server.addr()
    }

    /// Handle to the state controller
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Serve until Ctrl-C, then shut down
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            "Statusboard running on http://{}. Press Ctrl-C to stop.",
            self.addr()
        );

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;

        tracing::info!("Shutdown requested");
        self.shutdown().await
    }

    /// Stop the background timers, then drain the server
    pub async fn shutdown(self) -> Result<()> {
        for timer in &self.timers {
            timer.abort();
        }
        self.server.shutdown().await
    }
}
