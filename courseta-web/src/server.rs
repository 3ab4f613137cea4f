//! Web server implementation using Axum

use crate::{create_app, AppState, WebConfig};
use axum::serve;
use courseta_core::CoursetaResult;
use tokio::net::TcpListener;
use tracing::info;

/// Main Courseta web server
pub struct CoursetaServer {
    config: WebConfig,
    state: AppState,
}

impl CoursetaServer {
    pub fn new(config: WebConfig) -> CoursetaResult<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Bind and serve until shutdown
    pub async fn start(self) -> CoursetaResult<()> {
        let address = self.config.address();

        info!("Starting Courseta web server on http://{}", address);

        let app = create_app(self.state);
        let listener = TcpListener::bind(&address).await?;

        info!("Server listening on http://{}", address);

        serve(listener, app).await?;
        Ok(())
    }

    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for `CoursetaServer`
pub struct CoursetaServerBuilder {
    config: WebConfig,
}

impl CoursetaServerBuilder {
    pub fn new() -> Self {
        Self {
            config: WebConfig::from_env(),
        }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.dev_mode = dev_mode;
        self
    }

    pub fn snapshot_path<S: Into<String>>(mut self, snapshot_path: S) -> Self {
        self.config.snapshot_path = snapshot_path.into();
        self
    }

    pub fn build(self) -> CoursetaResult<CoursetaServer> {
        CoursetaServer::new(self.config)
    }
}

impl Default for CoursetaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
