//! Secondary surface (the window hosting the third-party consent flow)
//!
//! A surface lives outside this process, so its closure is reported through
//! an explicit channel: whoever can observe the user finishing (the terminal,
//! the console API) holds a [`SurfaceCloser`] and fires it.

use std::sync::Arc;

use tokio::sync::watch;

use super::error::IntegrationError;

/// Observer side of an opened surface
#[derive(Debug)]
pub struct SurfaceHandle {
    url: String,
    closed: watch::Receiver<bool>,
    closer: SurfaceCloser,
}

/// Fires the closure signal of one surface
#[derive(Debug, Clone)]
pub struct SurfaceCloser {
    tx: Arc<watch::Sender<bool>>,
}

impl SurfaceCloser {
    pub fn close(&self) {
        // send_replace succeeds even with no live receivers
        self.tx.send_replace(true);
    }
}

impl SurfaceHandle {
    pub fn new(url: impl Into<String>) -> Self {
        let (tx, closed) = watch::channel(false);
        Self {
            url: url.into(),
            closed,
            closer: SurfaceCloser { tx: Arc::new(tx) },
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub fn closer(&self) -> SurfaceCloser {
        self.closer.clone()
    }
}

/// Opens a surface navigated to an authorization URL
pub trait SurfaceLauncher: Send + Sync {
    fn launch(&self, url: String) -> Result<SurfaceHandle, IntegrationError>;
}

/// Opens the URL in the system browser
pub struct BrowserLauncher;

impl SurfaceLauncher for BrowserLauncher {
    fn launch(&self, url: String) -> Result<SurfaceHandle, IntegrationError> {
        open::that(&url).map_err(|e| IntegrationError::SurfaceLaunch(e.to_string()))?;
        tracing::info!("Opened authorization window in the system browser");
        Ok(SurfaceHandle::new(url))
    }
}

/// Leaves opening the URL to the operator
pub struct ManualLauncher;

impl SurfaceLauncher for ManualLauncher {
    fn launch(&self, url: String) -> Result<SurfaceHandle, IntegrationError> {
        tracing::info!("Authorization URL ready to be opened manually");
        Ok(SurfaceHandle::new(url))
    }
}
