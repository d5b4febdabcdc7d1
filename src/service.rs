pub mod auction_house;
pub mod controller;
pub mod ui;

pub use self::{auction_house::*, controller::*};
use anyhow::{format_err, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Service execution control instance
///
/// All services are long running futures, and we would like to be able to
/// gracefully terminate them, and handle a top-level error of any of them
/// by gracefully stopping everything else.
#[derive(Clone, Default)]
pub struct ServiceControl {
    stop_all: CancellationToken,
}

impl ServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_all(&self) {
        self.stop_all.cancel();
    }

    /// Token a service watches to know when to finish
    pub fn stop_token(&self) -> CancellationToken {
        self.stop_all.child_token()
    }

    /// Start a service on the current runtime
    ///
    /// When the service finishes, for whatever reason, all other services
    /// are asked to stop too.
    pub fn spawn_service<F>(&self, name: &'static str, service: F) -> JoinHandle
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let stop_all = self.stop_all.clone();
        JoinHandle {
            name,
            inner: tokio::spawn(async move {
                let res = service.await;
                match &res {
                    Ok(()) => info!(service = name, "service finished"),
                    Err(e) => error!(service = name, error = %e, "service failed"),
                }
                stop_all.cancel();
                res
            }),
        }
    }
}

pub struct JoinHandle {
    name: &'static str,
    inner: tokio::task::JoinHandle<Result<()>>,
}

impl JoinHandle {
    pub async fn join(self) -> Result<()> {
        let Self { name, inner } = self;
        inner
            .await
            .map_err(|e| format_err!("join of {name} failed: {e:?}"))?
    }
}
