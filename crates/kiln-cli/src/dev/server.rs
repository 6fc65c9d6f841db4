//! Development server listener.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use super::router::build_router;
use super::state::DevState;
use super::tls;
use crate::error::ServerError;

/// A bound development server, plain or TLS.
pub struct DevServer {
    state: Arc<DevState>,
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    addr: SocketAddr,
}

impl DevServer {
    /// Bind the configured port on all interfaces.
    ///
    /// # Errors
    ///
    /// - `TlsMisconfigured` when `[https]` lacks the key or the certificate
    /// - `TlsMaterial` when the key or certificate cannot be loaded
    /// - `Bind` when the port is taken
    pub async fn bind(state: Arc<DevState>) -> Result<Self, ServerError> {
        let config = state.current_config().await;
        let tls = match config.tls_material() {
            Ok(Some(material)) => Some(tls::load_acceptor(&material)?),
            Ok(None) => None,
            Err(err) => return Err(ServerError::TlsMisconfigured(err.to_string())),
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let addr = listener.local_addr().map_err(ServerError::Serve)?;

        Ok(Self {
            state,
            listener,
            tls,
            addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Base URL for `host`, e.g. `https://localhost:1636`.
    pub fn url(&self, host: &str) -> String {
        let scheme = if self.is_tls() { "https" } else { "http" };
        format!("{scheme}://{host}:{}", self.addr.port())
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = build_router(self.state);
        match self.tls {
            None => axum::serve(self.listener, router)
                .with_graceful_shutdown(shutdown)
                .await
                .map_err(ServerError::Serve),
            Some(acceptor) => {
                tls::serve(self.listener, acceptor, router, shutdown).await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::{AppConfig, HttpsConfig};
    use std::path::PathBuf;

    fn state(port: u16, https: Option<HttpsConfig>) -> Arc<DevState> {
        Arc::new(DevState::new(AppConfig {
            port,
            https,
            ..AppConfig::default()
        }))
    }

    #[tokio::test]
    async fn incomplete_https_is_fatal() {
        let https = HttpsConfig {
            key: Some(PathBuf::from("key.pem")),
            cert: None,
        };
        let err = DevServer::bind(state(0, Some(https))).await.err().unwrap();
        assert!(matches!(err, ServerError::TlsMisconfigured(ref msg) if msg.contains("https.cert")));
    }

    #[tokio::test]
    async fn plain_http_on_an_ephemeral_port() {
        let server = DevServer::bind(state(0, None)).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert!(!server.is_tls());
        assert!(server.url("localhost").starts_with("http://localhost:"));

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(async move {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn taken_port_is_a_bind_error() {
        let holder = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = holder.local_addr().unwrap().port();
        let err = DevServer::bind(state(port, None)).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
