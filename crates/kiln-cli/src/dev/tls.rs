//! HTTPS listener.

use std::fs::File;
use std::future::Future;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use kiln_config::TlsMaterial;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls;

use crate::error::ServerError;

fn open(path: &Path, what: &str) -> Result<BufReader<File>, ServerError> {
    File::open(path).map(BufReader::new).map_err(|err| {
        ServerError::TlsMaterial(format!("cannot open {what} {}: {err}", path.display()))
    })
}

/// Build an acceptor from PEM key and certificate files.
pub fn load_acceptor(material: &TlsMaterial) -> Result<TlsAcceptor, ServerError> {
    let mut cert_reader = open(&material.cert, "certificate")?;
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ServerError::TlsMaterial(format!("cannot parse certificates: {err}")))?;
    if certs.is_empty() {
        return Err(ServerError::TlsMaterial(format!(
            "no certificate in {}",
            material.cert.display()
        )));
    }

    let mut key_reader = open(&material.key, "key")?;
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|err| ServerError::TlsMaterial(format!("cannot parse private key: {err}")))?
        .ok_or_else(|| {
            ServerError::TlsMaterial(format!("no private key in {}", material.key.display()))
        })?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| ServerError::TlsMaterial(format!("invalid key or certificate: {err}")))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Accept TLS connections until `shutdown` resolves.
///
/// Connections already accepted finish on their own tasks.
pub async fn serve(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) {
    tokio::pin!(shutdown);
    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::warn!("accept failed: {err}");
                    continue;
                }
            },
        };

        let acceptor = acceptor.clone();
        let service = TowerToHyperService::new(router.clone());
        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::debug!(%peer, "TLS handshake failed: {err}");
                    return;
                }
            };
            if let Err(err) = auto::Builder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(%peer, "connection error: {err}");
            }
        });
    }
}
