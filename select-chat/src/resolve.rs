//! Startup address resolution, binding and connecting.
//!
//! Both helpers run once before an event loop starts and hand back plain std
//! sockets in non-blocking mode, ready to be registered with a multiplexer.

use std::net::{SocketAddr, TcpListener, TcpStream};

use tracing::debug;

use crate::error::ResolveError;

/// Binds the first address `host:port` resolves to that accepts a bind.
pub async fn bind_listener(host: &str, port: u16) -> Result<TcpListener, ResolveError> {
    let mut last_error = None;
    for addr in lookup(host, port).await? {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                debug!(%addr, "bound listening endpoint");
                return listener.into_std().map_err(|source| ResolveError::Bind {
                    host: host.to_string(),
                    port,
                    source,
                });
            }
            Err(err) => {
                debug!(%addr, error = ?err, "bind failed; trying next address");
                last_error = Some(err);
            }
        }
    }

    Err(match last_error {
        Some(source) => ResolveError::Bind {
            host: host.to_string(),
            port,
            source,
        },
        None => ResolveError::NoAddresses {
            host: host.to_string(),
            port,
        },
    })
}

/// Connects to the first address `host:port` resolves to that answers.
pub async fn connect(host: &str, port: u16) -> Result<TcpStream, ResolveError> {
    let mut last_error = None;
    for addr in lookup(host, port).await? {
        match tokio::net::TcpStream::connect(addr).await {
            Ok(stream) => {
                debug!(%addr, "connected");
                return stream.into_std().map_err(|source| ResolveError::Connect {
                    host: host.to_string(),
                    port,
                    source,
                });
            }
            Err(err) => {
                debug!(%addr, error = ?err, "connect failed; trying next address");
                last_error = Some(err);
            }
        }
    }

    Err(match last_error {
        Some(source) => ResolveError::Connect {
            host: host.to_string(),
            port,
            source,
        },
        None => ResolveError::NoAddresses {
            host: host.to_string(),
            port,
        },
    })
}

async fn lookup(host: &str, port: u16) -> Result<Vec<SocketAddr>, ResolveError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| ResolveError::Lookup {
            host: host.to_string(),
            port,
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(ResolveError::NoAddresses {
            host: host.to_string(),
            port,
        });
    }
    Ok(addrs)
}
