//! Free-port selection.

use std::io::ErrorKind;

use tokio::net::TcpListener;

use crate::error::ServerError;
use crate::Result;

/// Bind the first available port at or above the requested one.
///
/// `requested` is the port the operator asked for; without one the search
/// starts at `default_port`. Landing on a different port than an explicitly
/// requested one is logged as a warning. Otherwise the substitution is silent.
///
/// # Errors
///
/// Returns [`ServerError::NoFreePort`] when every candidate port is taken,
/// or [`ServerError::BindFailed`] for errors other than the port being busy.
pub async fn bind_available(
    host: &str,
    requested: Option<u16>,
    default_port: u16,
) -> Result<TcpListener> {
    let start = requested.unwrap_or(default_port);

    for port in start..=u16::MAX {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                let actual = listener.local_addr()?.port();
                if let Some(requested) = requested {
                    if actual != requested {
                        tracing::warn!(
                            requested,
                            actual,
                            "Port number {requested} is not available. Using port number {actual}."
                        );
                    }
                }
                return Ok(listener);
            }
            Err(e) if matches!(e.kind(), ErrorKind::AddrInUse | ErrorKind::PermissionDenied) => {
                tracing::trace!(port, error = %e, "Port unavailable");
            }
            Err(e) => {
                return Err(ServerError::BindFailed {
                    address: format!("{host}:{port}"),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    Err(ServerError::NoFreePort { start }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::capture_logs;

    #[tokio::test]
    async fn test_binds_requested_port_when_free() {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let listener = bind_available("127.0.0.1", Some(port), 3456).await.unwrap();
        assert_eq!(listener.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_skips_occupied_port() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let listener = bind_available("127.0.0.1", Some(port), 3456).await.unwrap();
        let actual = listener.local_addr().unwrap().port();
        assert_ne!(actual, port);
        assert!(actual > port);
    }

    #[tokio::test]
    async fn test_default_port_used_without_request() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let listener = bind_available("127.0.0.1", None, port).await.unwrap();
        assert!(listener.local_addr().unwrap().port() > port);
    }

    #[tokio::test]
    async fn test_substituted_requested_port_warns_with_both_ports() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let (logs, _guard) = capture_logs(tracing::Level::WARN);

        let listener = bind_available("127.0.0.1", Some(port), 3456).await.unwrap();
        let actual = listener.local_addr().unwrap().port();

        let text = logs.text();
        assert!(text.contains("WARN"), "logs: {text}");
        assert!(
            text.contains(&format!("Port number {port} is not available")),
            "logs: {text}"
        );
        assert!(text.contains(&format!("Using port number {actual}")), "logs: {text}");
    }

    #[tokio::test]
    async fn test_default_port_substitution_is_silent() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let (logs, _guard) = capture_logs(tracing::Level::WARN);

        let listener = bind_available("127.0.0.1", None, port).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), port);
        assert!(logs.text().is_empty(), "logs: {}", logs.text());
    }

    #[tokio::test]
    async fn test_free_requested_port_is_silent() {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        let (logs, _guard) = capture_logs(tracing::Level::WARN);

        bind_available("127.0.0.1", Some(port), 3456).await.unwrap();
        assert!(logs.text().is_empty(), "logs: {}", logs.text());
    }

    #[tokio::test]
    async fn test_no_free_port_when_last_port_taken() {
        let Ok(_taken) = std::net::TcpListener::bind(("127.0.0.1", u16::MAX)) else {
            return;
        };
        let err = bind_available("127.0.0.1", Some(u16::MAX), 3456)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no free port"));
    }

    #[tokio::test]
    async fn test_bad_host_fails() {
        let err = bind_available("256.0.0.1", Some(4000), 3456).await.unwrap_err();
        assert!(matches!(err, crate::Error::Server(_)));
    }
}
