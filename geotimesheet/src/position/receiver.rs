//! UDP fix receiver.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::fix::{Fix, FixError, DEFAULT_STALENESS};

/// Default UDP port for incoming fix datagrams.
pub const DEFAULT_FIX_PORT: u16 = 48701;

/// Maximum datagram size accepted.
const MAX_DATAGRAM_BYTES: usize = 2048;

/// Receiver configuration.
#[derive(Debug, Clone)]
pub struct FixReceiverConfig {
    /// UDP port to listen on.
    pub port: u16,
    /// Bind address.
    pub bind_address: IpAddr,
    /// Fixes older than this are discarded as "no better information".
    pub staleness: Duration,
}

impl Default for FixReceiverConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_FIX_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            staleness: DEFAULT_STALENESS,
        }
    }
}

/// One fix datagram on the wire.
///
/// ```json
/// {"lat": 53.5511, "lng": 9.9937, "timestamp": "2026-08-06T09:15:00Z"}
/// ```
#[derive(Debug, Deserialize)]
struct FixDatagram {
    lat: f64,
    lng: f64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Errors from the fix receiver.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// Could not bind the UDP socket.
    #[error("failed to bind fix receiver on port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },

    /// Socket receive failure.
    #[error("fix receiver I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Listens for fix datagrams and forwards validated fixes.
///
/// Invalid datagrams (unparseable JSON, out-of-range coordinates, missing
/// timestamp) and stale fixes are logged at debug level and dropped; they
/// never reach the tracker.
pub struct FixReceiver {
    config: FixReceiverConfig,
    tx: mpsc::Sender<Fix>,
}

impl FixReceiver {
    /// Create a receiver feeding the given channel.
    pub fn new(config: FixReceiverConfig, tx: mpsc::Sender<Fix>) -> Self {
        Self { config, tx }
    }

    /// Bind the socket and receive until cancelled or the channel closes.
    pub async fn run(self, cancellation: CancellationToken) -> Result<(), ReceiverError> {
        let socket = UdpSocket::bind((self.config.bind_address, self.config.port))
            .await
            .map_err(|source| ReceiverError::Bind {
                port: self.config.port,
                source,
            })?;
        tracing::info!(port = self.config.port, "Fix receiver listening");
        self.serve(socket, cancellation).await
    }

    async fn serve(
        self,
        socket: UdpSocket,
        cancellation: CancellationToken,
    ) -> Result<(), ReceiverError> {
        let mut buf = [0u8; MAX_DATAGRAM_BYTES];
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    tracing::debug!("Fix receiver cancelled");
                    return Ok(());
                }

                result = socket.recv_from(&mut buf) => {
                    let (len, _) = result?;
                    let fix = match parse_datagram(&buf[..len]) {
                        Ok(fix) => fix,
                        Err(reason) => {
                            tracing::debug!(%reason, "Discarding fix datagram");
                            continue;
                        }
                    };
                    if fix.is_stale(Utc::now(), self.config.staleness) {
                        tracing::debug!(
                            age_secs = fix.age(Utc::now()).as_secs(),
                            "Discarding stale fix"
                        );
                        continue;
                    }
                    if self.tx.send(fix).await.is_err() {
                        tracing::debug!("Fix channel closed");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Reasons a datagram is dropped before reaching the tracker.
#[derive(Debug, thiserror::Error)]
enum DatagramError {
    #[error("malformed datagram: {0}")]
    Malformed(String),

    #[error(transparent)]
    Invalid(#[from] FixError),
}

fn parse_datagram(bytes: &[u8]) -> Result<Fix, DatagramError> {
    let datagram: FixDatagram = serde_json::from_slice(bytes)
        .map_err(|e| DatagramError::Malformed(e.to_string()))?;
    let timestamp = datagram.timestamp.ok_or(FixError::MissingTimestamp)?;
    Ok(Fix::from_raw(datagram.lat, datagram.lng, timestamp)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_parse_valid_datagram() {
        let bytes = br#"{"lat": 53.5511, "lng": 9.9937, "timestamp": "2023-11-14T22:13:20Z"}"#;
        let fix = parse_datagram(bytes).unwrap();
        assert!((fix.location().latitude() - 53.5511).abs() < 1e-9);
        assert_eq!(fix.timestamp(), now());
    }

    #[test]
    fn test_parse_rejects_missing_timestamp() {
        let bytes = br#"{"lat": 53.5511, "lng": 9.9937}"#;
        assert!(matches!(
            parse_datagram(bytes),
            Err(DatagramError::Invalid(FixError::MissingTimestamp))
        ));
    }

    #[test]
    fn test_parse_rejects_out_of_range_coordinates() {
        let bytes = br#"{"lat": 153.0, "lng": 9.9937, "timestamp": "2023-11-14T22:13:20Z"}"#;
        assert!(matches!(
            parse_datagram(bytes),
            Err(DatagramError::Invalid(FixError::InvalidCoordinate(_)))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_datagram(b"not json"),
            Err(DatagramError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_receiver_forwards_valid_fixes() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let receiver = FixReceiver::new(FixReceiverConfig::default(), tx);
        let cancellation = CancellationToken::new();
        let serve_cancel = cancellation.clone();
        let handle = tokio::spawn(async move { receiver.serve(socket, serve_cancel).await });

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let timestamp = Utc::now().to_rfc3339();
        let datagram = format!(
            r#"{{"lat": 48.1351, "lng": 11.5820, "timestamp": "{}"}}"#,
            timestamp
        );
        sender.send_to(datagram.as_bytes(), addr).await.unwrap();

        let fix = rx.recv().await.unwrap();
        assert!((fix.location().latitude() - 48.1351).abs() < 1e-9);

        cancellation.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_receiver_drops_stale_and_invalid_datagrams() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let receiver = FixReceiver::new(FixReceiverConfig::default(), tx);
        let cancellation = CancellationToken::new();
        let serve_cancel = cancellation.clone();
        let handle = tokio::spawn(async move { receiver.serve(socket, serve_cancel).await });

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // Stale: a minute old against a 30s bound
        let stale = (Utc::now() - chrono::Duration::seconds(60)).to_rfc3339();
        let stale_datagram =
            format!(r#"{{"lat": 1.0, "lng": 1.0, "timestamp": "{}"}}"#, stale);
        sender.send_to(stale_datagram.as_bytes(), addr).await.unwrap();

        // Invalid JSON
        sender.send_to(b"garbage", addr).await.unwrap();

        // Valid fix after the junk
        let fresh = format!(
            r#"{{"lat": 2.0, "lng": 2.0, "timestamp": "{}"}}"#,
            Utc::now().to_rfc3339()
        );
        sender.send_to(fresh.as_bytes(), addr).await.unwrap();

        let fix = rx.recv().await.unwrap();
        assert!((fix.location().latitude() - 2.0).abs() < 1e-9);
        assert!(rx.try_recv().is_err());

        cancellation.cancel();
        handle.await.unwrap().unwrap();
    }
}
