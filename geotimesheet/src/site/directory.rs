//! Site directory port.

use futures::future::BoxFuture;

use super::Site;

/// Read-only source of known sites.
///
/// Implementations fetch a fresh snapshot from the backing store on demand.
/// The snapshot is an ordered sequence; resolver tie-breaking depends on
/// that order being stable between refreshes.
///
/// # Dyn Compatibility
///
/// Uses `BoxFuture` for the async method so the service can hold an
/// `Arc<dyn SiteDirectory>` regardless of the concrete backing store.
pub trait SiteDirectory: Send + Sync {
    /// Fetch all known sites.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError` on transport or API failure. Callers must
    /// degrade to an empty snapshot rather than abort tracking.
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<Site>, DirectoryError>>;
}

/// Errors from fetching the site snapshot.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Network-level failure reaching the backing store.
    #[error("site directory transport error: {0}")]
    Transport(String),

    /// The backing store rejected the request or returned an error payload.
    #[error("site directory API error: {0}")]
    Api(String),

    /// The response did not have the expected shape.
    #[error("unexpected site directory response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Directory serving a fixed snapshot, with optional failure injection.
    pub struct StaticSiteDirectory {
        pub sites: Vec<Site>,
        pub fail: bool,
    }

    impl StaticSiteDirectory {
        pub fn new(sites: Vec<Site>) -> Self {
            Self { sites, fail: false }
        }

        pub fn failing() -> Self {
            Self {
                sites: Vec::new(),
                fail: true,
            }
        }
    }

    impl SiteDirectory for StaticSiteDirectory {
        fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<Site>, DirectoryError>> {
            Box::pin(async move {
                if self.fail {
                    Err(DirectoryError::Transport("injected failure".to_string()))
                } else {
                    Ok(self.sites.clone())
                }
            })
        }
    }

    #[tokio::test]
    async fn test_static_directory_returns_snapshot() {
        use crate::coord::Coordinate;
        use crate::site::SiteId;

        let dir = StaticSiteDirectory::new(vec![Site::new(
            "s1",
            Coordinate::new(1.0, 2.0).unwrap(),
        )]);
        let sites = dir.fetch_all().await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].id, SiteId::new("s1"));
    }

    #[tokio::test]
    async fn test_failing_directory_errors() {
        let dir = StaticSiteDirectory::failing();
        assert!(dir.fetch_all().await.is_err());
    }
}
