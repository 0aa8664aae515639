//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds a full [`AppContext`] on top of a
//! temporary storage directory. The [`with_server`] constructor starts Axum
//! on a random port for HTTP-level testing.

use std::net::SocketAddr;
use std::path::PathBuf;

use tempfile::TempDir;

use convertaphile::config::Config;
use convertaphile::server::{build_context, create_router, AppContext};

/// Test harness wrapping a fully-constructed [`AppContext`] backed by a
/// temporary directory that is removed when the harness drops.
pub struct TestHarness {
    pub ctx: AppContext,
    _storage: TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration and temp-dir storage.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration; storage paths are
    /// always redirected into a fresh temporary directory.
    pub fn with_config(mut config: Config) -> Self {
        let storage = TempDir::new().expect("failed to create temp dir");
        config.storage.temp_dir = Some(storage.path().join("uploads"));
        config.storage.converted_dir = Some(storage.path().join("converted"));

        let ctx = build_context(&config).expect("failed to build context");
        Self {
            ctx,
            _storage: storage,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Directory where converted artifacts are stored for download.
    pub fn converted_dir(&self) -> PathBuf {
        self.ctx.converted_dir.clone()
    }
}

/// True when both ffmpeg and ffprobe are runnable on this machine.
pub fn media_tools_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}

/// A valid 1x1 white GIF, small enough to embed directly.
pub const TINY_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff,
    0xff, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];
