//! Rock & Bot: a single-server Discord radio bot controlled from one
//! persistent panel message (buttons + station select) and a few prefix
//! commands.

pub mod bot;
pub mod catalog;
pub mod config;
pub mod error;
pub mod panel;
pub mod playback;
pub mod session;
pub mod voice;

pub use error::{Error, Result};

use serenity::cache::Cache;
use serenity::http::Http;
use serenity::prelude::TypeMapKey;
use songbird::Songbird;
use songbird::tracks::TrackHandle;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared dependency bundle for every trigger: configuration, the station
/// catalog, platform handles and the one mutable session record. Owned by
/// the top-level service and passed by reference into every handler; there
/// is no global singleton.
pub struct Radio {
    pub config: config::Config,
    pub catalog: catalog::StationCatalog,
    pub http: Arc<Http>,
    pub cache: Arc<Cache>,
    pub manager: Arc<Songbird>,
    pub session: Mutex<session::Session>,
    /// Handle to the track currently feeding the voice connection, if any.
    /// Kept outside [`session::Session`] so the state record stays a plain
    /// testable value.
    pub current_track: Mutex<Option<TrackHandle>>,
}

impl Radio {
    pub fn new(
        config: config::Config,
        catalog: catalog::StationCatalog,
        http: Arc<Http>,
        cache: Arc<Cache>,
        manager: Arc<Songbird>,
    ) -> Self {
        Self {
            config,
            catalog,
            http,
            cache,
            manager,
            session: Mutex::new(session::Session::new()),
            current_track: Mutex::new(None),
        }
    }
}

/// TypeMap key storing the shared radio context in serenity's data map.
pub struct RadioKey;

impl TypeMapKey for RadioKey {
    type Value = Arc<Radio>;
}

/// Fetch the shared radio context from a gateway event context.
pub async fn radio(ctx: &serenity::client::Context) -> Arc<Radio> {
    ctx.data
        .read()
        .await
        .get::<RadioKey>()
        .cloned()
        .expect("radio context installed at startup")
}
