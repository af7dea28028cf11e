//! Static station catalog and play-input resolution.

use crate::error::ConfigError;
use serde::Deserialize;

/// Discord caps select menus at 25 options; the catalog refuses to exceed it.
pub const MAX_STATIONS: usize = 25;

/// Display label used when the input is played as a raw URL instead of a
/// catalog key.
pub const DIRECT_URL_LABEL: &str = "URL Directa";

/// One selectable named stream. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct StationEntry {
    pub key: String,
    pub display_name: String,
    pub stream_url: String,
}

/// What a play input resolved to: a stream URL plus the label the panel
/// shows for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStation {
    pub display_name: String,
    pub url: String,
}

/// Ordered set of selectable stations. Keys are unique case-insensitively.
#[derive(Debug, Clone)]
pub struct StationCatalog {
    entries: Vec<StationEntry>,
}

/// On-disk catalog file model.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    stations: Vec<CatalogFileEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogFileEntry {
    key: String,
    name: String,
    url: String,
}

impl StationCatalog {
    /// The built-in station set used when no override file is configured.
    pub fn builtin() -> Self {
        let entries = [
            ("classic_rock", "Classic Rock FM", "https://stream.radiotime.com/classic-rock.mp3"),
            ("rock_and_pop", "Rock & Pop", "https://redirector.dps.live/rockandpop/aac/icecast.audio"),
            ("futuro", "Radio Futuro", "https://unlimited4-cl.dps.live/futuro/aac/icecast.audio"),
            ("sonar", "Sonar FM", "https://unlimited6-cl.dps.live/sonarfm/aac/icecast.audio"),
            ("jazz_fm", "Jazz FM", "https://jazzfm.cdnstream1.com/2736_128.mp3"),
            ("lofi", "Lofi Beats", "https://streams.ilovemusic.de/iloveradio17.mp3"),
            ("groove_salad", "Groove Salad", "https://ice1.somafm.com/groovesalad-128-mp3"),
            ("drone_zone", "Drone Zone", "https://ice1.somafm.com/dronezone-128-mp3"),
        ];
        let entries = entries
            .into_iter()
            .map(|(key, name, url)| StationEntry {
                key: key.to_string(),
                display_name: name.to_string(),
                stream_url: url.to_string(),
            })
            .collect();
        Self { entries }
    }

    /// Load the catalog: the override file when configured, otherwise the
    /// built-in set.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Catalog {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
                Self::from_toml_str(&raw).map_err(|e| ConfigError::Catalog {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            }
            None => Ok(Self::builtin()),
        }
    }

    /// Parse a catalog from its TOML representation, enforcing the size cap
    /// and key uniqueness.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile =
            toml::from_str(raw).map_err(|e| ConfigError::InvalidCatalog(e.to_string()))?;

        let mut entries = Vec::with_capacity(file.stations.len());
        for station in file.stations {
            let key = station.key.trim().to_lowercase();
            if key.is_empty() || station.url.trim().is_empty() {
                return Err(ConfigError::InvalidCatalog(format!(
                    "station `{}` needs a non-empty key and url",
                    station.name
                )));
            }
            entries.push(StationEntry {
                key,
                display_name: station.name,
                stream_url: station.url,
            });
        }
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<StationEntry>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::InvalidCatalog("no stations defined".into()));
        }
        if entries.len() > MAX_STATIONS {
            return Err(ConfigError::InvalidCatalog(format!(
                "{} stations exceed the select-menu cap of {MAX_STATIONS}",
                entries.len()
            )));
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|prior| prior.key == entry.key) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "duplicate station key `{}`",
                    entry.key
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Case-insensitive key lookup.
    pub fn get(&self, key: &str) -> Option<&StationEntry> {
        let key = key.trim().to_lowercase();
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// All entries, in menu order.
    pub fn entries(&self) -> &[StationEntry] {
        &self.entries
    }

    /// Resolve raw play input to a stream URL and display label.
    ///
    /// A catalog key wins; anything else is treated literally as a URL with
    /// enclosing `<>` delimiters stripped (Discord's no-preview convention).
    /// Returns `None` when nothing playable remains.
    pub fn resolve(&self, input: &str) -> Option<ResolvedStation> {
        if let Some(entry) = self.get(input) {
            return Some(ResolvedStation {
                display_name: entry.display_name.clone(),
                url: entry.stream_url.clone(),
            });
        }

        let url = input.trim().trim_matches(|c| c == '<' || c == '>').trim();
        if url.is_empty() {
            return None;
        }
        Some(ResolvedStation {
            display_name: DIRECT_URL_LABEL.to_string(),
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_catalog_key_to_stored_url_and_name() {
        let catalog = StationCatalog::builtin();
        let resolved = catalog.resolve("jazz_fm").unwrap();
        assert_eq!(resolved.display_name, "Jazz FM");
        assert_eq!(resolved.url, catalog.get("jazz_fm").unwrap().stream_url);
    }

    #[test]
    fn key_lookup_is_case_insensitive_and_trimmed() {
        let catalog = StationCatalog::builtin();
        let resolved = catalog.resolve("  Jazz_FM ").unwrap();
        assert_eq!(resolved.display_name, "Jazz FM");
    }

    #[test]
    fn unknown_input_becomes_direct_url_with_generic_label() {
        let catalog = StationCatalog::builtin();
        let resolved = catalog.resolve("https://stream.example/alt").unwrap();
        assert_eq!(resolved.display_name, DIRECT_URL_LABEL);
        assert_eq!(resolved.url, "https://stream.example/alt");
    }

    #[test]
    fn direct_url_strips_preview_suppressing_delimiters() {
        let catalog = StationCatalog::builtin();
        let resolved = catalog.resolve("<https://stream.example/alt>").unwrap();
        assert_eq!(resolved.url, "https://stream.example/alt");
    }

    #[test]
    fn empty_input_resolves_to_nothing() {
        let catalog = StationCatalog::builtin();
        assert!(catalog.resolve("   ").is_none());
        assert!(catalog.resolve("<>").is_none());
    }

    #[test]
    fn toml_catalog_parses() {
        let catalog = StationCatalog::from_toml_str(
            r#"
            [[stations]]
            key = "Alt_Nation"
            name = "Alt Nation"
            url = "https://stream.example/alt"
            "#,
        )
        .unwrap();
        assert_eq!(catalog.entries().len(), 1);
        // Keys are normalised to lowercase at load time.
        assert!(catalog.get("alt_nation").is_some());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = StationCatalog::from_toml_str(
            r#"
            [[stations]]
            key = "a"
            name = "First"
            url = "https://stream.example/1"

            [[stations]]
            key = "A"
            name = "Second"
            url = "https://stream.example/2"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCatalog(_)));
    }

    #[test]
    fn oversized_catalog_is_rejected() {
        let mut raw = String::new();
        for i in 0..(MAX_STATIONS + 1) {
            raw.push_str(&format!(
                "[[stations]]\nkey = \"s{i}\"\nname = \"Station {i}\"\nurl = \"https://stream.example/{i}\"\n\n"
            ));
        }
        let err = StationCatalog::from_toml_str(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCatalog(_)));
    }

    #[test]
    fn builtin_catalog_fits_the_menu() {
        assert!(StationCatalog::builtin().entries().len() <= MAX_STATIONS);
    }
}
