//! Track Catalog
//!
//! The catalog resolves a text query to tracks and a track id to a
//! streamable audio resource. HTTP transport lives behind the
//! [`TrackCatalog`] trait; this module owns the wire contract:
//!
//! ```text
//! GET {api_base}/search?query=<text>   -> [{videoId, title, artist, thumbnail}]
//! GET {api_base}/get_audio/{videoId}   -> audio bytes
//! ```
//!
//! [`search_path`] and [`parse_search_response`] are the request and
//! response halves of `/search` for HTTP-backed catalog implementations
//! living outside this crate. [`StaticCatalog`] serves from memory and
//! needs neither.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlayerError, PlayerResult};

/// A searchable, playable track
///
/// Identity is the id. Values are never mutated after they leave the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail: String,
}

impl Track {
    pub fn new(
        video_id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        thumbnail: impl Into<String>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            artist: artist.into(),
            thumbnail: thumbnail.into(),
        }
    }
}

/// Search and audio resolution, usually backed by an HTTP API
pub trait TrackCatalog: Send + Sync {
    /// Resolve a query to tracks. Implementations return `Network` on failure.
    fn search(&self, query: &str) -> PlayerResult<Vec<Track>>;

    /// Fetch the bytes behind an audio URL
    fn fetch_audio(&self, url: &str) -> PlayerResult<Vec<u8>>;

    /// Prefix put in front of every path, empty for same-origin
    fn api_base(&self) -> &str {
        ""
    }

    /// Streamable URL for a track id
    fn audio_url(&self, video_id: &str) -> String {
        audio_path(self.api_base(), video_id)
    }
}

pub fn audio_path(api_base: &str, video_id: &str) -> String {
    format!("{}/get_audio/{}", api_base.trim_end_matches('/'), video_id)
}

pub fn search_path(api_base: &str, query: &str) -> String {
    format!(
        "{}/search?query={}",
        api_base.trim_end_matches('/'),
        encode_query(query)
    )
}

/// The download target is the same resource the player streams
pub fn download_url(catalog: &dyn TrackCatalog, track: &Track) -> String {
    catalog.audio_url(&track.video_id)
}

/// Percent-encode a query component (unreserved marks kept as-is)
fn encode_query(query: &str) -> String {
    let mut encoded = String::with_capacity(query.len());
    for byte in query.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Interpret a `/search` response
///
/// Non-2xx statuses and malformed bodies are both `Network` errors. When
/// the server sent `{"error": "..."}` its message is kept.
pub fn parse_search_response(status: u16, body: &str) -> PlayerResult<Vec<Track>> {
    if !(200..300).contains(&status) {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| "request failed".to_string());
        return Err(PlayerError::Network(format!(
            "search returned HTTP {}: {}",
            status, detail
        )));
    }

    serde_json::from_str(body)
        .map_err(|e| PlayerError::Network(format!("malformed search response: {}", e)))
}

/// Whether a query is worth sending at all
pub fn is_blank_query(query: &str) -> bool {
    query.trim().is_empty()
}

/// In-memory catalog
///
/// Matches queries case-insensitively against title and artist. Used for
/// offline hosts, demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    api_base: String,
    tracks: Vec<Track>,
    audio: HashMap<String, Vec<u8>>,
    offline: bool,
}

impl StaticCatalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            ..Default::default()
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Register the bytes served for a track's audio URL
    pub fn with_audio(mut self, video_id: &str, bytes: Vec<u8>) -> Self {
        let url = audio_path(&self.api_base, video_id);
        self.audio.insert(url, bytes);
        self
    }

    /// Every request fails with a network error
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

impl TrackCatalog for StaticCatalog {
    fn search(&self, query: &str) -> PlayerResult<Vec<Track>> {
        if self.offline {
            return Err(PlayerError::Network("catalog unreachable".into()));
        }

        let needle = query.trim().to_lowercase();
        let results: Vec<Track> = self
            .tracks
            .iter()
            .filter(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t.artist.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();

        debug!("Static search {:?}: {} results", query, results.len());
        Ok(results)
    }

    fn fetch_audio(&self, url: &str) -> PlayerResult<Vec<u8>> {
        if self.offline {
            return Err(PlayerError::Network("catalog unreachable".into()));
        }

        self.audio
            .get(url)
            .cloned()
            .ok_or_else(|| PlayerError::Network(format!("GET {} returned HTTP 404", url)))
    }

    fn api_base(&self) -> &str {
        &self.api_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lofi_catalog() -> StaticCatalog {
        StaticCatalog::new(vec![
            Track::new("abc123", "Lofi Beats to Study", "Chill Cat", "https://img/1.jpg"),
            Track::new("def456", "Rainy Night", "Lofi Girl", "https://img/2.jpg"),
            Track::new("ghi789", "Metal Storm", "Thunder", "https://img/3.jpg"),
        ])
    }

    #[test]
    fn test_track_wire_format() {
        let json = r#"{"videoId":"abc123","title":"T","artist":"A","thumbnail":"http://x"}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.video_id, "abc123");

        let back = serde_json::to_string(&track).unwrap();
        assert!(back.contains("\"videoId\":\"abc123\""));
    }

    #[test]
    fn test_audio_url() {
        let catalog = lofi_catalog();
        assert_eq!(catalog.audio_url("abc123"), "/get_audio/abc123");

        let catalog = catalog.with_api_base("http://localhost:5000/");
        assert_eq!(
            catalog.audio_url("abc123"),
            "http://localhost:5000/get_audio/abc123"
        );
    }

    #[test]
    fn test_search_path_encoding() {
        assert_eq!(search_path("", "lofi"), "/search?query=lofi");
        assert_eq!(
            search_path("", "lo fi & chill"),
            "/search?query=lo%20fi%20%26%20chill"
        );
        assert_eq!(search_path("", "café"), "/search?query=caf%C3%A9");
    }

    #[test]
    fn test_parse_search_ok() {
        let body = r#"[
            {"videoId":"a","title":"One","artist":"X","thumbnail":"t1"},
            {"videoId":"b","title":"Two","artist":"Y","thumbnail":"t2"}
        ]"#;
        let tracks = parse_search_response(200, body).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].video_id, "b");
    }

    #[test]
    fn test_parse_search_http_error() {
        let err = parse_search_response(500, r#"{"error":"quota exceeded"}"#).unwrap_err();
        match err {
            PlayerError::Network(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("quota exceeded"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = parse_search_response(404, "<html>").unwrap_err();
        assert!(matches!(err, PlayerError::Network(_)));
    }

    #[test]
    fn test_parse_search_malformed() {
        let err = parse_search_response(200, "{not json").unwrap_err();
        assert!(matches!(err, PlayerError::Network(_)));
    }

    #[test]
    fn test_static_search() {
        let catalog = lofi_catalog();
        let results = catalog.search("lofi").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].video_id, "abc123");

        assert!(catalog.search("jazz").unwrap().is_empty());
    }

    #[test]
    fn test_static_fetch() {
        let catalog = lofi_catalog().with_audio("abc123", vec![1, 2, 3]);
        let url = catalog.audio_url("abc123");
        assert_eq!(catalog.fetch_audio(&url).unwrap(), vec![1, 2, 3]);
        assert!(catalog.fetch_audio("/get_audio/nope").is_err());
    }

    #[test]
    fn test_offline_catalog() {
        let catalog = lofi_catalog().offline();
        assert!(matches!(catalog.search("lofi"), Err(PlayerError::Network(_))));
    }

    #[test]
    fn test_blank_query() {
        assert!(is_blank_query(""));
        assert!(is_blank_query("   \t"));
        assert!(!is_blank_query(" lofi "));
    }

    #[test]
    fn test_download_url() {
        let catalog = lofi_catalog();
        let track = catalog.tracks()[1].clone();
        assert_eq!(download_url(&catalog, &track), "/get_audio/def456");
    }
}
