//! Test configuration helpers: mock lookup services and downloaders wired to them

use lossless_dl::{Config, DownloadPreferences, LosslessDownloader, ReferenceId, TrackIdentity};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::FakeBackends;

/// Track used throughout the integration tests
pub const TRACK_ID: &str = "4cOdK2wGLETKBW3PvgPWqT";

/// ISRC the mocked Deezer API reports for [`TRACK_ID`]
pub const TRACK_ISRC: &str = "GBAYE0601498";

/// Deezer track the mocked song.link maps [`TRACK_ID`] to
pub const DEEZER_TRACK: &str = "3135556";

/// The test track's identity
pub fn track_identity() -> TrackIdentity {
    let mut identity = TrackIdentity::new(
        ReferenceId::parse(TRACK_ID).unwrap(),
        "Here Comes the Sun",
        "The Beatles",
    );
    identity.album = "Abbey Road".to_string();
    identity.album_artist = "The Beatles".to_string();
    identity.release_date = "1969-09-26".to_string();
    identity.disc_number = 1;
    identity.track_number = 7;
    identity
}

/// Config pointing every lookup service at `server` and every path into `temp_dir`
pub fn test_config(server: &MockServer, temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.download.output_dir = temp_dir.path().join("music");
    config.persistence.database_path = temp_dir.path().join("state").join("history.db");
    config.identity.songlink_url = server.uri();
    config.identity.deezer_url = server.uri();
    config.identity.timeout = Duration::from_secs(5);
    config.lyrics.lrclib_url = server.uri();
    config.lyrics.timeout = Duration::from_secs(5);
    config.side_effects.drain_timeout = Duration::from_secs(5);
    config
}

/// Preferences seeded from `config`, served by `service`
pub fn preferences(config: &Config, service: &str) -> DownloadPreferences {
    DownloadPreferences {
        service: service.to_string(),
        ..DownloadPreferences::from_config(config)
    }
}

/// Create a downloader against `server` with fresh fake back-ends
pub async fn create_downloader(
    server: &MockServer,
    temp_dir: &TempDir,
) -> (LosslessDownloader, FakeBackends, Config) {
    create_downloader_with(server, temp_dir, FakeBackends::new()).await
}

/// Create a downloader against `server` using the given fakes
pub async fn create_downloader_with(
    server: &MockServer,
    temp_dir: &TempDir,
    fakes: FakeBackends,
) -> (LosslessDownloader, FakeBackends, Config) {
    let config = test_config(server, temp_dir);
    let downloader = LosslessDownloader::new(config.clone(), fakes.backends())
        .await
        .unwrap();
    (downloader, fakes, config)
}

/// Mount song.link and Deezer responses resolving [`TRACK_ID`] to [`TRACK_ISRC`]
pub async fn mount_isrc_lookup(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1-alpha.1/links"))
        .and(query_param(
            "url",
            format!("https://open.spotify.com/track/{TRACK_ID}"),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entityUniqueId": format!("SPOTIFY_SONG::{TRACK_ID}"),
            "linksByPlatform": {
                "deezer": { "url": format!("https://www.deezer.com/track/{DEEZER_TRACK}") },
                "spotify": { "url": format!("https://open.spotify.com/track/{TRACK_ID}") }
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/track/{DEEZER_TRACK}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3135556,
            "title": "Here Comes the Sun",
            "isrc": TRACK_ISRC
        })))
        .mount(server)
        .await;
}

/// Mount an LRCLIB exact match for the test track
pub async fn mount_lyrics(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/get"))
        .and(query_param("track_name", "Here Comes the Sun"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "trackName": "Here Comes the Sun",
            "artistName": "The Beatles",
            "instrumental": false,
            "plainLyrics": "Here comes the sun\nAnd I say it's all right",
            "syncedLyrics": "[00:07.40] Here comes the sun\n[00:10.80] And I say it's all right"
        })))
        .mount(server)
        .await;
}
