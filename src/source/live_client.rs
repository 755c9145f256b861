//! HTTP adapter for the game client's live data endpoint.
//!
//! The endpoint only answers while a game is loaded. A refused connection
//! or a 404 therefore means "not in a game", not a transport fault.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::trace;

use crate::error::SourceError;

use super::objectives::ObjectiveClock;
use super::{GameEvent, GameSnapshot, LiveDataSource, PollResult};

/// Largest payload accepted from the endpoint.
const MAX_PAYLOAD_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllGameData {
    game_data: GameData,
    #[serde(default)]
    events: EventList,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameData {
    game_time: f64,
}

#[derive(Debug, Default, Deserialize)]
struct EventList {
    #[serde(rename = "Events", default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "EventID", default)]
    id: u64,
    #[serde(rename = "EventName")]
    name: String,
    #[serde(rename = "EventTime", default)]
    time: f64,
}

/// Polls the live client data endpoint over HTTPS.
#[derive(Debug, Clone)]
pub struct LiveClientSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    objectives: ObjectiveClock,
}

impl LiveClientSource {
    /// Creates a source for `url`.
    ///
    /// The game client serves a self-signed certificate, hence
    /// `accept_invalid_certs`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Transport` if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        accept_invalid_certs: bool,
        timeout: Duration,
        objectives: ObjectiveClock,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
            objectives,
        })
    }

    fn classify(&self, err: &reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else if err.is_connect() {
            SourceError::NotInGame
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl LiveDataSource for LiveClientSource {
    async fn poll(&self) -> PollResult {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotInGame);
        }
        if !status.is_success() {
            return Err(SourceError::Transport(format!("HTTP {}", status.as_u16())));
        }

        let body = response.bytes().await.map_err(|e| self.classify(&e))?;
        trace!(bytes = body.len(), "live client payload received");
        parse_payload(&body, &self.objectives)
    }
}

/// Maps a raw `allgamedata` payload to a snapshot.
///
/// # Errors
///
/// Returns `SourceError::InvalidPayload` for oversized or malformed JSON.
pub fn parse_payload(body: &[u8], objectives: &ObjectiveClock) -> PollResult {
    if body.len() > MAX_PAYLOAD_SIZE {
        return Err(SourceError::InvalidPayload(format!(
            "payload exceeds {MAX_PAYLOAD_SIZE} bytes"
        )));
    }
    let data: AllGameData =
        serde_json::from_slice(body).map_err(|e| SourceError::InvalidPayload(e.to_string()))?;

    let game_time = data.game_data.game_time;
    if !game_time.is_finite() || game_time < 0.0 {
        return Err(SourceError::InvalidPayload(format!(
            "invalid gameTime {game_time}"
        )));
    }

    let events: Vec<GameEvent> = data
        .events
        .events
        .into_iter()
        .map(|e| GameEvent {
            name: e.name,
            time: e.time,
            id: e.id,
        })
        .collect();

    let started = game_time > 0.0 || events.iter().any(|e| e.name == "GameStart");
    let ended = events.iter().any(|e| e.name == "GameEnd");
    let objectives = objectives.timers(game_time, &events);

    Ok(GameSnapshot {
        game_time,
        started,
        ended,
        events,
        objectives,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::objectives::ObjectiveSpec;

    const PAYLOAD: &str = r#"{
        "activePlayer": {"summonerName": "someone"},
        "allPlayers": [],
        "events": {"Events": [
            {"EventID": 0, "EventName": "GameStart", "EventTime": 0.02},
            {"EventID": 1, "EventName": "DragonKill", "EventTime": 410.5, "KillerName": "x"}
        ]},
        "gameData": {"gameMode": "CLASSIC", "gameTime": 455.25, "mapName": "Map11"}
    }"#;

    #[test]
    fn test_parse_full_payload() {
        let clock = ObjectiveClock::new(vec![ObjectiveSpec {
            name: "dragon".to_string(),
            kill_event: "DragonKill".to_string(),
            first_spawn: 300,
            respawn: 300,
        }]);
        let snap = parse_payload(PAYLOAD.as_bytes(), &clock).unwrap();
        assert!(snap.started);
        assert!(!snap.ended);
        assert!((snap.game_time - 455.25).abs() < f64::EPSILON);
        assert_eq!(snap.events.len(), 2);
        assert_eq!(snap.events[1].id, 1);
        assert_eq!(snap.objectives[0].occurrence, 1);
    }

    #[test]
    fn test_loading_screen_not_started() {
        let body = br#"{"gameData": {"gameTime": 0.0}}"#;
        let snap = parse_payload(body, &ObjectiveClock::default()).unwrap();
        assert!(!snap.started);
        assert!(snap.events.is_empty());
    }

    #[test]
    fn test_game_start_event_marks_started() {
        let body = br#"{"gameData": {"gameTime": 0.0},
            "events": {"Events": [{"EventID": 0, "EventName": "GameStart", "EventTime": 0.0}]}}"#;
        assert!(parse_payload(body, &ObjectiveClock::default()).unwrap().started);
    }

    #[test]
    fn test_game_end_event_marks_ended() {
        let body = br#"{"gameData": {"gameTime": 1800.0},
            "events": {"Events": [{"EventID": 40, "EventName": "GameEnd", "EventTime": 1799.0}]}}"#;
        assert!(parse_payload(body, &ObjectiveClock::default()).unwrap().ended);
    }

    #[test]
    fn test_malformed_payload() {
        let err = parse_payload(b"<html>", &ObjectiveClock::default()).unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload(_)));

        let err = parse_payload(br#"{"events": {}}"#, &ObjectiveClock::default()).unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload(_)));
    }

    #[test]
    fn test_negative_game_time_rejected() {
        let body = br#"{"gameData": {"gameTime": -3.0}}"#;
        assert!(parse_payload(body, &ObjectiveClock::default()).is_err());
    }

    #[tokio::test]
    async fn test_refused_connection_is_not_in_game() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let source = LiveClientSource::new(
            format!("http://127.0.0.1:{port}/liveclientdata/allgamedata"),
            true,
            Duration::from_secs(2),
            ObjectiveClock::default(),
        )
        .unwrap();
        assert_eq!(source.poll().await, Err(SourceError::NotInGame));
    }
}
