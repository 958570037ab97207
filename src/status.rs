//! One round of status inquiry against the heartbeat and live-status endpoints.
//!
//! Both responses are decoded into partial records: every field may be absent
//! on its own, and a leaf with an unexpected shape decodes as `None` instead of
//! failing the surrounding document.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use crate::client::LiveApi;
use crate::resolve::Credentials;

/// Interpretation of a single poll round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSignal {
    Online,
    /// Not broadcasting yet, with the announced start time when one is known.
    NotYetOnline(Option<DateTime<Utc>>),
    /// The heartbeat could not be obtained or carried no status phrase.
    Indeterminate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRound {
    pub signal: StatusSignal,
    /// Human-readable status phrase from the heartbeat, if any.
    pub reason: Option<String>,
}

/// Decoded heartbeat payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Heartbeat {
    pub date_text: Option<String>,
}

impl Heartbeat {
    pub fn from_value(value: &Value) -> Self {
        let metadata = UpdatedMetadata::deserialize(value).unwrap_or_default();
        // The last action carrying a date text wins.
        let date_text = metadata
            .actions
            .unwrap_or_default()
            .into_iter()
            .rev()
            .find_map(|action| action.update_date_text_action?.date_text?.simple_text);
        Self { date_text }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveStatusCode {
    Ok,
    Offline,
    Other(String),
}

impl From<&str> for LiveStatusCode {
    fn from(status: &str) -> Self {
        match status {
            "OK" => LiveStatusCode::Ok,
            "LIVE_STREAM_OFFLINE" => LiveStatusCode::Offline,
            other => LiveStatusCode::Other(other.to_string()),
        }
    }
}

/// Decoded live-status payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveStatus {
    pub code: Option<LiveStatusCode>,
    /// Only reported while the stream is offline.
    pub scheduled_start: Option<DateTime<Utc>>,
}

impl LiveStatus {
    pub fn from_value(value: &Value) -> Self {
        let Some(status) = PlayerResponse::deserialize(value)
            .unwrap_or_default()
            .playability_status
        else {
            return Self::default();
        };

        let code = status.status.as_deref().map(LiveStatusCode::from);
        let scheduled_start = match code {
            Some(LiveStatusCode::Offline) => status
                .live_streamability
                .and_then(|s| s.live_streamability_renderer)
                .and_then(|r| r.offline_slate)
                .and_then(|s| s.live_stream_offline_slate_renderer)
                .and_then(|r| r.scheduled_start_time)
                .and_then(|t| t.to_datetime()),
            _ => None,
        };

        Self {
            code,
            scheduled_start,
        }
    }
}

/// Whether a heartbeat phrase announces a running broadcast.
pub fn is_live_phrase(phrase: &str) -> bool {
    let phrase = phrase.to_lowercase();
    phrase.contains("streaming") || phrase.contains("in progress")
}

/// Combines the heartbeat phrase and the optional schedule into a signal.
///
/// Only the phrase decides online versus offline.
pub fn classify(phrase: Option<&str>, scheduled_start: Option<DateTime<Utc>>) -> StatusSignal {
    match phrase {
        None => StatusSignal::Indeterminate,
        Some(phrase) if is_live_phrase(phrase) => StatusSignal::Online,
        Some(_) => StatusSignal::NotYetOnline(scheduled_start),
    }
}

/// Issues both queries once. Each is best-effort and independent of the other.
pub async fn poll<A: LiveApi + ?Sized>(api: &A, credentials: &Credentials) -> PollRound {
    let heartbeat = match api.heartbeat(credentials).await {
        Ok(heartbeat) => Some(heartbeat),
        Err(e) => {
            warn!("Heartbeat query failed: {e}");
            None
        }
    };
    let live_status = match api.live_status(credentials).await {
        Ok(status) => Some(status),
        Err(e) => {
            debug!("Live status query failed: {e}");
            None
        }
    };

    let reason = heartbeat.and_then(|h| h.date_text);
    let scheduled_start = live_status.and_then(|s| s.scheduled_start);
    if let Some(start) = scheduled_start {
        debug!("Stream scheduled to start at {start}");
    }

    PollRound {
        signal: classify(reason.as_deref(), scheduled_start),
        reason,
    }
}

/// Decodes a leaf, turning any shape mismatch into `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UpdatedMetadata {
    #[serde(deserialize_with = "lenient")]
    actions: Option<Vec<MetadataAction>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MetadataAction {
    #[serde(deserialize_with = "lenient")]
    update_date_text_action: Option<UpdateDateTextAction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UpdateDateTextAction {
    #[serde(deserialize_with = "lenient")]
    date_text: Option<SimpleText>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimpleText {
    #[serde(deserialize_with = "lenient")]
    simple_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlayerResponse {
    #[serde(deserialize_with = "lenient")]
    playability_status: Option<PlayabilityStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlayabilityStatus {
    #[serde(deserialize_with = "lenient")]
    status: Option<String>,
    #[serde(deserialize_with = "lenient")]
    live_streamability: Option<LiveStreamability>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LiveStreamability {
    #[serde(deserialize_with = "lenient")]
    live_streamability_renderer: Option<LiveStreamabilityRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LiveStreamabilityRenderer {
    #[serde(deserialize_with = "lenient")]
    offline_slate: Option<OfflineSlate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OfflineSlate {
    #[serde(deserialize_with = "lenient")]
    live_stream_offline_slate_renderer: Option<OfflineSlateRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OfflineSlateRenderer {
    #[serde(deserialize_with = "lenient")]
    scheduled_start_time: Option<UnixTimestamp>,
}

/// Unix seconds, sent as a string but tolerated as a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UnixTimestamp {
    Number(i64),
    Text(String),
}

impl UnixTimestamp {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = match self {
            UnixTimestamp::Number(secs) => *secs,
            UnixTimestamp::Text(text) => text.trim().parse().ok()?,
        };
        DateTime::from_timestamp(secs, 0)
    }
}
