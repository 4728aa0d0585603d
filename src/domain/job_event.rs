//! Progress events emitted by job producers.
//!
//! A [`JobEvent`] is forwarded to subscribers exactly as published. The
//! relay only inspects the variant tag, to decide whether a job has reached
//! a terminal state and its cached state can be reclaimed. Fields a variant
//! does not name travel along untouched in its `extra` map.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Number of pipeline stages reported by producers that do not say otherwise.
pub const DEFAULT_TOTAL_STAGES: u32 = 5;

/// Producer fields carried through without interpretation.
pub type EventFields = serde_json::Map<String, Value>;

/// A single progress event for a job.
///
/// Serialized as a flat JSON object with a `type` discriminator, e.g.
/// `{"type":"progress","percent":50.0,"stage":null}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// A pipeline stage changed status.
    StageUpdate {
        /// 1-based stage index.
        stage: u32,
        /// Human-readable stage name.
        name: String,
        /// Stage status (e.g. `"running"`, `"done"`).
        status: String,
        /// Total number of stages in the pipeline.
        total_stages: u32,
        /// Additional producer fields.
        #[serde(flatten)]
        #[schema(ignore)]
        extra: EventFields,
    },

    /// A free-form log line.
    Log {
        /// Log text.
        message: String,
        /// Severity label (e.g. `"info"`, `"warning"`).
        level: String,
        /// Additional producer fields.
        #[serde(flatten)]
        #[schema(ignore)]
        extra: EventFields,
    },

    /// Overall completion percentage.
    Progress {
        /// Percentage in `0.0..=100.0`.
        percent: f64,
        /// Stage the percentage refers to, if any.
        #[serde(default)]
        stage: Option<u32>,
        /// Additional producer fields.
        #[serde(flatten)]
        #[schema(ignore)]
        extra: EventFields,
    },

    /// The job finished successfully.
    Complete {
        /// Where the job's output can be fetched.
        #[serde(alias = "mix_url")]
        locator: String,
        /// Wall-clock duration of the job in seconds.
        #[serde(default)]
        duration: Option<f64>,
        /// Additional producer fields (e.g. `success`).
        #[serde(flatten)]
        #[schema(ignore)]
        extra: EventFields,
    },

    /// The job failed.
    Error {
        /// Failure description.
        message: String,
        /// Additional producer fields.
        #[serde(flatten)]
        #[schema(ignore)]
        extra: EventFields,
    },

    /// The job was paused.
    Paused {
        /// Additional producer fields (e.g. `message`).
        #[serde(flatten)]
        #[schema(ignore)]
        extra: EventFields,
    },

    /// The job was resumed after a pause.
    Resumed {
        /// Additional producer fields.
        #[serde(flatten)]
        #[schema(ignore)]
        extra: EventFields,
    },

    /// The job was cancelled.
    Cancelled {
        /// Additional producer fields.
        #[serde(flatten)]
        #[schema(ignore)]
        extra: EventFields,
    },
}

impl JobEvent {
    /// Builds a `stage_update` event.
    #[must_use]
    pub fn stage_update(
        stage: u32,
        name: impl Into<String>,
        status: impl Into<String>,
        total_stages: u32,
    ) -> Self {
        Self::StageUpdate {
            stage,
            name: name.into(),
            status: status.into(),
            total_stages,
            extra: EventFields::new(),
        }
    }

    /// Builds a `log` event.
    #[must_use]
    pub fn log(message: impl Into<String>, level: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
            level: level.into(),
            extra: EventFields::new(),
        }
    }

    /// Builds a `progress` event.
    #[must_use]
    pub fn progress(percent: f64, stage: Option<u32>) -> Self {
        Self::Progress {
            percent,
            stage,
            extra: EventFields::new(),
        }
    }

    /// Builds a `complete` event.
    #[must_use]
    pub fn complete(locator: impl Into<String>, duration: Option<f64>) -> Self {
        Self::Complete {
            locator: locator.into(),
            duration,
            extra: EventFields::new(),
        }
    }

    /// Builds an `error` event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            extra: EventFields::new(),
        }
    }

    /// Builds a `paused` event.
    #[must_use]
    pub fn paused() -> Self {
        Self::Paused {
            extra: EventFields::new(),
        }
    }

    /// Builds a `resumed` event.
    #[must_use]
    pub fn resumed() -> Self {
        Self::Resumed {
            extra: EventFields::new(),
        }
    }

    /// Builds a `cancelled` event.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::Cancelled {
            extra: EventFields::new(),
        }
    }

    /// Adds a producer field that is forwarded alongside the event.
    ///
    /// Keys the variant already defines, and `type`, are left unchanged.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !self.defines_field(&key) {
            self.extra_mut().insert(key, value.into());
        }
        self
    }

    /// Producer fields this variant does not name.
    #[must_use]
    pub const fn extra(&self) -> &EventFields {
        match self {
            Self::StageUpdate { extra, .. }
            | Self::Log { extra, .. }
            | Self::Progress { extra, .. }
            | Self::Complete { extra, .. }
            | Self::Error { extra, .. }
            | Self::Paused { extra }
            | Self::Resumed { extra }
            | Self::Cancelled { extra } => extra,
        }
    }

    fn extra_mut(&mut self) -> &mut EventFields {
        match self {
            Self::StageUpdate { extra, .. }
            | Self::Log { extra, .. }
            | Self::Progress { extra, .. }
            | Self::Complete { extra, .. }
            | Self::Error { extra, .. }
            | Self::Paused { extra }
            | Self::Resumed { extra }
            | Self::Cancelled { extra } => extra,
        }
    }

    fn defines_field(&self, key: &str) -> bool {
        let named: &[&str] = match self {
            Self::StageUpdate { .. } => &["stage", "name", "status", "total_stages"],
            Self::Log { .. } => &["message", "level"],
            Self::Progress { .. } => &["percent", "stage"],
            Self::Complete { .. } => &["locator", "mix_url", "duration"],
            Self::Error { .. } => &["message"],
            Self::Paused { .. } | Self::Resumed { .. } | Self::Cancelled { .. } => &[],
        };
        key == "type" || named.contains(&key)
    }

    /// Returns the wire discriminator as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::StageUpdate { .. } => "stage_update",
            Self::Log { .. } => "log",
            Self::Progress { .. } => "progress",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
            Self::Paused { .. } => "paused",
            Self::Resumed { .. } => "resumed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Returns `true` for `complete`, `error` and `cancelled`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete { .. } | Self::Error { .. } | Self::Cancelled { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn stage_update_wire_shape() {
        let event = JobEvent::stage_update(1, "download", "running", DEFAULT_TOTAL_STAGES);
        let value = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "stage_update",
                "stage": 1,
                "name": "download",
                "status": "running",
                "total_stages": 5
            })
        );
    }

    #[test]
    fn unit_variants_carry_only_the_tag() {
        let json = serde_json::to_string(&JobEvent::paused()).unwrap_or_default();
        assert_eq!(json, r#"{"type":"paused"}"#);
    }

    #[test]
    fn progress_stage_defaults_to_none() {
        let Ok(event) = serde_json::from_str::<JobEvent>(r#"{"type":"progress","percent":50}"#)
        else {
            panic!("progress without stage should parse");
        };
        assert_eq!(event, JobEvent::progress(50.0, None));
    }

    #[test]
    fn complete_accepts_legacy_mix_url_field() {
        let Ok(event) =
            serde_json::from_str::<JobEvent>(r#"{"type":"complete","mix_url":"http://x/y.mp3"}"#)
        else {
            panic!("legacy complete payload should parse");
        };
        assert_eq!(event, JobEvent::complete("http://x/y.mp3", None));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = serde_json::from_str::<JobEvent>(r#"{"type":"heartbeat"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn terminal_kinds() {
        assert!(JobEvent::complete("u", Some(1.5)).is_terminal());
        assert!(JobEvent::error("boom").is_terminal());
        assert!(JobEvent::cancelled().is_terminal());
        assert!(!JobEvent::paused().is_terminal());
        assert!(!JobEvent::resumed().is_terminal());
        assert!(!JobEvent::log("hi", "info").is_terminal());
        assert!(!JobEvent::progress(10.0, Some(2)).is_terminal());
    }

    #[test]
    fn event_type_str_matches_wire_tag() {
        let events = [
            JobEvent::stage_update(2, "analyze", "done", 5),
            JobEvent::log("m", "info"),
            JobEvent::progress(1.0, None),
            JobEvent::complete("u", None),
            JobEvent::error("e"),
            JobEvent::paused(),
            JobEvent::resumed(),
            JobEvent::cancelled(),
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap_or_default();
            let tag = value.get("type").and_then(serde_json::Value::as_str);
            assert_eq!(tag, Some(event.event_type_str()));
        }
    }

    #[test]
    fn unmodelled_fields_are_forwarded() {
        let input = serde_json::json!({"type": "paused", "message": "Mix generation paused"});
        let Ok(event) = serde_json::from_value::<JobEvent>(input.clone()) else {
            panic!("paused with message should parse");
        };
        assert_eq!(
            event.extra().get("message"),
            Some(&serde_json::json!("Mix generation paused"))
        );
        assert_eq!(serde_json::to_value(&event).unwrap_or_default(), input);
    }

    #[test]
    fn complete_keeps_success_flag() {
        let input = serde_json::json!({
            "type": "complete",
            "locator": "http://x/y.mp3",
            "duration": null,
            "success": true
        });
        let Ok(event) = serde_json::from_value::<JobEvent>(input.clone()) else {
            panic!("complete with success should parse");
        };
        assert!(event.is_terminal());
        assert_eq!(serde_json::to_value(&event).unwrap_or_default(), input);
    }

    #[test]
    fn error_keeps_nested_payload() {
        let input = serde_json::json!({
            "type": "error",
            "message": "boom",
            "success": false,
            "context": {"stage": 3, "retries": [1, 2]}
        });
        let Ok(event) = serde_json::from_value::<JobEvent>(input.clone()) else {
            panic!("error with extra payload should parse");
        };
        assert_eq!(serde_json::to_value(&event).unwrap_or_default(), input);
    }

    #[test]
    fn with_field_adds_only_unnamed_keys() {
        let event = JobEvent::complete("u", None)
            .with_field("success", true)
            .with_field("locator", "other")
            .with_field("type", "error");
        assert_eq!(
            serde_json::to_value(&event).unwrap_or_default(),
            serde_json::json!({
                "type": "complete",
                "locator": "u",
                "duration": null,
                "success": true
            })
        );
    }
}
