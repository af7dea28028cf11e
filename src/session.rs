//! The single mutable session record behind the control panel.
//!
//! One instance exists per process, owned by [`crate::Radio`] and shared
//! behind a mutex. Button clicks, text commands, gateway voice-state events
//! and decoder completion callbacks all mutate it, then ask the panel
//! renderer to reconcile the display.

use serenity::model::id::{ChannelId, MessageId};

/// Panel label when nothing is playing.
pub const NO_STATION_LABEL: &str = "Ninguna";

/// Panel label when the bot holds no voice connection.
pub const DISCONNECTED_LABEL: &str = "Desconectado 🚫";

/// What the session believes is playing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StationStatus {
    /// Nothing playing.
    #[default]
    None,
    /// A stream is (believed to be) playing, labelled for the panel.
    Playing(String),
    /// The last attempt for this station failed or its stream errored out.
    Errored(String),
}

impl StationStatus {
    /// Human-readable panel label.
    pub fn label(&self) -> String {
        match self {
            StationStatus::None => NO_STATION_LABEL.to_string(),
            StationStatus::Playing(name) => name.clone(),
            StationStatus::Errored(name) => format!("Error en {name}"),
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, StationStatus::Playing(_))
    }
}

/// Weak reference to the one rendered control message. Losing it means
/// "not found", not ownership loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelMessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Result of applying a playback completion event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The event belonged to the current playback attempt and was applied.
    Applied { errored: bool },
    /// The event came from a superseded attempt and changed nothing.
    Superseded,
}

/// The session record. All fields reflect the panel's authoritative state.
#[derive(Debug, Default)]
pub struct Session {
    /// What is believed to be playing.
    pub station: StationStatus,
    /// Voice channel the bot occupies; `None` means disconnected.
    pub voice_channel: Option<String>,
    /// Most recent operator-facing failure. Transient: overwritten by every
    /// render call, cleared when a render passes no error.
    pub last_error: Option<String>,
    /// Reference to the rendered control message, if one is tracked.
    pub panel_message: Option<PanelMessageRef>,
    /// Tag of the current playback attempt. Completion events carry the tag
    /// they were started with and are ignored on mismatch.
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-assert the coupling invariant: no voice connection means nothing
    /// can be playing. Run at the start of every render, regardless of what
    /// the triggering handler left behind.
    pub fn normalize(&mut self) {
        if self.voice_channel.is_none() {
            self.station = StationStatus::None;
        }
    }

    /// Current playback generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record a new playback attempt and return its generation tag.
    /// The previous attempt's completion events become stale immediately.
    pub fn begin_playback(&mut self, station_name: &str) -> u64 {
        self.generation += 1;
        self.station = StationStatus::Playing(station_name.to_string());
        self.generation
    }

    /// Invalidate the current playback attempt without starting a new one.
    /// Called when a stream is stopped on purpose so its completion event,
    /// whenever it lands, reads as stale.
    pub fn supersede(&mut self) {
        self.generation += 1;
    }

    /// Record that the decoder for `station_name` could not be started.
    pub fn mark_playback_failed(&mut self, station_name: &str) {
        self.station = StationStatus::Errored(station_name.to_string());
    }

    /// Apply a playback completion event tagged with `generation`.
    ///
    /// A stale tag means a newer `begin_playback` already owns the station
    /// field and the event must not touch it. A matching clean end resets
    /// the station to none; a matching error records the error sentinel.
    pub fn finish_playback(
        &mut self,
        generation: u64,
        station_name: &str,
        error: Option<&str>,
    ) -> CompletionOutcome {
        if generation != self.generation {
            return CompletionOutcome::Superseded;
        }
        match error {
            Some(_) => {
                self.station = StationStatus::Errored(station_name.to_string());
                CompletionOutcome::Applied { errored: true }
            }
            None => {
                self.station = StationStatus::None;
                CompletionOutcome::Applied { errored: false }
            }
        }
    }

    /// Record a voice disconnect: connection and station reset together,
    /// and any in-flight playback attempt is invalidated.
    pub fn mark_disconnected(&mut self) {
        self.voice_channel = None;
        self.station = StationStatus::None;
        self.supersede();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resets_station_when_disconnected() {
        let mut session = Session::new();
        session.begin_playback("Jazz FM");
        session.voice_channel = None;
        session.normalize();
        assert_eq!(session.station, StationStatus::None);
        assert_eq!(session.station.label(), NO_STATION_LABEL);
    }

    #[test]
    fn normalize_keeps_station_while_connected() {
        let mut session = Session::new();
        session.voice_channel = Some("Música".to_string());
        session.begin_playback("Jazz FM");
        session.normalize();
        assert_eq!(session.station, StationStatus::Playing("Jazz FM".into()));
    }

    #[test]
    fn generations_increase_per_attempt() {
        let mut session = Session::new();
        let first = session.begin_playback("A");
        let second = session.begin_playback("B");
        assert!(second > first);
        assert_eq!(session.generation(), second);
    }

    #[test]
    fn stale_completion_does_not_clobber_newer_station() {
        let mut session = Session::new();
        session.voice_channel = Some("Música".to_string());
        let old = session.begin_playback("Classic Rock FM");
        session.begin_playback("Jazz FM");

        // The superseded stream's callback fires late, clean exit.
        let outcome = session.finish_playback(old, "Classic Rock FM", None);
        assert_eq!(outcome, CompletionOutcome::Superseded);
        assert_eq!(session.station, StationStatus::Playing("Jazz FM".into()));
    }

    #[test]
    fn stale_errored_completion_is_also_ignored() {
        let mut session = Session::new();
        session.voice_channel = Some("Música".to_string());
        let old = session.begin_playback("Classic Rock FM");
        session.begin_playback("Jazz FM");

        let outcome = session.finish_playback(old, "Classic Rock FM", Some("io error"));
        assert_eq!(outcome, CompletionOutcome::Superseded);
        assert_eq!(session.station, StationStatus::Playing("Jazz FM".into()));
    }

    #[test]
    fn matching_clean_end_resets_to_none() {
        let mut session = Session::new();
        session.voice_channel = Some("Música".to_string());
        let generation = session.begin_playback("Jazz FM");

        let outcome = session.finish_playback(generation, "Jazz FM", None);
        assert_eq!(outcome, CompletionOutcome::Applied { errored: false });
        assert_eq!(session.station, StationStatus::None);
    }

    #[test]
    fn matching_errored_end_records_error_sentinel() {
        let mut session = Session::new();
        session.voice_channel = Some("Música".to_string());
        let generation = session.begin_playback("Jazz FM");

        let outcome = session.finish_playback(generation, "Jazz FM", Some("stream dropped"));
        assert_eq!(outcome, CompletionOutcome::Applied { errored: true });
        assert_eq!(session.station, StationStatus::Errored("Jazz FM".into()));
        assert_eq!(session.station.label(), "Error en Jazz FM");
    }

    #[test]
    fn superseded_attempt_rejects_its_completion() {
        let mut session = Session::new();
        session.voice_channel = Some("Música".to_string());
        let generation = session.begin_playback("Jazz FM");

        // The controller stops the stream on purpose before starting the
        // next one; the stop's completion event must read as stale.
        session.supersede();
        let outcome = session.finish_playback(generation, "Jazz FM", None);
        assert_eq!(outcome, CompletionOutcome::Superseded);
        assert_eq!(session.station, StationStatus::Playing("Jazz FM".into()));
    }

    #[test]
    fn disconnect_couples_connection_and_station() {
        let mut session = Session::new();
        session.voice_channel = Some("Música".to_string());
        session.begin_playback("Jazz FM");
        session.mark_disconnected();
        assert!(session.voice_channel.is_none());
        assert_eq!(session.station, StationStatus::None);
    }
}
