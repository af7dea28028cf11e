//! Playback controller: validate the caller, stop the previous stream,
//! resolve the input and hand a decoder process to the voice driver.
//!
//! The decoder is an external `ffmpeg` invocation treated as an opaque
//! "play this URL" black box. Reconnect-on-drop options keep long-lived
//! internet radio streams alive across transient network failures; that is
//! a configuration contract with ffmpeg, not logic here.

use crate::Radio;
use crate::catalog::ResolvedStation;
use crate::error::PlaybackError;
use crate::panel;
use crate::session::CompletionOutcome;
use crate::voice::voice_channel_of;
use serenity::async_trait;
use serenity::model::id::{GuildId, UserId};
use songbird::input::{ChildContainer, Input};
use songbird::tracks::PlayMode;
use songbird::{Event, EventContext, TrackEvent};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

/// Grace interval between stopping a stream and starting the next one, so
/// the decoder finishes tearing down before its replacement starts.
const DECODER_SETTLE: Duration = Duration::from_millis(500);

/// Play a station or direct URL into the guild's voice connection.
///
/// Preconditions are checked in order and the first failure wins: the bot
/// must hold a connected voice session, and the caller must share its
/// channel. The caller-facing adapter is responsible for reporting the
/// returned error and re-rendering the panel with it.
pub async fn play_station(
    radio: &Arc<Radio>,
    guild_id: GuildId,
    caller: UserId,
    input: &str,
) -> Result<ResolvedStation, PlaybackError> {
    let call = radio
        .manager
        .get(guild_id)
        .ok_or(PlaybackError::NotConnected)?;
    let bot_channel = call
        .lock()
        .await
        .current_channel()
        .ok_or(PlaybackError::NotConnected)?;

    let caller_channel = voice_channel_of(&radio.cache, guild_id, caller);
    if caller_channel.map(|c| c.get()) != Some(bot_channel.0.get()) {
        return Err(PlaybackError::WrongChannel(bot_channel.0.get()));
    }

    // Stop any in-flight stream first and give the decoder a moment to tear
    // down, so two processes never push audio at once. Superseding the
    // session tag up front means the stopped stream's completion event can
    // never clobber what comes next.
    let previous = radio.current_track.lock().await.take();
    if let Some(track) = previous {
        radio.session.lock().await.supersede();
        let _ = track.stop();
        tokio::time::sleep(DECODER_SETTLE).await;
    }

    let resolved = radio
        .catalog
        .resolve(input)
        .ok_or_else(|| PlaybackError::NoUrlResolved {
            input: input.to_string(),
        })?;

    tracing::info!(station = %resolved.display_name, url = %resolved.url, "starting decoder");
    let child = match spawn_decoder(&resolved.url) {
        Ok(child) => child,
        Err(err) => {
            tracing::error!(station = %resolved.display_name, error = %err, "decoder failed to start");
            radio
                .session
                .lock()
                .await
                .mark_playback_failed(&resolved.display_name);
            return Err(PlaybackError::DecoderSpawnFailed {
                station: resolved.display_name,
                reason: err.to_string(),
            });
        }
    };

    let generation = radio
        .session
        .lock()
        .await
        .begin_playback(&resolved.display_name);

    let source: Input = ChildContainer::from(child).into();
    let track = call.lock().await.play_only_input(source);

    let notifier = PlaybackEndNotifier {
        radio: Arc::clone(radio),
        guild_id,
        generation,
        station_name: resolved.display_name.clone(),
    };
    let _ = track.add_event(Event::Track(TrackEvent::End), notifier.clone());
    let _ = track.add_event(Event::Track(TrackEvent::Error), notifier);

    *radio.current_track.lock().await = Some(track);

    Ok(resolved)
}

/// Stop the current stream, if any, without touching the voice connection.
/// Used by the leave path; the session tag is superseded so the stopped
/// stream's completion event reads as stale.
pub async fn stop(radio: &Radio) {
    let previous = radio.current_track.lock().await.take();
    if let Some(track) = previous {
        radio.session.lock().await.supersede();
        let _ = track.stop();
    }
}

/// Decoder argument contract: reconnect on stream drops, no video, WAV on
/// stdout for the voice driver to probe.
fn decoder_args(url: &str) -> Vec<String> {
    [
        "-reconnect",
        "1",
        "-reconnect_streamed",
        "1",
        "-reconnect_delay_max",
        "5",
        "-nostdin",
        "-i",
        url,
        "-vn",
        "-c:a",
        "pcm_s16le",
        "-ar",
        "48000",
        "-ac",
        "2",
        "-f",
        "wav",
        "pipe:1",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn spawn_decoder(url: &str) -> std::io::Result<Child> {
    Command::new("ffmpeg")
        .args(decoder_args(url))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
}

/// Completion callback for one playback attempt. Carries the generation tag
/// and station label it was started with; the session decides whether the
/// event still applies.
#[derive(Clone)]
struct PlaybackEndNotifier {
    radio: Arc<Radio>,
    guild_id: GuildId,
    generation: u64,
    station_name: String,
}

#[async_trait]
impl songbird::EventHandler for PlaybackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(reason) => Some(reason.to_string()),
                _ => None,
            }),
            _ => None,
        };

        let outcome = {
            let mut session = self.radio.session.lock().await;
            session.finish_playback(self.generation, &self.station_name, error.as_deref())
        };

        let panel_error = match outcome {
            CompletionOutcome::Applied { errored: true } => {
                tracing::warn!(
                    station = %self.station_name,
                    error = error.as_deref().unwrap_or("unknown"),
                    "playback errored"
                );
                error.clone()
            }
            CompletionOutcome::Applied { errored: false } => {
                tracing::info!(station = %self.station_name, "playback ended");
                None
            }
            CompletionOutcome::Superseded => {
                tracing::debug!(
                    station = %self.station_name,
                    generation = self.generation,
                    "stale completion event ignored"
                );
                None
            }
        };

        // A completion always triggers a render; stale events simply
        // reconcile the panel to current truth with no error attached.
        let _ = panel::render(&self.radio, self.guild_id, panel_error.as_deref()).await;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_reconnects_and_drops_video() {
        let args = decoder_args("https://stream.example/jazz");
        let joined = args.join(" ");
        assert!(joined.starts_with("-reconnect 1 -reconnect_streamed 1 -reconnect_delay_max 5 -nostdin"));
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"https://stream.example/jazz".to_string()));
    }

    #[test]
    fn decoder_emits_voice_ready_audio() {
        let args = decoder_args("https://stream.example/jazz");
        let joined = args.join(" ");
        assert!(joined.contains("-ar 48000"));
        assert!(joined.contains("-ac 2"));
        assert!(joined.ends_with("-f wav pipe:1"));
    }
}
