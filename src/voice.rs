//! Voice connection manager: join, move and leave operations against the
//! guild's voice session.

use crate::Radio;
use crate::error::VoiceError;
use crate::{panel, playback};
use serenity::cache::Cache;
use serenity::model::id::{ChannelId, GuildId, UserId};

/// Distinct success paths of a join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Connected from scratch to the caller's channel.
    Joined(String),
    /// Already connected elsewhere; moved to the caller's channel.
    Moved(String),
    /// Already in the caller's channel; nothing to do.
    AlreadyConnected(String),
}

impl JoinOutcome {
    /// Caller-facing acknowledgment.
    pub fn message(&self) -> String {
        match self {
            JoinOutcome::Joined(name) => {
                format!("✅ ¡Conectado a **{name}**! Ahora puedes seleccionar una emisora.")
            }
            JoinOutcome::Moved(name) => format!("✅ Me he movido a tu canal: **{name}**."),
            JoinOutcome::AlreadyConnected(name) => format!("👍 Ya estoy en tu canal: **{name}**."),
        }
    }
}

/// Distinct outcomes of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    NotConnected,
}

/// Join (or move to) the caller's voice channel.
pub async fn join(radio: &Radio, guild_id: GuildId, caller: UserId) -> Result<JoinOutcome, VoiceError> {
    let Some(target) = voice_channel_of(&radio.cache, guild_id, caller) else {
        return Err(VoiceError::CallerNotInVoice);
    };
    let target_name = panel::channel_name(&radio.cache, guild_id, target)
        .unwrap_or_else(|| target.to_string());

    let current = match radio.manager.get(guild_id) {
        Some(call) => call.lock().await.current_channel(),
        None => None,
    };

    let outcome = match current {
        Some(channel) if channel.0.get() == target.get() => {
            JoinOutcome::AlreadyConnected(target_name.clone())
        }
        Some(_) => {
            radio
                .manager
                .join(guild_id, target)
                .await
                .map_err(|e| VoiceError::MoveFailed(e.to_string()))?;
            JoinOutcome::Moved(target_name.clone())
        }
        None => {
            radio
                .manager
                .join(guild_id, target)
                .await
                .map_err(|e| VoiceError::JoinFailed(e.to_string()))?;
            JoinOutcome::Joined(target_name.clone())
        }
    };

    radio.session.lock().await.voice_channel = Some(target_name);
    tracing::info!(outcome = ?outcome, "voice join handled");
    Ok(outcome)
}

/// Stop any in-flight playback and leave the voice channel, resetting the
/// session's station and connection fields together.
pub async fn leave_and_stop(radio: &Radio, guild_id: GuildId) -> LeaveOutcome {
    if radio.manager.get(guild_id).is_none() {
        return LeaveOutcome::NotConnected;
    }

    playback::stop(radio).await;
    if let Err(err) = radio.manager.remove(guild_id).await {
        tracing::warn!(error = %err, "failed to disconnect cleanly");
    }
    radio.session.lock().await.mark_disconnected();
    tracing::info!("left voice channel");
    LeaveOutcome::Left
}

/// Voice channel the given user currently occupies, from the gateway cache.
pub(crate) fn voice_channel_of(cache: &Cache, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = cache.guild(guild_id)?;
    guild.voice_states.get(&user_id).and_then(|vs| vs.channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_outcomes_report_distinctly() {
        let joined = JoinOutcome::Joined("Música".into()).message();
        let moved = JoinOutcome::Moved("Música".into()).message();
        let already = JoinOutcome::AlreadyConnected("Música".into()).message();

        assert!(joined.contains("Conectado"));
        assert!(moved.contains("movido"));
        assert!(already.contains("Ya estoy"));
        assert_ne!(joined, moved);
        assert_ne!(moved, already);
    }
}
