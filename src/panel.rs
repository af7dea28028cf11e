//! Panel rendering: session state + station catalog → one edited control
//! message.
//!
//! The embed and control layout are rebuilt from scratch on every call so
//! the panel stays valid across restarts; the interactive components carry
//! stable custom ids, which is what lets Discord route clicks back to this
//! process without per-message registration.

use crate::Radio;
use crate::catalog::{MAX_STATIONS, StationCatalog};
use crate::error::PanelError;
use crate::session::{DISCONNECTED_LABEL, PanelMessageRef, Session};
use serenity::builder::{
    CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter, CreateMessage,
    CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption, EditMessage,
};
use serenity::cache::Cache;
use serenity::http::HttpError;
use serenity::model::Colour;
use serenity::model::application::ButtonStyle;
use serenity::model::id::{ChannelId, GuildId};

/// Stable component identifiers. Changing these orphans every panel message
/// already sitting in a channel.
pub const JOIN_BUTTON_ID: &str = "radio_join_voice";
pub const STOP_LEAVE_BUTTON_ID: &str = "radio_stop_leave";
pub const STATION_SELECT_ID: &str = "radio_station_select";

const PANEL_TITLE: &str = "📻 Panel de Control de Rock & Bot 🤘";
const PANEL_DESCRIPTION: &str = "Usa los controles de abajo para manejar la radio.";
const PANEL_THUMBNAIL: &str = "https://cdn-icons-png.flaticon.com/512/2907/2907109.png";

/// Discord caps select option labels and descriptions at 100 characters.
const OPTION_TEXT_CAP: usize = 100;

/// Colour tier of the panel embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelTier {
    /// A station is playing and the bot is connected.
    Nominal,
    /// An error message decorates this render; takes precedence.
    Error,
    /// No voice connection.
    Disconnected,
    /// Connected but idle.
    Neutral,
}

/// Pick the colour tier for a session snapshot.
pub fn tier(session: &Session) -> PanelTier {
    if session.last_error.is_some() {
        PanelTier::Error
    } else if session.station.is_playing() && session.voice_channel.is_some() {
        PanelTier::Nominal
    } else if session.voice_channel.is_none() {
        PanelTier::Disconnected
    } else {
        PanelTier::Neutral
    }
}

fn colour(tier: PanelTier) -> Colour {
    match tier {
        PanelTier::Nominal => Colour::DARK_GREEN,
        PanelTier::Error => Colour::ORANGE,
        PanelTier::Disconnected => Colour::RED,
        PanelTier::Neutral => Colour::GOLD,
    }
}

/// Build the panel embed from a session snapshot.
pub fn build_embed(session: &Session, bot_name: &str, prefix: &str) -> CreateEmbed {
    let voice_label = session
        .voice_channel
        .as_deref()
        .unwrap_or(DISCONNECTED_LABEL);

    let mut embed = CreateEmbed::new()
        .title(PANEL_TITLE)
        .description(PANEL_DESCRIPTION)
        .colour(colour(tier(session)))
        .field("🔊 Estado Conexión de Voz", format!("`{voice_label}`"), true)
        .field(
            "🎶 Actualmente Sonando",
            format!("`{}`", session.station.label()),
            true,
        )
        .footer(CreateEmbedFooter::new(format!("Bot {bot_name} | {prefix}help")))
        .thumbnail(PANEL_THUMBNAIL);

    if let Some(error) = &session.last_error {
        embed = embed.field("⚠️ Último Error", error.clone(), false);
    }

    embed
}

/// Build the fixed control layout: join + stop buttons, then the station
/// select when the catalog has entries.
pub fn build_components(catalog: &StationCatalog) -> Vec<CreateActionRow> {
    let join = CreateButton::new(JOIN_BUTTON_ID)
        .label("Conectarme a Voz")
        .style(ButtonStyle::Success)
        .emoji('🎤');
    let stop = CreateButton::new(STOP_LEAVE_BUTTON_ID)
        .label("Detener y Salir")
        .style(ButtonStyle::Danger)
        .emoji('✖');

    let mut rows = vec![CreateActionRow::Buttons(vec![join, stop])];

    let options: Vec<CreateSelectMenuOption> = catalog
        .entries()
        .iter()
        .take(MAX_STATIONS)
        .map(|station| {
            CreateSelectMenuOption::new(truncate(&station.display_name, OPTION_TEXT_CAP), station.key.clone())
                .description(truncate(&format!("Escuchar {}", station.display_name), OPTION_TEXT_CAP))
                .emoji('🎶')
        })
        .collect();

    if !options.is_empty() {
        let select = CreateSelectMenu::new(
            STATION_SELECT_ID,
            CreateSelectMenuKind::String { options },
        )
        .placeholder("🎶 Elige una emisora...")
        .min_values(1)
        .max_values(1);
        rows.push(CreateActionRow::SelectMenu(select));
    }

    rows
}

/// Render the panel: refresh the connection fields from the live voice
/// session, re-assert the coupling invariant, then edit the tracked message
/// in place. Exactly one outbound edit, no retries.
///
/// An edit that fails because the message no longer exists clears the
/// tracked reference and reports [`PanelError::MessageMissing`]; recreation
/// is an explicit, separate operation (startup or the re-send command).
/// Other platform failures are logged here and surfaced to the caller, who
/// is expected to swallow them; the next state-changing action re-renders
/// to current truth anyway.
pub async fn render(radio: &Radio, guild_id: GuildId, error: Option<&str>) -> Result<(), PanelError> {
    let connected = current_voice_channel_name(radio, guild_id).await;
    let bot_name = radio.cache.current_user().name.to_string();

    let (reference, embed) = {
        let mut session = radio.session.lock().await;
        session.voice_channel = connected;
        session.normalize();
        session.last_error = error.map(str::to_owned);

        // No tracked panel: the feature is disabled or the reference was
        // lost; nothing to edit.
        let Some(reference) = session.panel_message else {
            return Ok(());
        };
        (reference, build_embed(&session, &bot_name, &radio.config.prefix))
    };

    let builder = EditMessage::new()
        .content("")
        .embed(embed)
        .components(build_components(&radio.catalog));

    match reference
        .channel_id
        .edit_message(&radio.http, reference.message_id, builder)
        .await
    {
        Ok(_) => Ok(()),
        Err(err) if is_unknown_message(&err) => {
            tracing::warn!(
                message_id = %reference.message_id,
                "panel message is gone; clearing the tracked reference"
            );
            radio.session.lock().await.panel_message = None;
            Err(PanelError::MessageMissing)
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to edit the panel message");
            Err(PanelError::PlatformCall(err))
        }
    }
}

/// Send a brand-new panel message into `channel_id` and return its
/// reference. Used at startup when the configured message cannot be
/// resolved, and by the privileged re-send command.
pub async fn send_panel(
    radio: &Radio,
    channel_id: ChannelId,
) -> Result<PanelMessageRef, serenity::Error> {
    let placeholder = CreateEmbed::new()
        .title("Cargando Panel de Radio...")
        .colour(Colour::LIGHT_GREY);
    let message = channel_id
        .send_message(
            &radio.http,
            CreateMessage::new()
                .content("📡")
                .embed(placeholder)
                .components(build_components(&radio.catalog)),
        )
        .await?;

    Ok(PanelMessageRef {
        channel_id,
        message_id: message.id,
    })
}

/// Name of the voice channel the bot currently occupies, or `None` when it
/// holds no active connection.
async fn current_voice_channel_name(radio: &Radio, guild_id: GuildId) -> Option<String> {
    let call = radio.manager.get(guild_id)?;
    let channel = call.lock().await.current_channel()?;
    let channel_id = ChannelId::new(channel.0.get());
    Some(
        channel_name(&radio.cache, guild_id, channel_id)
            .unwrap_or_else(|| channel_id.to_string()),
    )
}

/// Resolve a guild channel's display name from the cache.
pub(crate) fn channel_name(cache: &Cache, guild_id: GuildId, channel_id: ChannelId) -> Option<String> {
    let guild = cache.guild(guild_id)?;
    guild.channels.get(&channel_id).map(|c| c.name.clone())
}

fn truncate(text: &str, cap: usize) -> String {
    text.chars().take(cap).collect()
}

fn is_unknown_message(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            response.status_code.as_u16() == 404
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StationCatalog;
    use crate::session::{Session, StationStatus};

    fn connected_session() -> Session {
        let mut session = Session::new();
        session.voice_channel = Some("Música".to_string());
        session
    }

    #[test]
    fn error_tier_takes_precedence_over_nominal() {
        let mut session = connected_session();
        session.begin_playback("Jazz FM");
        session.last_error = Some("algo falló".to_string());
        assert_eq!(tier(&session), PanelTier::Error);
    }

    #[test]
    fn playing_while_connected_is_nominal() {
        let mut session = connected_session();
        session.begin_playback("Jazz FM");
        assert_eq!(tier(&session), PanelTier::Nominal);
    }

    #[test]
    fn errored_station_is_not_nominal() {
        let mut session = connected_session();
        session.station = StationStatus::Errored("Jazz FM".into());
        assert_eq!(tier(&session), PanelTier::Neutral);
    }

    #[test]
    fn disconnected_session_renders_disconnected_tier() {
        let session = Session::new();
        assert_eq!(tier(&session), PanelTier::Disconnected);
    }

    #[test]
    fn connected_idle_session_is_neutral() {
        let session = connected_session();
        assert_eq!(tier(&session), PanelTier::Neutral);
    }

    #[test]
    fn layout_carries_stable_custom_ids() {
        let rows = build_components(&StationCatalog::builtin());
        let serialized = serde_json::to_string(&rows).expect("action rows serialize");
        assert!(serialized.contains(JOIN_BUTTON_ID));
        assert!(serialized.contains(STOP_LEAVE_BUTTON_ID));
        assert!(serialized.contains(STATION_SELECT_ID));
    }

    #[test]
    fn select_menu_offers_every_catalog_key() {
        let catalog = StationCatalog::builtin();
        let serialized =
            serde_json::to_string(&build_components(&catalog)).expect("action rows serialize");
        for station in catalog.entries() {
            assert!(serialized.contains(&station.key));
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("ñandú", 3), "ñan");
        assert_eq!(truncate("corto", 100), "corto");
    }
}
