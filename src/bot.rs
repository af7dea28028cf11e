//! Interaction surface: prefix text commands, panel component interactions
//! and gateway event listeners.
//!
//! Every adapter here is thin: authorize the caller, delegate to the
//! playback controller or voice manager, answer the triggering caller, and
//! always finish by asking the panel renderer to reconcile the display.

use crate::session::PanelMessageRef;
use crate::voice::LeaveOutcome;
use crate::{Radio, panel, playback, voice};
use serenity::async_trait;
use serenity::builder::{
    CreateInteractionResponse, CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
};
use serenity::client::{Context, EventHandler};
use serenity::gateway::ActivityData;
use serenity::model::application::{
    ComponentInteraction, ComponentInteractionDataKind, Interaction,
};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::{GuildId, UserId};
use serenity::model::voice::VoiceState;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Gateway event handler. All state lives in the shared [`Radio`] context.
pub struct Handler;

/// The minimal capability set shared by text commands and component
/// interactions: acknowledge, reply privately, identify the caller.
enum Caller<'a> {
    Command(&'a Message),
    Component(&'a ComponentInteraction),
}

impl Caller<'_> {
    fn user_id(&self) -> UserId {
        match self {
            Caller::Command(msg) => msg.author.id,
            Caller::Component(interaction) => interaction.user.id,
        }
    }

    /// Acknowledge receipt. Components defer with an ephemeral placeholder
    /// since connecting or spawning the decoder can take a moment; text
    /// commands need no acknowledgment.
    async fn ack(&self, ctx: &Context) {
        if let Caller::Component(interaction) = self {
            let defer = CreateInteractionResponse::Defer(
                CreateInteractionResponseMessage::new().ephemeral(true),
            );
            if let Err(err) = interaction.create_response(&ctx.http, defer).await {
                warn!(error = %err, "failed to defer component interaction");
            }
        }
    }

    /// Reply to the triggering caller: ephemeral follow-up for components,
    /// channel message for text commands. Independent of the panel render
    /// that always follows.
    async fn reply(&self, ctx: &Context, text: &str) {
        let result = match self {
            Caller::Command(msg) => msg.channel_id.say(&ctx.http, text).await.map(|_| ()),
            Caller::Component(interaction) => interaction
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content(text)
                        .ephemeral(true),
                )
                .await
                .map(|_| ()),
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to reply to caller");
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "bot connected");
        let radio = crate::radio(&ctx).await;
        ctx.set_activity(Some(ActivityData::listening(format!(
            "la radio | {}help",
            radio.config.prefix
        ))));
        bootstrap_panel(&ctx, &radio).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let radio = crate::radio(&ctx).await;
        let Some((command, argument)) = parse_command(&msg.content, &radio.config.prefix) else {
            return;
        };
        let Some(guild_id) = msg.guild_id else {
            let _ = msg
                .channel_id
                .say(&ctx.http, "🚫 Este comando no se puede usar en mensajes privados.")
                .await;
            return;
        };

        debug!(command = %command, user = %msg.author.id, "text command received");
        match command.as_str() {
            "join" | "conectar" | "j" => {
                handle_join(&ctx, &radio, guild_id, Caller::Command(&msg)).await;
            }
            "leave" | "disconnect" | "salir" | "l" => {
                handle_stop_and_leave(&ctx, &radio, guild_id, Caller::Command(&msg)).await;
            }
            "play" | "p" => {
                if argument.is_empty() {
                    let _ = msg
                        .channel_id
                        .say(
                            &ctx.http,
                            format!(
                                "⚠️ Te faltó algo pa el comando, revisa con `{}help`.",
                                radio.config.prefix
                            ),
                        )
                        .await;
                    return;
                }
                handle_play(&ctx, &radio, guild_id, Caller::Command(&msg), &argument).await;
            }
            "panelradio" => handle_panel_resend(&ctx, &radio, guild_id, &msg).await,
            "help" | "ayuda" => {
                let _ = msg
                    .channel_id
                    .say(&ctx.http, help_text(&radio.config.prefix))
                    .await;
            }
            _ => {
                let _ = msg
                    .channel_id
                    .say(
                        &ctx.http,
                        format!("⚠️ Comando no encontrado. Usa `{}help` noma po.", radio.config.prefix),
                    )
                    .await;
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Component(component) = interaction else {
            return;
        };
        let Some(guild_id) = component.guild_id else {
            return;
        };
        let radio = crate::radio(&ctx).await;

        match component.data.custom_id.as_str() {
            panel::JOIN_BUTTON_ID => {
                handle_join(&ctx, &radio, guild_id, Caller::Component(&component)).await;
            }
            panel::STOP_LEAVE_BUTTON_ID => {
                handle_stop_and_leave(&ctx, &radio, guild_id, Caller::Component(&component)).await;
            }
            panel::STATION_SELECT_ID => {
                let selected = match &component.data.kind {
                    ComponentInteractionDataKind::StringSelect { values } => {
                        values.first().cloned()
                    }
                    _ => None,
                };
                let Some(key) = selected else {
                    return;
                };
                handle_play(&ctx, &radio, guild_id, Caller::Component(&component), &key).await;
            }
            _ => {}
        }
    }

    /// Voice-state changes for the bot's own member: forced disconnects,
    /// connects and moves all converge on the panel. Other members are
    /// ignored; channel-presence checks happen synchronously at action time.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let bot_id = ctx.cache.current_user().id;
        if new.user_id != bot_id {
            return;
        }
        let Some(guild_id) = new.guild_id.or_else(|| old.as_ref().and_then(|o| o.guild_id))
        else {
            return;
        };

        let before = old.as_ref().and_then(|o| o.channel_id);
        let after = new.channel_id;
        let radio = crate::radio(&ctx).await;

        match (before, after) {
            (Some(_), None) => {
                info!("bot was disconnected from voice");
                radio.session.lock().await.mark_disconnected();
            }
            (_, Some(channel)) if before != after => {
                let name = panel::channel_name(&ctx.cache, guild_id, channel)
                    .unwrap_or_else(|| channel.to_string());
                info!(channel = %name, "bot voice channel changed");
                radio.session.lock().await.voice_channel = Some(name);
            }
            _ => return,
        }

        let _ = panel::render(&radio, guild_id, None).await;
    }
}

/// Resolve the tracked panel message at startup, or create a fresh one and
/// tell the operator to persist its id.
async fn bootstrap_panel(ctx: &Context, radio: &Arc<Radio>) {
    let Some(channel_id) = radio.config.panel_channel else {
        info!("DEDICATED_TEXT_ID not set; control panel disabled");
        return;
    };
    let Some(guild_id) = ctx.cache.guilds().first().copied() else {
        warn!("bot is not in any guild; panel not set up");
        return;
    };

    let mut reference = None;
    if let Some(message_id) = radio.config.panel_message {
        match channel_id.message(&ctx.http, message_id).await {
            Ok(message) => {
                reference = Some(PanelMessageRef {
                    channel_id,
                    message_id: message.id,
                });
            }
            Err(err) => {
                warn!(%message_id, error = %err, "configured panel message not found; creating a new one");
            }
        }
    }

    let reference = match reference {
        Some(reference) => reference,
        None => match panel::send_panel(radio, channel_id).await {
            Ok(reference) => {
                info!(
                    message_id = %reference.message_id,
                    "new panel message sent; set RADIO_CONTROLS_ID to this id for future restarts"
                );
                reference
            }
            Err(err) => {
                error!(error = %err, "failed to send a new panel message");
                return;
            }
        },
    };

    radio.session.lock().await.panel_message = Some(reference);
    if let Err(err) = panel::render(radio, guild_id, None).await {
        warn!(error = %err, "initial panel render failed");
    }
}

async fn handle_join(ctx: &Context, radio: &Arc<Radio>, guild_id: GuildId, caller: Caller<'_>) {
    caller.ack(ctx).await;
    match voice::join(radio, guild_id, caller.user_id()).await {
        Ok(outcome) => {
            caller.reply(ctx, &outcome.message()).await;
            let _ = panel::render(radio, guild_id, None).await;
        }
        Err(err) => {
            let text = err.to_string();
            caller.reply(ctx, &text).await;
            let _ = panel::render(radio, guild_id, Some(&text)).await;
        }
    }
}

async fn handle_stop_and_leave(
    ctx: &Context,
    radio: &Arc<Radio>,
    guild_id: GuildId,
    caller: Caller<'_>,
) {
    caller.ack(ctx).await;
    let outcome = voice::leave_and_stop(radio, guild_id).await;
    let text = match (outcome, &caller) {
        (LeaveOutcome::Left, Caller::Command(_)) => "👋 Chao pescao.",
        (LeaveOutcome::Left, Caller::Component(_)) => "👋 Radio detenida y me he desconectado.",
        (LeaveOutcome::NotConnected, Caller::Command(_)) => {
            "⚠️ No estoy en ningún canal de voz, compa."
        }
        (LeaveOutcome::NotConnected, Caller::Component(_)) => {
            "⚠️ No estoy conectado a ningún canal de voz."
        }
    };
    caller.reply(ctx, text).await;
    let _ = panel::render(radio, guild_id, None).await;
}

async fn handle_play(
    ctx: &Context,
    radio: &Arc<Radio>,
    guild_id: GuildId,
    caller: Caller<'_>,
    input: &str,
) {
    caller.ack(ctx).await;
    match playback::play_station(radio, guild_id, caller.user_id(), input).await {
        Ok(resolved) => {
            let ack_text = match &caller {
                Caller::Command(_) => {
                    format!("🎧 ¡Reproduciendo ahora: **{}**!", resolved.display_name)
                }
                Caller::Component(_) => format!("✅ Sintonizando: **{}**", resolved.display_name),
            };
            caller.reply(ctx, &ack_text).await;
            let _ = panel::render(radio, guild_id, None).await;
        }
        Err(err) => {
            let text = err.to_string();
            caller.reply(ctx, &text).await;
            let _ = panel::render(radio, guild_id, Some(&text)).await;
        }
    }
}

/// `panelradio`: privileged re-send of the control panel, replacing the
/// tracked message wholesale so no duplicate live panel survives.
async fn handle_panel_resend(ctx: &Context, radio: &Arc<Radio>, guild_id: GuildId, msg: &Message) {
    if !has_manage_guild(ctx, guild_id, msg.author.id).await {
        let _ = msg
            .channel_id
            .say(
                &ctx.http,
                "🚫 Te faltan permisos para usar este comando: Gestionar Servidor",
            )
            .await;
        return;
    }
    let Some(channel_id) = radio.config.panel_channel else {
        let _ = msg
            .channel_id
            .say(&ctx.http, "❌ No hay canal de texto dedicado configurado en .env.")
            .await;
        return;
    };

    // Best-effort delete of the old panel message.
    let previous = radio.session.lock().await.panel_message.take();
    if let Some(reference) = previous {
        if let Err(err) = reference
            .channel_id
            .delete_message(&ctx.http, reference.message_id)
            .await
        {
            debug!(error = %err, "old panel message could not be deleted");
        }
    }

    match panel::send_panel(radio, channel_id).await {
        Ok(reference) => {
            radio.session.lock().await.panel_message = Some(reference);
            let _ = panel::render(radio, guild_id, None).await;
            info!(message_id = %reference.message_id, "panel manually re-sent; update RADIO_CONTROLS_ID");
            let _ = msg
                .channel_id
                .say(
                    &ctx.http,
                    format!(
                        "✅ Panel de radio reenviado. Nuevo ID de mensaje: `{}`. **¡Actualiza tu .env!**",
                        reference.message_id
                    ),
                )
                .await;
        }
        Err(err) => {
            error!(error = %err, "failed to re-send the panel");
            let _ = msg
                .channel_id
                .say(&ctx.http, "❌ No pude reenviar el panel.")
                .await;
        }
    }
}

/// Guild-level permission gate: the owner, or any role carrying Manage
/// Guild or Administrator.
async fn has_manage_guild(ctx: &Context, guild_id: GuildId, user_id: UserId) -> bool {
    let Ok(member) = guild_id.member(&ctx.http, user_id).await else {
        return false;
    };
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return false;
    };
    if guild.owner_id == user_id {
        return true;
    }
    member.roles.iter().any(|role_id| {
        guild.roles.get(role_id).is_some_and(|role| {
            role.permissions.manage_guild() || role.permissions.administrator()
        })
    })
}

/// Split a message into `(command, argument)` when it carries the prefix.
fn parse_command(content: &str, prefix: &str) -> Option<(String, String)> {
    let rest = content.strip_prefix(prefix)?.trim();
    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    if command.is_empty() {
        return None;
    }
    let argument = parts.next().map(str::trim).unwrap_or("").to_string();
    Some((command, argument))
}

fn help_text(prefix: &str) -> String {
    format!(
        "**Comandos de Rock & Bot**\n\
         `{prefix}join` (`conectar`, `j`) — me uno a tu canal de voz\n\
         `{prefix}play <emisora|URL>` (`p`) — reproduzco una emisora del catálogo o una URL directa\n\
         `{prefix}leave` (`disconnect`, `salir`, `l`) — detengo la radio y salgo del canal\n\
         `{prefix}panelradio` — reenvía el panel de control (requiere Gestionar Servidor)"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_messages_without_the_prefix() {
        assert!(parse_command("hola", "!!").is_none());
        assert!(parse_command("! play jazz_fm", "!!").is_none());
    }

    #[test]
    fn splits_command_and_argument() {
        let (command, argument) = parse_command("!!play jazz_fm", "!!").unwrap();
        assert_eq!(command, "play");
        assert_eq!(argument, "jazz_fm");
    }

    #[test]
    fn commands_are_case_insensitive_but_arguments_are_preserved() {
        let (command, argument) =
            parse_command("!!PLAY <https://Stream.Example/Jazz>", "!!").unwrap();
        assert_eq!(command, "play");
        assert_eq!(argument, "<https://Stream.Example/Jazz>");
    }

    #[test]
    fn bare_prefix_is_not_a_command() {
        assert!(parse_command("!!", "!!").is_none());
        assert!(parse_command("!!   ", "!!").is_none());
    }

    #[test]
    fn argument_defaults_to_empty() {
        let (command, argument) = parse_command("!!join", "!!").unwrap();
        assert_eq!(command, "join");
        assert!(argument.is_empty());
    }

    #[test]
    fn help_lists_the_whole_command_surface() {
        let help = help_text("!!");
        for command in ["!!join", "!!play", "!!leave", "!!panelradio"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
