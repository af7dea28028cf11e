//! Top-level error types for the radio bot.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error(transparent)]
    Panel(#[from] PanelError),

    #[error("discord error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config key: {0}")]
    MissingKey(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to load station catalog from {path}: {reason}")]
    Catalog { path: String, reason: String },

    #[error("invalid station catalog: {0}")]
    InvalidCatalog(String),
}

/// Playback failures, checked in order by the controller.
///
/// These are operator-facing: the `Display` text is exactly what the
/// triggering caller and the shared panel show, so the messages keep the
/// bot's original Spanish voice.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("No estoy en un canal de voz. Usa el botón 'Conectarme'.")]
    NotConnected,

    #[error("Debes estar en mi mismo canal (<#{0}>) para cambiar la emisora.")]
    WrongChannel(u64),

    #[error("No pude determinar una URL para: `{input}`.")]
    NoUrlResolved { input: String },

    #[error("No pude reproducir **{station}**. Error: `{reason}`")]
    DecoderSpawnFailed { station: String, reason: String },
}

/// Voice connection failures.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("⚠️ Debes estar en un canal de voz para que pueda unirme.")]
    CallerNotInVoice,

    #[error("🛑 No pude unirme a tu canal: {0}")]
    JoinFailed(String),

    #[error("🛑 No pude moverme a tu canal: {0}")]
    MoveFailed(String),
}

/// Panel rendering failures.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("panel message no longer exists")]
    MessageMissing,

    #[error("platform call failed: {0}")]
    PlatformCall(#[from] serenity::Error),
}
