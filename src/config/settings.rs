//! Configuration du pont de capture

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Taux d'échantillonnage maximal accepté
pub const RATE_MAX: u32 = 384_000;

/// Nombre maximal de canaux
pub const CHANNELS_MAX: u8 = 32;

/// Intervalle de réveil par défaut (ms)
pub const DEFAULT_LATENCY_TIME_MS: u64 = 10;

/// Marge de sur-demande par défaut
pub const DEFAULT_OVER_REQUEST_FACTOR: usize = 4;

pub const DEFAULT_SOURCE_NAME: &str = "xrdp-source";
pub const DEFAULT_DESCRIPTION: &str = "remote audio input";

/// Erreurs de configuration, fatales au démarrage uniquement
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Format d'échantillon inconnu: {0}")]
    InvalidFormat(String),

    #[error("Taux d'échantillonnage invalide: {0} Hz")]
    InvalidRate(u32),

    #[error("Nombre de canaux invalide: {0}")]
    InvalidChannels(u8),

    #[error("latency_time doit être supérieur à 0 ms")]
    InvalidLatency,

    #[error("Facteur de sur-demande invalide: {0}")]
    InvalidOverRequest(usize),
}

/// Formats d'échantillon transportés tels quels (aucune conversion)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    ALaw,
    ULaw,
    S16Le,
    S16Be,
    Float32Le,
    Float32Be,
    S32Le,
    S32Be,
    S24Le,
    S24Be,
    S24In32Le,
    S24In32Be,
}

impl SampleFormat {
    /// Taille d'un échantillon en octets
    pub fn sample_size(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::ALaw | SampleFormat::ULaw => 1,
            SampleFormat::S16Le | SampleFormat::S16Be => 2,
            SampleFormat::S24Le | SampleFormat::S24Be => 3,
            SampleFormat::Float32Le
            | SampleFormat::Float32Be
            | SampleFormat::S32Le
            | SampleFormat::S32Be
            | SampleFormat::S24In32Le
            | SampleFormat::S24In32Be => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::ALaw => "aLaw",
            SampleFormat::ULaw => "uLaw",
            SampleFormat::S16Le => "s16le",
            SampleFormat::S16Be => "s16be",
            SampleFormat::Float32Le => "float32le",
            SampleFormat::Float32Be => "float32be",
            SampleFormat::S32Le => "s32le",
            SampleFormat::S32Be => "s32be",
            SampleFormat::S24Le => "s24le",
            SampleFormat::S24Be => "s24be",
            SampleFormat::S24In32Le => "s24-32le",
            SampleFormat::S24In32Be => "s24-32be",
        }
    }
}

impl FromStr for SampleFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "u8" => Ok(SampleFormat::U8),
            "alaw" => Ok(SampleFormat::ALaw),
            "ulaw" => Ok(SampleFormat::ULaw),
            "s16le" => Ok(SampleFormat::S16Le),
            "s16be" => Ok(SampleFormat::S16Be),
            "float32le" => Ok(SampleFormat::Float32Le),
            "float32be" => Ok(SampleFormat::Float32Be),
            "s32le" => Ok(SampleFormat::S32Le),
            "s32be" => Ok(SampleFormat::S32Be),
            "s24le" => Ok(SampleFormat::S24Le),
            "s24be" => Ok(SampleFormat::S24Be),
            "s24-32le" => Ok(SampleFormat::S24In32Le),
            "s24-32be" => Ok(SampleFormat::S24In32Be),
            other => Err(ConfigError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format, taux et canaux du flux capturé
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpec {
    pub format: SampleFormat,
    pub rate: u32,
    pub channels: u8,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            format: SampleFormat::S16Le,
            rate: 44100,
            channels: 2,
        }
    }
}

impl SampleSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate == 0 || self.rate > RATE_MAX {
            return Err(ConfigError::InvalidRate(self.rate));
        }
        if self.channels == 0 || self.channels > CHANNELS_MAX {
            return Err(ConfigError::InvalidChannels(self.channels));
        }
        Ok(())
    }

    /// Taille d'une trame (tous canaux) en octets
    pub fn frame_size(&self) -> usize {
        self.format.sample_size() * self.channels as usize
    }

    /// Octets par seconde
    pub fn bytes_per_second(&self) -> usize {
        self.frame_size() * self.rate as usize
    }

    /// Convertit une durée en octets, arrondi à la trame inférieure
    pub fn duration_to_bytes(&self, duration: Duration) -> usize {
        let frames = duration.as_micros() * self.rate as u128 / 1_000_000;
        (frames as usize).saturating_mul(self.frame_size())
    }
}

impl fmt::Display for SampleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}ch {}Hz", self.format, self.channels, self.rate)
    }
}

/// Configuration du pont
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub sample_spec: SampleSpec,
    /// Intervalle entre deux réveils du worker
    pub latency_time: Duration,
    /// Répertoire des sockets xrdp (`xrdp_socket_path`)
    pub socket_dir: Option<String>,
    /// Nom du socket source (`xrdp_pulse_source_socket`)
    pub socket_name: Option<String>,
    pub source_name: String,
    pub description: String,
    /// Multiplicateur appliqué au déficit calculé
    pub over_request_factor: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sample_spec: SampleSpec::default(),
            latency_time: Duration::from_millis(DEFAULT_LATENCY_TIME_MS),
            socket_dir: None,
            socket_name: None,
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            over_request_factor: DEFAULT_OVER_REQUEST_FACTOR,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sample_spec.validate()?;
        if self.latency_time.is_zero() {
            return Err(ConfigError::InvalidLatency);
        }
        if self.over_request_factor == 0 {
            return Err(ConfigError::InvalidOverRequest(self.over_request_factor));
        }
        Ok(())
    }
}
