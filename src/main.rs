//! xrdp-source - Capture du micro distant xrdp
//!
//! Lance un pont vers chansrv et écrit le PCM brut capturé sur la sortie
//! standard (ou dans un fichier).

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xrdp_source::capture::{capture_ring, CaptureReader};
use xrdp_source::config::{
    BridgeConfig, SampleFormat, SampleSpec, DEFAULT_DESCRIPTION, DEFAULT_LATENCY_TIME_MS,
    DEFAULT_OVER_REQUEST_FACTOR, DEFAULT_SOURCE_NAME,
};
use xrdp_source::pump::SourceState;
use xrdp_source::Bridge;

/// Capture du micro de la session xrdp
#[derive(Parser, Debug)]
#[command(name = "xrdp-source", version, about)]
struct Args {
    /// Format d'échantillon (s16le, float32le, ...)
    #[arg(long, default_value = "s16le")]
    format: SampleFormat,

    /// Taux d'échantillonnage (Hz)
    #[arg(long, default_value_t = 44100)]
    rate: u32,

    /// Nombre de canaux
    #[arg(long, default_value_t = 2)]
    channels: u8,

    #[arg(long, default_value = DEFAULT_SOURCE_NAME)]
    source_name: String,

    #[arg(long, default_value = DEFAULT_DESCRIPTION)]
    description: String,

    /// Intervalle de réveil du worker (ms)
    #[arg(long, default_value_t = DEFAULT_LATENCY_TIME_MS)]
    latency_time: u64,

    /// Répertoire des sockets xrdp
    #[arg(long)]
    xrdp_socket_path: Option<String>,

    /// Nom du socket source
    #[arg(long)]
    xrdp_pulse_source_socket: Option<String>,

    /// Marge de sur-demande appliquée au déficit
    #[arg(long, default_value_t = DEFAULT_OVER_REQUEST_FACTOR)]
    over_request: usize,

    /// Fichier de sortie, `-` pour stdout
    #[arg(long, short, default_value = "-")]
    output: PathBuf,
}

impl Args {
    fn to_config(&self) -> BridgeConfig {
        BridgeConfig {
            sample_spec: SampleSpec {
                format: self.format,
                rate: self.rate,
                channels: self.channels,
            },
            latency_time: Duration::from_millis(self.latency_time),
            socket_dir: self.xrdp_socket_path.clone(),
            socket_name: self.xrdp_pulse_source_socket.clone(),
            source_name: self.source_name.clone(),
            description: self.description.clone(),
            over_request_factor: self.over_request,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout peut transporter le PCM : logs sur stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xrdp_source=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("xrdp-source v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = args.to_config();
    config.validate()?;

    let mut output: Box<dyn AsyncWrite + Unpin + Send> = if args.output.as_os_str() == "-" {
        Box::new(tokio::io::stdout())
    } else {
        Box::new(tokio::fs::File::create(&args.output).await?)
    };

    // Une seconde d'audio en tampon
    let (sink, mut reader) = capture_ring(config.sample_spec.bytes_per_second());
    let mut bridge = Bridge::start(&config, sink)?;
    bridge.control().set_state(SourceState::Running)?;

    let mut drain = tokio::time::interval(config.latency_time);
    let mut buf = vec![0u8; config.sample_spec.bytes_per_second()];
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interruption, arrêt de la capture");
                break;
            }
            event = bridge.next_event() => {
                tracing::warn!("Le worker demande son déchargement ({:?})", event);
                break;
            }
            _ = drain.tick() => {
                drain_into(&mut reader, &mut buf, &mut output).await?;
            }
        }
    }

    bridge.control().set_state(SourceState::Idle)?;
    bridge.shutdown().await?;
    drain_into(&mut reader, &mut buf, &mut output).await?;
    output.flush().await?;

    Ok(())
}

async fn drain_into<W>(
    reader: &mut CaptureReader,
    buf: &mut [u8],
    output: &mut W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    loop {
        let n = reader.read(buf);
        if n == 0 {
            return Ok(());
        }
        output.write_all(&buf[..n]).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_bridge_defaults() {
        let args = Args::try_parse_from(["xrdp-source"]).unwrap();
        let config = args.to_config();
        let defaults = BridgeConfig::default();

        assert_eq!(config.sample_spec, defaults.sample_spec);
        assert_eq!(config.latency_time, defaults.latency_time);
        assert_eq!(config.over_request_factor, defaults.over_request_factor);
        assert_eq!(config.source_name, defaults.source_name);
        assert!(config.socket_dir.is_none());
        assert_eq!(args.output, PathBuf::from("-"));
    }

    #[test]
    fn parses_module_style_arguments() {
        let args = Args::try_parse_from([
            "xrdp-source",
            "--format",
            "float32le",
            "--rate",
            "48000",
            "--channels",
            "1",
            "--latency-time",
            "20",
            "--xrdp-socket-path",
            "/run/xrdp/sockdir",
            "--xrdp-pulse-source-socket",
            "source_socket",
        ])
        .unwrap();
        let config = args.to_config();

        assert_eq!(config.sample_spec.format, SampleFormat::Float32Le);
        assert_eq!(config.sample_spec.rate, 48000);
        assert_eq!(config.sample_spec.channels, 1);
        assert_eq!(config.latency_time, Duration::from_millis(20));
        assert_eq!(
            config.endpoint_path(),
            PathBuf::from("/run/xrdp/sockdir/source_socket")
        );
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(Args::try_parse_from(["xrdp-source", "--format", "s13le"]).is_err());
    }
}
