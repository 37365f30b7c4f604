//! Résolution du chemin du socket chansrv
//!
//! Ordre de priorité : valeur explicite, puis variable d'environnement,
//! puis valeur par défaut. Une valeur vide compte comme absente.

use super::BridgeConfig;
use std::path::PathBuf;

pub const DEFAULT_SOCKET_DIR: &str = "/tmp/.xrdp";
pub const SOCKET_DIR_ENV: &str = "XRDP_SOCKET_PATH";
pub const SOCKET_NAME_ENV: &str = "XRDP_PULSE_SOURCE_SOCKET";
pub const DISPLAY_ENV: &str = "DISPLAY";

const SOCKET_NAME_PREFIX: &str = "xrdp_chansrv_audio_out_socket";

impl BridgeConfig {
    /// Chemin du socket, à partir de l'environnement du processus
    pub fn endpoint_path(&self) -> PathBuf {
        self.endpoint_path_with(|key| std::env::var(key).ok())
    }

    /// Chemin du socket, avec une source d'environnement injectée
    pub fn endpoint_path_with<F>(&self, env: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        let socket_dir = pick(self.socket_dir.clone(), || env(SOCKET_DIR_ENV))
            .unwrap_or_else(|| DEFAULT_SOCKET_DIR.to_string());

        let socket_name = pick(self.socket_name.clone(), || env(SOCKET_NAME_ENV))
            .unwrap_or_else(|| {
                tracing::debug!("Nom du socket absent de la config et de l'environnement");
                let display = env(DISPLAY_ENV);
                format!(
                    "{}_{}",
                    SOCKET_NAME_PREFIX,
                    display_number(display.as_deref())
                )
            });

        PathBuf::from(socket_dir).join(socket_name)
    }
}

fn pick<F>(explicit: Option<String>, fallback: F) -> Option<String>
where
    F: FnOnce() -> Option<String>,
{
    explicit
        .filter(|v| !v.is_empty())
        .or_else(|| fallback().filter(|v| !v.is_empty()))
}

/// Extrait le numéro d'affichage d'une chaîne `host:display.screen`
///
/// Chaque segment peut être vide. Une entrée absente ou mal formée donne 0.
pub fn display_number(display: Option<&str>) -> i32 {
    let Some(display) = display else {
        return 0;
    };

    #[derive(PartialEq)]
    enum Segment {
        Host,
        Display,
        Screen,
    }

    let mut segment = Segment::Host;
    let mut digits = String::new();
    for c in display.chars() {
        match c {
            ':' => segment = Segment::Display,
            '.' => segment = Segment::Screen,
            _ if segment == Segment::Display => digits.push(c),
            _ => {}
        }
    }

    parse_leading_int(&digits)
}

/// Conversion à la manière de `atoi` : espaces, signe, chiffres en tête
fn parse_leading_int(s: &str) -> i32 {
    let s = s.trim_start_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            (acc * 10 + (d - b'0') as i64).min(i32::MAX as i64 + 1)
        });
    let value = if negative { -value } else { value };
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
