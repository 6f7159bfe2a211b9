//! Protocolo de linha entre host e microcontrolador.
//!
//! Cada frame é um objeto JSON em uma única linha terminada por `\n`:
//!
//! ```text
//! host → MCU   {"cpu":12.5,"ram":{...},"disk":{...},"temp":48.2,"net":{...},"uptime":3600}
//! MCU  → host  {"action":"reboot"}
//! ```
//!
//! Não existe frame de confirmação: comandos inválidos são descartados.

use crate::types::{Command, TelemetrySnapshot};
use serde_json::Value;

/// Terminador de frame nos dois sentidos.
pub const LINE_TERMINATOR: char = '\n';

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON inválido: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Frame não é um objeto JSON")]
    NotAnObject,

    #[error("Campo `action` ausente ou não textual")]
    MissingAction,

    #[error("Erro de serialização: {0}")]
    Serialize(String),
}

/// Serializa um [`TelemetrySnapshot`] em uma linha (sem o terminador).
pub fn encode_snapshot(snapshot: &TelemetrySnapshot) -> Result<String, ProtocolError> {
    serde_json::to_string(snapshot).map_err(|e| ProtocolError::Serialize(e.to_string()))
}

/// Decodifica uma linha de telemetria.
#[cfg(test)]
pub(crate) fn decode_snapshot(line: &str) -> Result<TelemetrySnapshot, ProtocolError> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Decodifica uma linha recebida em [`Command`].
///
/// Só valida a forma do frame; o nome da ação é resolvido pelo dispatcher.
pub fn decode_command(line: &str) -> Result<Command, ProtocolError> {
    let value: Value = serde_json::from_str(line.trim())?;
    let Value::Object(mut payload) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    match payload.remove("action") {
        Some(Value::String(action)) => Ok(Command { action, payload }),
        _ => Err(ProtocolError::MissingAction),
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
