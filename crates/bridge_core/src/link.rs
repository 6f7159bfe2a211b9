//! Canal serial: contratos de leitura/escrita por linha e framing.
//!
//! A porta aberta é dividida em duas metades independentes ([`LineReader`]
//! e [`LineWriter`]) para que as threads de leitura e escrita não disputem
//! um lock. Qualquer [`LinkError`] significa perda de conexão.

use crate::locator::SerialEndpoint;
use crate::protocol::LINE_TERMINATOR;

/// Falha de transporte durante uma sessão.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Erro de I/O na serial: {0}")]
    Io(#[from] std::io::Error),

    #[error("Linha recebida não é UTF-8 válido ({0} bytes)")]
    InvalidUtf8(usize),

    #[error("Linha excedeu {0} bytes sem terminador")]
    LineOverflow(usize),
}

/// Falha ao abrir o dispositivo encontrado.
#[derive(Debug, thiserror::Error)]
#[error("Falha ao abrir {path}: {reason}")]
pub struct OpenError {
    pub path: String,
    pub reason: String,
}

impl OpenError {
    pub fn new(path: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Metade de leitura do canal.
pub trait LineReader: Send {
    /// Poll não bloqueante: `Ok(None)` se ainda não há linha completa.
    fn read_line(&mut self) -> Result<Option<String>, LinkError>;
}

/// Metade de escrita do canal.
pub trait LineWriter: Send {
    /// Escreve `text` seguido de `\n`.
    fn write_line(&mut self, text: &str) -> Result<(), LinkError>;
}

/// Canal aberto, já dividido em leitura e escrita.
pub struct SerialLink {
    pub reader: Box<dyn LineReader>,
    pub writer: Box<dyn LineWriter>,
}

/// Abre o canal para um endpoint descoberto.
pub trait LinkConnector: Send {
    fn open(&self, endpoint: &SerialEndpoint) -> Result<SerialLink, OpenError>;
}

// ──────────────────────────────────────────────
// Framing
// ──────────────────────────────────────────────

/// Acumula bytes recebidos e extrai linhas completas.
///
/// Bytes de uma linha parcial ficam retidos até o terminador chegar.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_line: usize,
}

impl LineBuffer {
    pub fn new(max_line: usize) -> Self {
        Self {
            pending: Vec::with_capacity(256),
            max_line,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Quantidade de bytes aguardando terminador.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Próxima linha completa, sem espaços finais (inclui `\r`).
    pub fn next_line(&mut self) -> Result<Option<String>, LinkError> {
        let Some(pos) = self.pending.iter().position(|&b| b == LINE_TERMINATOR as u8) else {
            if self.pending.len() > self.max_line {
                let size = self.pending.len();
                self.pending.clear();
                return Err(LinkError::LineOverflow(size));
            }
            return Ok(None);
        };

        let raw: Vec<u8> = self.pending.drain(..=pos).collect();
        let size = raw.len();
        let text = String::from_utf8(raw).map_err(|_| LinkError::InvalidUtf8(size))?;
        Ok(Some(text.trim_end().to_string()))
    }
}

/// Formata uma linha para envio.
pub fn frame_line(text: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(text.len() + 1);
    frame.extend_from_slice(text.as_bytes());
    frame.push(LINE_TERMINATOR as u8);
    frame
}
