//! Descoberta do dispositivo serial do display.
//!
//! A enumeração real das portas fica no binário; aqui ficam a regra de
//! seleção (assinaturas → caminhos de fallback) e o contrato [`DeviceLocator`].

use crate::config::SerialConfig;
use std::path::Path;

/// Baud rate fixo do link com o microcontrolador.
pub const BAUD_RATE: u32 = 115_200;

/// Dispositivo descoberto, pronto para ser aberto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialEndpoint {
    pub path: String,
    pub baud_rate: u32,
}

impl SerialEndpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: BAUD_RATE,
        }
    }
}

/// Descoberta do dispositivo. Consulta pura: nunca abre a porta.
pub trait DeviceLocator: Send {
    fn locate(&self) -> Option<SerialEndpoint>;
}

/// Porta enumerada com o texto descritivo (produto/fabricante USB).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDescriptor {
    pub path: String,
    pub description: String,
}

/// Regra de seleção do dispositivo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMatcher {
    pub signatures: Vec<String>,
    pub fallback_paths: Vec<String>,
}

impl DeviceMatcher {
    pub fn from_config(config: &SerialConfig) -> Self {
        Self {
            signatures: config.device_signatures.clone(),
            fallback_paths: config.fallback_paths.clone(),
        }
    }

    /// Primeira assinatura contida na descrição (substring case-sensitive).
    pub fn matching_signature(&self, description: &str) -> Option<&str> {
        self.signatures
            .iter()
            .map(String::as_str)
            .find(|sig| !sig.is_empty() && description.contains(sig))
    }

    /// Escolhe o caminho do dispositivo.
    ///
    /// Portas são avaliadas na ordem de enumeração; sem nenhuma assinatura
    /// reconhecida, vale o primeiro caminho de fallback para o qual `exists`
    /// retorna `true`.
    pub fn select(&self, ports: &[PortDescriptor], exists: impl Fn(&Path) -> bool) -> Option<String> {
        if let Some(port) = ports
            .iter()
            .find(|p| self.matching_signature(&p.description).is_some())
        {
            return Some(port.path.clone());
        }

        self.fallback_paths
            .iter()
            .find(|path| exists(Path::new(path.as_str())))
            .cloned()
    }
}

/// Porta fixa configurada pelo usuário (`serial.port` / `--port`).
///
/// Ainda confere se o caminho existe, para que um cabo solto volte ao
/// ciclo de backoff em vez de falhar na abertura.
#[derive(Debug, Clone)]
pub struct FixedLocator {
    path: String,
}

impl FixedLocator {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl DeviceLocator for FixedLocator {
    fn locate(&self) -> Option<SerialEndpoint> {
        Path::new(&self.path)
            .exists()
            .then(|| SerialEndpoint::new(self.path.clone()))
    }
}
