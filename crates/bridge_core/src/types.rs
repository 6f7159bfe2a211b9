//! Definição de tipos trocados com o microcontrolador do display.
//!
//! Os nomes dos campos JSON são fixos (o firmware lê `cpu`, `ram.percent`,
//! `net.wlan0`…); os nomes Rust são descritivos e mapeados via `serde(rename)`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ──────────────────────────────────────────────
// RAM
// ──────────────────────────────────────────────

/// Uso de memória RAM.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RamUsage {
    /// Memória total (MB)
    #[serde(rename = "total")]
    pub total_mb: u64,
    /// Memória usada (MB)
    #[serde(rename = "used")]
    pub used_mb: u64,
    /// Percentual de uso (0–100%)
    pub percent: f32,
}

// ──────────────────────────────────────────────
// Disco
// ──────────────────────────────────────────────

/// Uso do disco monitorado (por padrão a partição `/`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiskUsage {
    /// Espaço total (GB)
    #[serde(rename = "total")]
    pub total_gb: u64,
    /// Espaço usado (GB)
    #[serde(rename = "used")]
    pub used_gb: u64,
    /// Percentual de uso (0–100%)
    pub percent: f32,
}

// ──────────────────────────────────────────────
// Snapshot completo
// ──────────────────────────────────────────────

/// Snapshot de telemetria enviado a cada tick de escrita.
///
/// Valor imutável: é criado, serializado em uma linha e descartado.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySnapshot {
    /// Uso total da CPU (0–100%)
    #[serde(rename = "cpu")]
    pub cpu_percent: f32,
    pub ram: RamUsage,
    pub disk: DiskUsage,
    /// Temperatura da CPU (°C), 0 quando o sensor não existe
    #[serde(rename = "temp")]
    pub temperature_celsius: f32,
    /// Interface → endereço IPv4 (somente interfaces da allow-list)
    #[serde(rename = "net")]
    pub network: BTreeMap<String, String>,
    /// Tempo desde o boot (s)
    #[serde(rename = "uptime")]
    pub uptime_seconds: u64,
}

// ──────────────────────────────────────────────
// Comandos
// ──────────────────────────────────────────────

/// Comando decodificado de uma linha recebida do microcontrolador.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Nome da ação (`reboot`, `fw_strict`…), ainda não validado
    pub action: String,
    /// Demais campos do objeto JSON
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Ações conhecidas pelo bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Reboot,
    Shutdown,
    ResetNetwork,
    FirewallStrict,
    FirewallMaintenance,
    StartFileSharing,
    StopFileSharing,
}

impl Action {
    /// Todas as ações, na ordem da tabela do protocolo.
    pub const ALL: [Action; 7] = [
        Action::Reboot,
        Action::Shutdown,
        Action::ResetNetwork,
        Action::FirewallStrict,
        Action::FirewallMaintenance,
        Action::StartFileSharing,
        Action::StopFileSharing,
    ];

    /// Nome usado no campo `action` do protocolo.
    pub fn name(self) -> &'static str {
        match self {
            Action::Reboot => "reboot",
            Action::Shutdown => "shutdown",
            Action::ResetNetwork => "reset_network",
            Action::FirewallStrict => "fw_strict",
            Action::FirewallMaintenance => "fw_maint",
            Action::StartFileSharing => "start_smb",
            Action::StopFileSharing => "stop_smb",
        }
    }

    /// Busca exata (case-sensitive) pelo nome do protocolo.
    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.name() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
