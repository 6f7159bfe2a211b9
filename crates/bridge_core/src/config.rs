//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável cobre a porta serial, os
//! intervalos do supervisor, a coleta de métricas e os comandos de cada ação.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuração da porta serial e da descoberta do dispositivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Caminho fixo da porta (vazio = descoberta automática)
    pub port: String,
    /// Assinaturas de chips USB-serial, em ordem de prioridade
    pub device_signatures: Vec<String>,
    /// Caminhos testados quando nenhuma assinatura casa
    pub fallback_paths: Vec<String>,
    /// Timeout de leitura/escrita da porta (ms)
    pub read_timeout_ms: u64,
    /// Tamanho máximo de uma linha recebida sem `\n`
    pub max_line_bytes: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            device_signatures: vec!["CP210".into(), "CH340".into(), "USB Serial".into()],
            fallback_paths: vec!["/dev/ttyUSB0".into(), "/dev/ttyACM0".into()],
            read_timeout_ms: 1000,
            max_line_bytes: 4096,
        }
    }
}

/// Intervalos do supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Intervalo de polling da leitura (ms)
    pub poll_interval_ms: u64,
    /// Intervalo de envio de telemetria (s)
    pub telemetry_interval_secs: f64,
    /// Espera entre tentativas de descoberta/conexão (s)
    pub reconnect_backoff_secs: f64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            telemetry_interval_secs: 2.0,
            reconnect_backoff_secs: 5.0,
        }
    }
}

impl BridgeConfig {
    /// Converte os intervalos em [`BridgeTiming`].
    ///
    /// Valores que não viram [`Duration`] (negativos, NaN, ∞) caem no padrão;
    /// [`AppConfig::validate`] já os rejeita antes.
    pub fn timing(&self) -> BridgeTiming {
        let defaults = BridgeConfig::default();
        BridgeTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            telemetry_interval: secs_or(self.telemetry_interval_secs, defaults.telemetry_interval_secs),
            reconnect_backoff: secs_or(self.reconnect_backoff_secs, defaults.reconnect_backoff_secs),
        }
    }
}

fn secs_or(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_else(|_| Duration::from_secs_f64(fallback))
}

/// Intervalos já convertidos, usados pelo supervisor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeTiming {
    pub poll_interval: Duration,
    pub telemetry_interval: Duration,
    pub reconnect_backoff: Duration,
}

/// Limites aceitos pelo `validate` (s).
const TELEMETRY_RANGE: (f64, f64) = (0.1, 60.0);
const BACKOFF_RANGE: (f64, f64) = (0.1, 3600.0);

fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
    value.is_finite() && value >= min && value <= max
}

impl Default for BridgeTiming {
    fn default() -> Self {
        BridgeConfig::default().timing()
    }
}

/// Coleta de métricas do host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Interfaces reportadas no campo `net`
    pub interfaces: Vec<String>,
    /// Ponto de montagem do disco reportado
    pub disk_mount: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interfaces: vec!["wlan0".into(), "wlan1".into(), "eth0".into(), "usb0".into()],
            disk_mount: "/".into(),
        }
    }
}

/// Comandos executados para cada ação recebida (argv; vazio = desabilitada).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Apenas registra o comando, sem executar
    pub dry_run: bool,
    /// Prefixa cada comando com `sudo`
    pub use_sudo: bool,
    pub reboot: Vec<String>,
    pub shutdown: Vec<String>,
    pub reset_network: Vec<String>,
    pub fw_strict: Vec<String>,
    pub fw_maint: Vec<String>,
    pub start_smb: Vec<String>,
    pub stop_smb: Vec<String>,
}

const SCRIPTS_DIR: &str = "/home/pi/pi4-travelserver/scripts";

fn script(name: &str) -> Vec<String> {
    vec![format!("{SCRIPTS_DIR}/{name}")]
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            use_sudo: true,
            reboot: vec!["reboot".into()],
            shutdown: vec!["shutdown".into(), "-h".into(), "now".into()],
            reset_network: script("full_network_reset.sh"),
            fw_strict: script("firewall_strict.sh"),
            fw_maint: script("firewall_maintenance.sh"),
            start_smb: script("start_fileserver.sh"),
            stop_smb: script("stop_fileserver.sh"),
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub bridge: BridgeConfig,
    pub metrics: MetricsConfig,
    pub actions: ActionsConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.bridge.poll_interval_ms == 0 {
            errors.push("Intervalo de polling não pode ser 0".into());
        }
        if !in_range(self.bridge.telemetry_interval_secs, TELEMETRY_RANGE) {
            errors.push(format!(
                "Intervalo de telemetria inválido: {} ({}–{})",
                self.bridge.telemetry_interval_secs, TELEMETRY_RANGE.0, TELEMETRY_RANGE.1
            ));
        }
        if !in_range(self.bridge.reconnect_backoff_secs, BACKOFF_RANGE) {
            errors.push(format!(
                "Backoff de reconexão inválido: {} ({}–{})",
                self.bridge.reconnect_backoff_secs, BACKOFF_RANGE.0, BACKOFF_RANGE.1
            ));
        }
        if self.serial.read_timeout_ms == 0 {
            errors.push("Timeout da serial não pode ser 0".into());
        }
        if self.serial.max_line_bytes < 64 {
            errors.push(format!(
                "max_line_bytes muito pequeno: {} (mínimo 64)",
                self.serial.max_line_bytes
            ));
        }
        if self.serial.port.is_empty()
            && self.serial.device_signatures.is_empty()
            && self.serial.fallback_paths.is_empty()
        {
            errors.push("Sem porta fixa, assinaturas ou caminhos de fallback: nada a descobrir".into());
        }

        errors
    }
}
