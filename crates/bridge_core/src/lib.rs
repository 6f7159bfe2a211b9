//! # Bridge Core
//!
//! Núcleo do bridge serial entre o host e o microcontrolador do display LCD:
//! telemetria do host sai a cada tick, comandos JSON chegam do display e
//! disparam ações privilegiadas.
//!
//! ## Módulos
//! - [`types`] – Snapshot de telemetria, comandos e tabela de ações
//! - [`protocol`] – Frames JSON de uma linha
//! - [`config`] – Configuração unificada via TOML
//! - [`locator`] – Descoberta do dispositivo serial
//! - [`link`] – Contratos do canal serial e framing por linha
//! - [`metrics`] – Fonte de métricas e amostragem tolerante a falhas
//! - [`dispatch`] – Executor de ações e despacho de comandos
//! - [`supervisor`] – Máquina de estados de conexão/reconexão

pub mod types;
pub mod protocol;
pub mod config;
pub mod locator;
pub mod link;
pub mod metrics;
pub mod dispatch;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports convenientes
pub use types::{Action, Command, TelemetrySnapshot};
pub use protocol::{decode_command, encode_snapshot};
pub use config::{AppConfig, BridgeTiming};
pub use locator::{BAUD_RATE, DeviceLocator, SerialEndpoint};
pub use link::{LineReader, LineWriter, LinkConnector, LinkError, OpenError, SerialLink};
pub use metrics::{HostMetricsProvider, TelemetrySampler};
pub use dispatch::{ActionExecutor, decode_action, dispatch};
pub use supervisor::{BridgeSupervisor, ConnectionState, StopSignal, StopTrigger, stop_channel};
