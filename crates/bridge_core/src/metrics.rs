//! Amostragem de telemetria.
//!
//! [`HostMetricsProvider`] é a fonte das métricas (sysinfo no binário, fakes
//! nos testes). O [`TelemetrySampler`] monta o snapshot tolerando falhas
//! individuais: uma métrica indisponível vira valor padrão, nunca aborta.

use crate::protocol::{ProtocolError, encode_snapshot};
use crate::types::{DiskUsage, RamUsage, TelemetrySnapshot};
use std::collections::BTreeMap;
use std::net::IpAddr;
use tracing::debug;

/// Métrica que não pôde ser lida neste ciclo.
#[derive(Debug, thiserror::Error)]
#[error("Métrica `{metric}` indisponível: {reason}")]
pub struct MetricError {
    pub metric: &'static str,
    pub reason: String,
}

impl MetricError {
    pub fn unavailable(metric: &'static str, reason: impl Into<String>) -> Self {
        Self {
            metric,
            reason: reason.into(),
        }
    }
}

/// Endereço de uma interface de rede do host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub addr: IpAddr,
}

/// Fonte das métricas do host.
pub trait HostMetricsProvider: Send {
    /// Atualiza contadores internos antes de uma amostragem.
    fn refresh(&mut self) {}

    fn cpu_percent(&mut self) -> Result<f32, MetricError>;
    fn memory(&mut self) -> Result<RamUsage, MetricError>;
    fn disk(&mut self) -> Result<DiskUsage, MetricError>;
    fn temperature_celsius(&mut self) -> Result<f32, MetricError>;
    /// Todos os endereços conhecidos; o filtro fica no sampler.
    fn interface_addresses(&mut self) -> Result<Vec<InterfaceAddress>, MetricError>;
    fn uptime_seconds(&mut self) -> Result<u64, MetricError>;
}

/// Monta snapshots a partir de um [`HostMetricsProvider`].
#[derive(Debug, Clone)]
pub struct TelemetrySampler {
    interfaces: Vec<String>,
}

impl TelemetrySampler {
    /// `interfaces` é a allow-list do campo `net`.
    pub fn new(interfaces: Vec<String>) -> Self {
        Self { interfaces }
    }

    /// Coleta um snapshot completo.
    pub fn sample(&self, provider: &mut dyn HostMetricsProvider) -> TelemetrySnapshot {
        provider.refresh();

        TelemetrySnapshot {
            cpu_percent: finite_or_zero(or_default(provider.cpu_percent())).clamp(0.0, 100.0),
            ram: or_default(provider.memory()),
            disk: or_default(provider.disk()),
            temperature_celsius: finite_or_zero(or_default(provider.temperature_celsius())),
            network: self.filter_network(or_default(provider.interface_addresses())),
            uptime_seconds: or_default(provider.uptime_seconds()),
        }
    }

    /// Coleta e serializa em uma linha.
    pub fn sample_line(&self, provider: &mut dyn HostMetricsProvider) -> Result<String, ProtocolError> {
        let snapshot = self.sample(provider);
        debug!(
            "Snapshot: CPU {:.1}% {:.0}°C | RAM {:.0}% | Disco {:.0}% | {} IPs | up {}s",
            snapshot.cpu_percent,
            snapshot.temperature_celsius,
            snapshot.ram.percent,
            snapshot.disk.percent,
            snapshot.network.len(),
            snapshot.uptime_seconds
        );
        encode_snapshot(&snapshot)
    }

    /// Mantém só IPv4 de interfaces da allow-list (último endereço vence).
    fn filter_network(&self, addrs: Vec<InterfaceAddress>) -> BTreeMap<String, String> {
        let mut net = BTreeMap::new();
        for entry in addrs {
            if !entry.addr.is_ipv4() || !self.interfaces.iter().any(|i| *i == entry.name) {
                continue;
            }
            net.insert(entry.name, entry.addr.to_string());
        }
        net
    }
}

/// NaN/∞ viram 0: o JSON não tem representação para eles.
fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

fn or_default<T: Default>(result: Result<T, MetricError>) -> T {
    result.unwrap_or_else(|e| {
        debug!("{e}; usando valor padrão");
        T::default()
    })
}
