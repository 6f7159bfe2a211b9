//! Host Monitor – métricas do host via `sysinfo`.
//!
//! Cada métrica é consultada de forma independente: um sensor ausente vira
//! [`MetricError`] e o sampler do core substitui pelo valor padrão.

use bridge_core::metrics::{HostMetricsProvider, InterfaceAddress, MetricError};
use bridge_core::types::{DiskUsage, RamUsage};
use std::path::PathBuf;
use sysinfo::{Components, CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};
use tracing::debug;

const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * 1024 * 1024;

/// Sensores de temperatura preferidos, em ordem (Raspberry Pi, Intel).
const PREFERRED_SENSORS: [&str; 2] = ["cpu_thermal", "coretemp"];

/// Monitor de métricas do host.
pub struct HostMonitor {
    sys: System,
    disks: Disks,
    networks: Networks,
    components: Components,
    disk_mount: PathBuf,
}

impl HostMonitor {
    pub fn new(disk_mount: impl Into<PathBuf>) -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        // Primeira leitura para inicializar contadores de CPU
        sys.refresh_cpu_usage();

        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            components: Components::new_with_refreshed_list(),
            disk_mount: disk_mount.into(),
        }
    }
}

impl HostMetricsProvider for HostMonitor {
    fn refresh(&mut self) {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.networks.refresh(true);
        self.components.refresh(true);
        self.disks.refresh(true);
    }

    fn cpu_percent(&mut self) -> Result<f32, MetricError> {
        Ok(self.sys.global_cpu_usage())
    }

    fn memory(&mut self) -> Result<RamUsage, MetricError> {
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(MetricError::unavailable("ram", "total de memória zerado"));
        }
        let used = self.sys.used_memory();

        Ok(RamUsage {
            total_mb: total / MB,
            used_mb: used / MB,
            percent: percent(used, total),
        })
    }

    fn disk(&mut self) -> Result<DiskUsage, MetricError> {
        let disk = self
            .disks
            .iter()
            .find(|d| d.mount_point() == self.disk_mount.as_path())
            .ok_or_else(|| {
                MetricError::unavailable("disk", format!("{} não montado", self.disk_mount.display()))
            })?;

        let total = disk.total_space();
        let used = total.saturating_sub(disk.available_space());

        Ok(DiskUsage {
            total_gb: total / GB,
            used_gb: used / GB,
            percent: percent(used, total),
        })
    }

    fn temperature_celsius(&mut self) -> Result<f32, MetricError> {
        let readings: Vec<(String, f32)> = self
            .components
            .iter()
            .filter_map(|c| c.temperature().map(|t| (c.label().to_string(), t)))
            .collect();

        cpu_temperature(&readings)
            .ok_or_else(|| MetricError::unavailable("temp", "nenhum sensor de CPU encontrado"))
    }

    fn interface_addresses(&mut self) -> Result<Vec<InterfaceAddress>, MetricError> {
        let mut addrs = Vec::new();
        for (name, data) in self.networks.iter() {
            for net in data.ip_networks() {
                addrs.push(InterfaceAddress {
                    name: name.clone(),
                    addr: net.addr,
                });
            }
        }
        debug!("{} endereços de rede encontrados", addrs.len());
        Ok(addrs)
    }

    fn uptime_seconds(&mut self) -> Result<u64, MetricError> {
        Ok(System::uptime())
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let pct = used as f64 / total as f64 * 100.0;
    // Uma casa decimal, como o display mostra
    ((pct * 10.0).round() / 10.0) as f32
}

/// Escolhe a temperatura da CPU entre as leituras `(label, °C)`.
///
/// Sensores preferidos vencem; sem eles, vale a maior leitura plausível de
/// um label com cara de CPU.
fn cpu_temperature(readings: &[(String, f32)]) -> Option<f32> {
    let plausible = |t: f32| t.is_finite() && t > 0.0 && t < 150.0;

    for sensor in PREFERRED_SENSORS {
        if let Some((_, t)) = readings
            .iter()
            .find(|(label, t)| label.contains(sensor) && plausible(*t))
        {
            return Some(*t);
        }
    }

    readings
        .iter()
        .filter(|(label, t)| {
            let label = label.to_lowercase();
            plausible(*t)
                && (label.contains("cpu")
                    || label.contains("tctl")
                    || label.contains("tdie")
                    || label.contains("package")
                    || label.contains("core"))
        })
        .map(|(_, t)| *t)
        .reduce(f32::max)
}
