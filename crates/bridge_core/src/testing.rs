//! Dublês de teste compartilhados pelos módulos do crate.

use crate::dispatch::ActionExecutor;
use crate::link::{LineReader, LineWriter, LinkConnector, LinkError, OpenError, SerialLink};
use crate::locator::{DeviceLocator, SerialEndpoint};
use crate::metrics::{HostMetricsProvider, InterfaceAddress, MetricError};
use crate::types::{Action, DiskUsage, RamUsage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Espera `cond` ficar verdadeira até `timeout`.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Contador compartilhado entre o teste e o dublê.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Incrementa e retorna o valor anterior.
    pub fn incr(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    pub fn decr(&self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ──────────────────────────────────────────────
// Executor
// ──────────────────────────────────────────────

/// Registra cada ação recebida, em ordem.
///
/// Com `delay`, cada chamada registra a ação e fica bloqueada, simulando um
/// script demorado.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<Action>>,
    delay: Option<Duration>,
}

impl RecordingExecutor {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Action> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, action: Action) {
        self.calls.lock().unwrap().push(action);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
    }
}

impl ActionExecutor for RecordingExecutor {
    fn reboot(&self) {
        self.record(Action::Reboot);
    }
    fn shutdown(&self) {
        self.record(Action::Shutdown);
    }
    fn reset_network(&self) {
        self.record(Action::ResetNetwork);
    }
    fn firewall_strict(&self) {
        self.record(Action::FirewallStrict);
    }
    fn firewall_maintenance(&self) {
        self.record(Action::FirewallMaintenance);
    }
    fn start_file_sharing(&self) {
        self.record(Action::StartFileSharing);
    }
    fn stop_file_sharing(&self) {
        self.record(Action::StopFileSharing);
    }
}

// ──────────────────────────────────────────────
// Métricas
// ──────────────────────────────────────────────

/// Provider com valores fixos; `None` simula métrica indisponível.
#[derive(Debug, Clone)]
pub struct FakeMetrics {
    pub cpu: Option<f32>,
    pub memory: Option<RamUsage>,
    pub disk: Option<DiskUsage>,
    pub temperature: Option<f32>,
    pub addresses: Option<Vec<InterfaceAddress>>,
    pub uptime: Option<u64>,
    pub refreshes: usize,
}

fn iface(name: &str, addr: &str) -> InterfaceAddress {
    InterfaceAddress {
        name: name.into(),
        addr: addr.parse().unwrap(),
    }
}

impl FakeMetrics {
    pub fn healthy() -> Self {
        Self {
            cpu: Some(23.5),
            memory: Some(RamUsage {
                total_mb: 3794,
                used_mb: 812,
                percent: 21.4,
            }),
            disk: Some(DiskUsage {
                total_gb: 58,
                used_gb: 9,
                percent: 16.5,
            }),
            temperature: Some(51.0),
            addresses: Some(vec![
                iface("lo", "127.0.0.1"),
                iface("wlan0", "192.168.4.1"),
                iface("wlan0", "fe80::dea6:32ff:fe01:2"),
                iface("eth0", "10.0.0.12"),
                iface("docker0", "172.17.0.1"),
            ]),
            uptime: Some(7200),
            refreshes: 0,
        }
    }

    pub fn broken() -> Self {
        Self {
            cpu: None,
            memory: None,
            disk: None,
            temperature: None,
            addresses: None,
            uptime: None,
            refreshes: 0,
        }
    }
}

fn available<T: Clone>(value: &Option<T>, metric: &'static str) -> Result<T, MetricError> {
    value
        .clone()
        .ok_or_else(|| MetricError::unavailable(metric, "sensor ausente"))
}

impl HostMetricsProvider for FakeMetrics {
    fn refresh(&mut self) {
        self.refreshes += 1;
    }
    fn cpu_percent(&mut self) -> Result<f32, MetricError> {
        available(&self.cpu, "cpu")
    }
    fn memory(&mut self) -> Result<RamUsage, MetricError> {
        available(&self.memory, "ram")
    }
    fn disk(&mut self) -> Result<DiskUsage, MetricError> {
        available(&self.disk, "disk")
    }
    fn temperature_celsius(&mut self) -> Result<f32, MetricError> {
        available(&self.temperature, "temp")
    }
    fn interface_addresses(&mut self) -> Result<Vec<InterfaceAddress>, MetricError> {
        available(&self.addresses, "net")
    }
    fn uptime_seconds(&mut self) -> Result<u64, MetricError> {
        available(&self.uptime, "uptime")
    }
}

// ──────────────────────────────────────────────
// Descoberta
// ──────────────────────────────────────────────

/// Locator roteirizado: encontra `path` nas primeiras `limit` chamadas.
#[derive(Debug)]
pub struct ScriptedLocator {
    path: Option<String>,
    limit: Option<usize>,
    calls: Counter,
    call_times: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedLocator {
    pub fn absent() -> Self {
        Self {
            path: None,
            limit: None,
            calls: Counter::default(),
            call_times: Arc::default(),
        }
    }

    pub fn present(path: &str) -> Self {
        Self {
            path: Some(path.into()),
            limit: None,
            calls: Counter::default(),
            call_times: Arc::default(),
        }
    }

    pub fn present_for(path: &str, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::present(path)
        }
    }

    pub fn calls(&self) -> Counter {
        self.calls.clone()
    }

    /// Instante de cada chamada a `locate()`.
    pub fn call_times(&self) -> Arc<Mutex<Vec<Instant>>> {
        self.call_times.clone()
    }
}

impl DeviceLocator for ScriptedLocator {
    fn locate(&self) -> Option<SerialEndpoint> {
        self.call_times.lock().unwrap().push(Instant::now());
        let index = self.calls.incr();
        if self.limit.is_some_and(|limit| index >= limit) {
            return None;
        }
        self.path.as_deref().map(SerialEndpoint::new)
    }
}

// ──────────────────────────────────────────────
// Canal
// ──────────────────────────────────────────────

/// Roteiro de uma sessão aberta pelo [`ScriptedConnector`].
#[derive(Debug, Clone, Default)]
pub struct SessionScript {
    /// Linhas entregues pelo leitor, uma por poll
    pub inbound: Vec<String>,
    /// Leitor falha no primeiro poll
    pub fail_read: bool,
    /// Escritor falha depois de N escritas bem-sucedidas
    pub fail_write_after: Option<usize>,
}

#[derive(Debug, Default)]
struct ConnectorShared {
    scripts: Mutex<VecDeque<SessionScript>>,
    failing_opens: AtomicUsize,
    sent: Arc<Mutex<Vec<String>>>,
    write_failures: Arc<Mutex<Vec<Instant>>>,
    opens: Counter,
    live_halves: Counter,
    released: Counter,
    violations: Counter,
}

/// Connector roteirizado. Sessões sem roteiro ficam saudáveis e silenciosas.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    shared: Arc<ConnectorShared>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_session(&self, script: SessionScript) {
        self.shared.scripts.lock().unwrap().push_back(script);
    }

    pub fn fail_next_opens(&self, count: usize) {
        self.shared.failing_opens.store(count, Ordering::SeqCst);
    }

    pub fn opens(&self) -> Counter {
        self.shared.opens.clone()
    }

    /// Metades de canal já liberadas (drop).
    pub fn released(&self) -> Counter {
        self.shared.released.clone()
    }

    /// Aberturas feitas com metades da sessão anterior ainda vivas.
    pub fn violations(&self) -> Counter {
        self.shared.violations.clone()
    }

    pub fn sent_lines(&self) -> Arc<Mutex<Vec<String>>> {
        self.shared.sent.clone()
    }

    /// Instante de cada escrita que falhou.
    pub fn write_failures(&self) -> Arc<Mutex<Vec<Instant>>> {
        self.shared.write_failures.clone()
    }
}

impl LinkConnector for ScriptedConnector {
    fn open(&self, endpoint: &SerialEndpoint) -> Result<SerialLink, OpenError> {
        self.shared.opens.incr();

        let failing = self.shared.failing_opens.load(Ordering::SeqCst);
        if failing > 0 {
            self.shared.failing_opens.store(failing - 1, Ordering::SeqCst);
            return Err(OpenError::new(&endpoint.path, "Permission denied"));
        }

        if self.shared.live_halves.get() > 0 {
            self.shared.violations.incr();
        }

        let script = self.shared.scripts.lock().unwrap().pop_front().unwrap_or_default();
        self.shared.live_halves.incr();
        self.shared.live_halves.incr();

        Ok(SerialLink {
            reader: Box::new(MockReader {
                inbound: script.inbound.into(),
                fail: script.fail_read,
                shared: self.shared.clone(),
            }),
            writer: Box::new(MockWriter {
                fail_after: script.fail_write_after,
                writes: 0,
                shared: self.shared.clone(),
            }),
        })
    }
}

struct MockReader {
    inbound: VecDeque<String>,
    fail: bool,
    shared: Arc<ConnectorShared>,
}

impl LineReader for MockReader {
    fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        if self.fail {
            return Err(LinkError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            )));
        }
        Ok(self.inbound.pop_front())
    }
}

impl Drop for MockReader {
    fn drop(&mut self) {
        self.shared.live_halves.decr();
        self.shared.released.incr();
    }
}

struct MockWriter {
    fail_after: Option<usize>,
    writes: usize,
    shared: Arc<ConnectorShared>,
}

impl LineWriter for MockWriter {
    fn write_line(&mut self, text: &str) -> Result<(), LinkError> {
        if self.fail_after.is_some_and(|n| self.writes >= n) {
            self.shared.write_failures.lock().unwrap().push(Instant::now());
            return Err(LinkError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "write failed",
            )));
        }
        self.writes += 1;
        self.shared.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

impl Drop for MockWriter {
    fn drop(&mut self) {
        self.shared.live_halves.decr();
        self.shared.released.incr();
    }
}
