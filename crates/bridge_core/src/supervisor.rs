//! Supervisor do bridge: descoberta, conexão, loops e reconexão.
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected
//!       ▲              │  ▲           │
//!       │   (backoff)  └──┘           │ LinkError
//!       └─────────────────────────────┘
//!
//! qualquer estado ──(stop)──► Stopped
//! ```
//!
//! Enquanto `Connected`, duas threads com escopo rodam sobre as metades do
//! canal: leitura (poll → dispatcher) e escrita (tick → snapshot). Ações
//! disparadas pelo dispatcher rodam fora dessas threads. A primeira
//! que encontra um [`LinkError`] o reporta; o supervisor muda o estado,
//! cancela a sessão e só reconecta depois que as duas threads terminaram.

use crate::config::BridgeTiming;
use crate::dispatch::{ActionExecutor, dispatch};
use crate::link::{LineReader, LineWriter, LinkConnector, LinkError, SerialLink};
use crate::locator::DeviceLocator;
use crate::metrics::{HostMetricsProvider, TelemetrySampler};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, select, tick};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

// ──────────────────────────────────────────────
// Estado da conexão
// ──────────────────────────────────────────────

/// Estado do supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Stopped = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Stopped,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// Leitura compartilhada do estado. Só o supervisor escreve.
#[derive(Debug, Clone)]
pub struct ConnectionStatus(Arc<AtomicU8>);

impl ConnectionStatus {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ConnectionState::Disconnected as u8)))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    fn set(&self, state: ConnectionState) {
        let previous = ConnectionState::from_u8(self.0.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            debug!("Estado: {previous} → {state}");
        }
    }
}

// ──────────────────────────────────────────────
// Sinal de parada
// ──────────────────────────────────────────────

/// Cria um par gatilho/sinal de parada.
///
/// O sinal dispara quando o gatilho é consumido (ou descartado): todos os
/// clones do [`StopSignal`] veem o canal desconectado ao mesmo tempo.
pub fn stop_channel() -> (StopTrigger, StopSignal) {
    let (tx, rx) = bounded::<()>(0);
    (StopTrigger(tx), StopSignal(rx))
}

/// Lado que dispara a parada.
#[derive(Debug)]
pub struct StopTrigger(Sender<()>);

impl StopTrigger {
    pub fn trigger(self) {
        drop(self.0);
    }
}

/// Lado observado pelas threads.
#[derive(Debug, Clone)]
pub struct StopSignal(Receiver<()>);

impl StopSignal {
    pub fn is_triggered(&self) -> bool {
        matches!(self.0.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Espera até `timeout`; retorna `true` se a parada foi disparada.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(self.0.recv_timeout(timeout), Err(RecvTimeoutError::Disconnected))
    }

    fn receiver(&self) -> &Receiver<()> {
        &self.0
    }
}

// ──────────────────────────────────────────────
// Supervisor
// ──────────────────────────────────────────────

/// Thread que detectou a falha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTask {
    Read,
    Write,
}

#[derive(Debug)]
struct LinkFault {
    task: LinkTask,
    error: LinkError,
}

/// Como uma sessão conectada terminou.
#[derive(Debug)]
enum SessionEnd {
    Stopped,
    Lost(LinkTask, LinkError),
}

/// Coordena descoberta, conexão e os loops de leitura/escrita.
pub struct BridgeSupervisor {
    locator: Box<dyn DeviceLocator>,
    connector: Box<dyn LinkConnector>,
    metrics: Box<dyn HostMetricsProvider>,
    sampler: TelemetrySampler,
    executor: Arc<dyn ActionExecutor>,
    timing: BridgeTiming,
    status: ConnectionStatus,
}

impl BridgeSupervisor {
    pub fn new(
        locator: Box<dyn DeviceLocator>,
        connector: Box<dyn LinkConnector>,
        metrics: Box<dyn HostMetricsProvider>,
        sampler: TelemetrySampler,
        executor: Arc<dyn ActionExecutor>,
        timing: BridgeTiming,
    ) -> Self {
        Self {
            locator,
            connector,
            metrics,
            sampler,
            executor,
            timing,
            status: ConnectionStatus::new(),
        }
    }

    /// Handle de leitura do estado (para logs/monitoramento e testes).
    pub fn status(&self) -> ConnectionStatus {
        self.status.clone()
    }

    /// Roda até `stop` disparar. Nenhuma falha de transporte encerra o loop.
    pub fn run(&mut self, stop: &StopSignal) {
        info!("Supervisor iniciado");

        while !stop.is_triggered() {
            self.status.set(ConnectionState::Connecting);

            let Some(endpoint) = self.locator.locate() else {
                warn!(
                    "Display não encontrado. Nova tentativa em {:.1}s...",
                    self.timing.reconnect_backoff.as_secs_f64()
                );
                if stop.wait_timeout(self.timing.reconnect_backoff) {
                    break;
                }
                continue;
            };

            let link = match self.connector.open(&endpoint) {
                Ok(link) => link,
                Err(e) => {
                    error!("{e}. Nova tentativa em {:.1}s...", self.timing.reconnect_backoff.as_secs_f64());
                    if stop.wait_timeout(self.timing.reconnect_backoff) {
                        break;
                    }
                    continue;
                }
            };

            self.status.set(ConnectionState::Connected);
            info!("Conectado ao display em {} ({} baud)", endpoint.path, endpoint.baud_rate);

            match self.run_session(link, stop) {
                SessionEnd::Stopped => break,
                SessionEnd::Lost(task, e) => {
                    warn!("Conexão perdida em {} (thread de {}): {e}", endpoint.path, task_name(task));
                }
            }
        }

        self.status.set(ConnectionState::Stopped);
        info!("Supervisor parado");
    }

    /// Roda os dois loops até falha ou parada. Retorna só depois que ambos
    /// terminaram e o canal foi liberado.
    fn run_session(&mut self, link: SerialLink, stop: &StopSignal) -> SessionEnd {
        let SerialLink { reader, writer } = link;
        let Self {
            metrics,
            sampler,
            executor,
            timing,
            status,
            ..
        } = self;
        let status: &ConnectionStatus = status;
        let executor: &Arc<dyn ActionExecutor> = executor;
        let metrics: &mut dyn HostMetricsProvider = metrics.as_mut();
        let sampler: &TelemetrySampler = sampler;
        let BridgeTiming {
            poll_interval,
            telemetry_interval,
            ..
        } = *timing;

        let (cancel_trigger, cancel) = stop_channel();
        let (fault_tx, fault_rx) = bounded::<LinkFault>(2);

        std::thread::scope(|scope| {
            let read_ctx = LoopContext {
                status,
                stop,
                cancel: &cancel,
                faults: fault_tx.clone(),
            };
            let write_ctx = LoopContext {
                status,
                stop,
                cancel: &cancel,
                faults: fault_tx,
            };

            let spawned_reader = std::thread::Builder::new()
                .name("serial-read".into())
                .spawn_scoped(scope, move || read_loop(reader, executor, read_ctx, poll_interval));
            let spawned_writer = std::thread::Builder::new()
                .name("serial-write".into())
                .spawn_scoped(scope, move || {
                    write_loop(writer, sampler, metrics, write_ctx, telemetry_interval)
                });

            if let Err(e) = spawned_reader.as_ref().and(spawned_writer.as_ref()) {
                error!("Falha ao criar threads da sessão: {e}");
                status.set(ConnectionState::Disconnected);
                cancel_trigger.trigger();
                return SessionEnd::Lost(LinkTask::Read, LinkError::Io(std::io::Error::other(e.to_string())));
            }

            let end = select! {
                recv(fault_rx) -> fault => match fault {
                    Ok(LinkFault { task, error }) => SessionEnd::Lost(task, error),
                    // Threads saíram sem falha: só acontece na parada
                    Err(_) if stop.is_triggered() => SessionEnd::Stopped,
                    Err(_) => SessionEnd::Lost(
                        LinkTask::Read,
                        LinkError::Io(std::io::Error::other("threads da sessão encerradas")),
                    ),
                },
                recv(stop.receiver()) -> _ => SessionEnd::Stopped,
            };

            // Estado muda antes do cancelamento: nenhuma thread faz mais I/O
            status.set(match end {
                SessionEnd::Stopped => ConnectionState::Stopped,
                SessionEnd::Lost(..) => ConnectionState::Disconnected,
            });
            cancel_trigger.trigger();
            end
        })
    }
}

fn task_name(task: LinkTask) -> &'static str {
    match task {
        LinkTask::Read => "leitura",
        LinkTask::Write => "escrita",
    }
}

// ──────────────────────────────────────────────
// Loops da sessão
// ──────────────────────────────────────────────

struct LoopContext<'a> {
    status: &'a ConnectionStatus,
    stop: &'a StopSignal,
    cancel: &'a StopSignal,
    faults: Sender<LinkFault>,
}

impl LoopContext<'_> {
    fn report(&self, task: LinkTask, error: LinkError) {
        // Receptor pode já ter saído se a outra thread falhou primeiro
        let _ = self.faults.try_send(LinkFault { task, error });
    }
}

fn read_loop(
    mut reader: Box<dyn LineReader>,
    executor: &Arc<dyn ActionExecutor>,
    ctx: LoopContext<'_>,
    poll: Duration,
) {
    debug!("Loop de leitura iniciado");
    let ticker = tick(poll);

    'session: loop {
        loop {
            if !ctx.status.is_connected() {
                break 'session;
            }
            match reader.read_line() {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        continue;
                    }
                    debug!("[RAW] {line}");
                    dispatch(&line, executor);
                }
                Ok(None) => break,
                Err(e) => {
                    ctx.report(LinkTask::Read, e);
                    break 'session;
                }
            }
        }

        select! {
            recv(ctx.stop.receiver()) -> _ => break,
            recv(ctx.cancel.receiver()) -> _ => break,
            recv(ticker) -> _ => {}
        }
    }
    debug!("Loop de leitura encerrado");
}

fn write_loop(
    mut writer: Box<dyn LineWriter>,
    sampler: &TelemetrySampler,
    metrics: &mut dyn HostMetricsProvider,
    ctx: LoopContext<'_>,
    interval: Duration,
) {
    debug!("Loop de escrita iniciado");
    let ticker = tick(interval);

    loop {
        let line = match sampler.sample_line(metrics) {
            Ok(line) => Some(line),
            Err(e) => {
                error!("Erro ao serializar snapshot: {e}");
                None
            }
        };

        if !ctx.status.is_connected() {
            break;
        }
        if let Some(line) = line {
            if let Err(e) = writer.write_line(&line) {
                ctx.report(LinkTask::Write, e);
                break;
            }
        }

        select! {
            recv(ctx.stop.receiver()) -> _ => break,
            recv(ctx.cancel.receiver()) -> _ => break,
            recv(ticker) -> _ => {}
        }
    }
    debug!("Loop de escrita encerrado");
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
