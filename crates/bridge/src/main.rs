//! # LCD Bridge
//!
//! Envia métricas do host para o display (ESP32) pela serial a cada 2s e
//! executa os comandos que o display manda de volta (reboot, firewall, SMB…).
//! Reconecta sozinho quando o cabo é removido e recolocado.
//!
//! ## Uso
//! ```bash
//! lcd_bridge                          # Descoberta automática da porta
//! lcd_bridge --port /dev/ttyUSB1      # Porta fixa
//! lcd_bridge --config /etc/lcd.toml   # Outro arquivo de configuração
//! lcd_bridge --list-ports             # Lista portas e sai
//! ```

mod executor;
mod monitor;
mod serial;

use bridge_core::config::AppConfig;
use bridge_core::locator::{DeviceLocator, DeviceMatcher, FixedLocator};
use bridge_core::metrics::TelemetrySampler;
use bridge_core::supervisor::{BridgeSupervisor, stop_channel};
use executor::ProcessExecutor;
use monitor::HostMonitor;
use serial::{SerialPortConnector, UsbSerialLocator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Opções de linha de comando.
#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    port: Option<String>,
    list_ports: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config exige um caminho")?;
                cli.config = Some(PathBuf::from(path));
            }
            "--port" => {
                cli.port = Some(args.next().ok_or("--port exige um caminho")?);
            }
            "--list-ports" => cli.list_ports = true,
            other => return Err(format!("Argumento desconhecido: {other}")),
        }
    }

    Ok(cli)
}

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            error!("{e}");
            eprintln!("Uso: lcd_bridge [--config <arquivo>] [--port <caminho>] [--list-ports]");
            return ExitCode::from(2);
        }
    };

    // ── Carregar config ──
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    if let Some(port) = cli.port {
        config.serial.port = port;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        return ExitCode::from(2);
    }

    let matcher = DeviceMatcher::from_config(&config.serial);
    if cli.list_ports {
        serial::print_port_list(&matcher);
        return ExitCode::SUCCESS;
    }

    // ── Colaboradores ──
    let locator: Box<dyn DeviceLocator> = if config.serial.port.is_empty() {
        Box::new(UsbSerialLocator::new(matcher))
    } else {
        Box::new(FixedLocator::new(config.serial.port.clone()))
    };
    let connector = SerialPortConnector::from_config(&config.serial);
    let monitor = HostMonitor::new(config.metrics.disk_mount.clone());
    let sampler = TelemetrySampler::new(config.metrics.interfaces.clone());
    let executor = Arc::new(ProcessExecutor::new(config.actions.clone()));
    let timing = config.bridge.timing();

    // ── Ctrl-C / SIGTERM ──
    let (trigger, stop) = stop_channel();
    let trigger = Mutex::new(Some(trigger));
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Sinal de parada recebido, encerrando...");
        if let Some(t) = trigger.lock().ok().and_then(|mut guard| guard.take()) {
            t.trigger();
        }
    }) {
        warn!("Não foi possível instalar handler de Ctrl-C: {e}");
    }

    // ── Banner ──
    let port_mode = if config.serial.port.is_empty() {
        format!("auto ({})", config.serial.device_signatures.join(", "))
    } else {
        config.serial.port.clone()
    };
    let action_mode = match (config.actions.dry_run, config.actions.use_sudo) {
        (true, _) => "dry-run",
        (false, true) => "sudo",
        (false, false) => "direto",
    };
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ LCD BRIDGE – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  Porta:      {port_mode}");
    println!("  Baud:       {}", bridge_core::BAUD_RATE);
    println!("  Telemetria: {:.1}s", config.bridge.telemetry_interval_secs);
    println!("  Reconexão:  {:.1}s", config.bridge.reconnect_backoff_secs);
    println!("  Ações:      {action_mode}");
    println!("══════════════════════════════════════════════");
    println!();

    // ── Loop principal ──
    let mut supervisor = BridgeSupervisor::new(
        locator,
        Box::new(connector),
        Box::new(monitor),
        sampler,
        executor,
        timing,
    );
    supervisor.run(&stop);

    info!("Bridge encerrado");
    ExitCode::SUCCESS
}
