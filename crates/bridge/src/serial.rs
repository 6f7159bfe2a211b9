//! Porta serial real (`serialport`): descoberta, abertura e I/O por linha.

use bridge_core::config::SerialConfig;
use bridge_core::link::{LineBuffer, LineReader, LineWriter, LinkConnector, LinkError, OpenError, SerialLink, frame_line};
use bridge_core::locator::{DeviceLocator, DeviceMatcher, PortDescriptor, SerialEndpoint};
use serialport::{ClearBuffer, FlowControl, SerialPort, SerialPortInfo, SerialPortType};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

// ──────────────────────────────────────────────
// Descoberta
// ──────────────────────────────────────────────

/// Texto descritivo de uma porta (produto + fabricante USB).
fn describe(info: &SerialPortInfo) -> PortDescriptor {
    let description = match &info.port_type {
        SerialPortType::UsbPort(usb) => [usb.product.as_deref(), usb.manufacturer.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" "),
        SerialPortType::PciPort => "PCI".into(),
        SerialPortType::BluetoothPort => "Bluetooth".into(),
        SerialPortType::Unknown => String::new(),
    };

    PortDescriptor {
        path: info.port_name.clone(),
        description,
    }
}

/// Enumera as portas do host. Falha na enumeração = nenhuma porta.
pub fn enumerate_ports() -> Vec<PortDescriptor> {
    match serialport::available_ports() {
        Ok(ports) => ports.iter().map(describe).collect(),
        Err(e) => {
            debug!("Falha ao enumerar portas seriais: {e}");
            Vec::new()
        }
    }
}

/// Descoberta por assinatura de chip USB-serial, com caminhos de fallback.
pub struct UsbSerialLocator {
    matcher: DeviceMatcher,
}

impl UsbSerialLocator {
    pub fn new(matcher: DeviceMatcher) -> Self {
        Self { matcher }
    }
}

impl DeviceLocator for UsbSerialLocator {
    fn locate(&self) -> Option<SerialEndpoint> {
        let ports = enumerate_ports();
        debug!("{} portas seriais enumeradas", ports.len());
        self.matcher
            .select(&ports, Path::exists)
            .map(SerialEndpoint::new)
    }
}

// ──────────────────────────────────────────────
// Abertura
// ──────────────────────────────────────────────

/// Abre portas com as configurações do link do display.
pub struct SerialPortConnector {
    timeout: Duration,
    max_line_bytes: usize,
}

impl SerialPortConnector {
    pub fn from_config(config: &SerialConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.read_timeout_ms),
            max_line_bytes: config.max_line_bytes,
        }
    }
}

impl LinkConnector for SerialPortConnector {
    fn open(&self, endpoint: &SerialEndpoint) -> Result<SerialLink, OpenError> {
        let path = endpoint.path.as_str();
        let map_err = |e: serialport::Error| OpenError::new(path, e);

        let mut port = serialport::new(path, endpoint.baud_rate)
            .timeout(self.timeout)
            .flow_control(FlowControl::None)
            .open()
            .map_err(map_err)?;

        // DTR/RTS em nível baixo: ESP32 e similares resetam na transição
        port.write_data_terminal_ready(false).map_err(map_err)?;
        port.write_request_to_send(false).map_err(map_err)?;
        port.clear(ClearBuffer::Input).map_err(map_err)?;

        let write_half = port.try_clone().map_err(map_err)?;
        info!("Porta {path} aberta ({} baud, DTR/RTS baixos)", endpoint.baud_rate);

        Ok(SerialLink {
            reader: Box::new(SerialLineReader::new(port, self.max_line_bytes)),
            writer: Box::new(SerialLineWriter { port: write_half }),
        })
    }
}

// ──────────────────────────────────────────────
// Metades de leitura/escrita
// ──────────────────────────────────────────────

struct SerialLineReader {
    port: Box<dyn SerialPort>,
    buffer: LineBuffer,
    chunk: Vec<u8>,
}

impl SerialLineReader {
    fn new(port: Box<dyn SerialPort>, max_line_bytes: usize) -> Self {
        Self {
            port,
            buffer: LineBuffer::new(max_line_bytes),
            chunk: vec![0u8; 512],
        }
    }
}

impl LineReader for SerialLineReader {
    fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        // Linha já completa de um poll anterior
        if let Some(line) = self.buffer.next_line()? {
            return Ok(Some(line));
        }

        let available = self
            .port
            .bytes_to_read()
            .map_err(|e| LinkError::Io(e.into()))? as usize;
        if available == 0 {
            return Ok(None);
        }

        // Lê somente o que já chegou: nunca bloqueia esperando o terminador
        let want = available.min(self.chunk.len());
        let n = self.port.read(&mut self.chunk[..want])?;
        if n == 0 {
            return Err(LinkError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "porta retornou EOF",
            )));
        }
        self.buffer.push(&self.chunk[..n]);
        self.buffer.next_line()
    }
}

struct SerialLineWriter {
    port: Box<dyn SerialPort>,
}

impl LineWriter for SerialLineWriter {
    fn write_line(&mut self, text: &str) -> Result<(), LinkError> {
        self.port.write_all(&frame_line(text))?;
        self.port.flush()?;
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Listagem (--list-ports)
// ──────────────────────────────────────────────

/// Imprime as portas enumeradas e se alguma assinatura casa.
pub fn print_port_list(matcher: &DeviceMatcher) {
    let ports = enumerate_ports();
    if ports.is_empty() {
        warn!("Nenhuma porta serial enumerada");
    }

    println!();
    for port in &ports {
        let mark = match matcher.matching_signature(&port.description) {
            Some(sig) => format!("✓ {sig}"),
            None => "·".to_string(),
        };
        let description = if port.description.is_empty() {
            "n/a"
        } else {
            port.description.as_str()
        };
        println!("  {mark:<14} {:<22} {description}", port.path);
    }
    for path in &matcher.fallback_paths {
        let state = if Path::new(path).exists() { "existe" } else { "ausente" };
        println!("  fallback       {path:<22} {state}");
    }
    println!();
}
