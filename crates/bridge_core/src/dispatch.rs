//! Decodificação e despacho dos comandos recebidos.
//!
//! Cada ação roda em uma thread própria (`action-<nome>`): um comando lento
//! ou travado nunca segura a leitura dos próximos nem a parada do bridge.

use crate::protocol::decode_command;
use crate::types::Action;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Executor das ações privilegiadas do host.
///
/// As chamadas chegam fora da thread de leitura e podem bloquear até a ação
/// terminar.
pub trait ActionExecutor: Send + Sync {
    fn reboot(&self);
    fn shutdown(&self);
    fn reset_network(&self);
    fn firewall_strict(&self);
    fn firewall_maintenance(&self);
    fn start_file_sharing(&self);
    fn stop_file_sharing(&self);
}

impl Action {
    /// Chama o método do executor correspondente à ação.
    pub fn invoke(self, executor: &dyn ActionExecutor) {
        match self {
            Action::Reboot => executor.reboot(),
            Action::Shutdown => executor.shutdown(),
            Action::ResetNetwork => executor.reset_network(),
            Action::FirewallStrict => executor.firewall_strict(),
            Action::FirewallMaintenance => executor.firewall_maintenance(),
            Action::StartFileSharing => executor.start_file_sharing(),
            Action::StopFileSharing => executor.stop_file_sharing(),
        }
    }
}

/// Resolve uma linha recebida na ação correspondente.
///
/// Linhas inválidas e ações desconhecidas viram `None`, só com log.
pub fn decode_action(line: &str) -> Option<Action> {
    let command = match decode_command(line) {
        Ok(command) => command,
        Err(e) => {
            warn!("Linha ignorada ({e}): {line}");
            return None;
        }
    };

    let Some(action) = Action::from_name(&command.action) else {
        debug!("Ação desconhecida ignorada: {:?}", command.action);
        return None;
    };

    if !command.payload.is_empty() {
        debug!("Campos extras de {action} ignorados: {:?}", command.payload);
    }
    Some(action)
}

/// Processa uma linha recebida do microcontrolador.
///
/// Retorna assim que a ação foi disparada; a execução segue em uma thread
/// separada.
pub fn dispatch(line: &str, executor: &Arc<dyn ActionExecutor>) -> Option<Action> {
    let action = decode_action(line)?;
    info!("Comando recebido: {action}");

    let executor = Arc::clone(executor);
    let spawned = std::thread::Builder::new()
        .name(format!("action-{action}"))
        .spawn(move || action.invoke(executor.as_ref()));

    if let Err(e) = spawned {
        error!("Sem thread para executar {action}: {e}");
    }
    Some(action)
}
