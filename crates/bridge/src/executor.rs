//! Executor de ações via processos do sistema.
//!
//! Cada ação roda o argv configurado (com `sudo` opcional) e espera o
//! processo terminar para registrar o status. O core já chama o executor em
//! uma thread por ação.

use bridge_core::config::ActionsConfig;
use bridge_core::dispatch::ActionExecutor;
use bridge_core::types::Action;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{error, info, warn};

/// Executa as ações do display como subprocessos.
pub struct ProcessExecutor {
    config: ActionsConfig,
}

impl ProcessExecutor {
    pub fn new(config: ActionsConfig) -> Self {
        Self { config }
    }

    /// argv completo da ação, já com `sudo` se configurado.
    fn command_line(&self, action: Action) -> Vec<String> {
        let base = match action {
            Action::Reboot => &self.config.reboot,
            Action::Shutdown => &self.config.shutdown,
            Action::ResetNetwork => &self.config.reset_network,
            Action::FirewallStrict => &self.config.fw_strict,
            Action::FirewallMaintenance => &self.config.fw_maint,
            Action::StartFileSharing => &self.config.start_smb,
            Action::StopFileSharing => &self.config.stop_smb,
        };
        if base.is_empty() {
            return Vec::new();
        }

        let mut argv = Vec::with_capacity(base.len() + 1);
        if self.config.use_sudo {
            argv.push("sudo".to_string());
        }
        argv.extend(base.iter().cloned());
        argv
    }

    /// Executa a ação e espera o término. `None` se nada rodou.
    fn launch(&self, action: Action) -> Option<ExitStatus> {
        let argv = self.command_line(action);
        let Some((program, args)) = argv.split_first() else {
            warn!("Ação {action} desabilitada (comando vazio)");
            return None;
        };

        let line = argv.join(" ");
        if self.config.dry_run {
            info!("[dry-run] {action}: {line}");
            return None;
        }

        let mut child = match Command::new(program).args(args).stdin(Stdio::null()).spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Falha ao executar {action} ({line}): {e}");
                return None;
            }
        };
        info!("Ação {action} iniciada (pid {}): {line}", child.id());

        match child.wait() {
            Ok(status) => {
                if status.success() {
                    info!("Ação {action} concluída");
                } else {
                    warn!("Ação {action} terminou com {status}");
                }
                Some(status)
            }
            Err(e) => {
                error!("Erro ao aguardar ação {action}: {e}");
                None
            }
        }
    }
}

impl ActionExecutor for ProcessExecutor {
    fn reboot(&self) {
        self.launch(Action::Reboot);
    }
    fn shutdown(&self) {
        self.launch(Action::Shutdown);
    }
    fn reset_network(&self) {
        self.launch(Action::ResetNetwork);
    }
    fn firewall_strict(&self) {
        self.launch(Action::FirewallStrict);
    }
    fn firewall_maintenance(&self) {
        self.launch(Action::FirewallMaintenance);
    }
    fn start_file_sharing(&self) {
        self.launch(Action::StartFileSharing);
    }
    fn stop_file_sharing(&self) {
        self.launch(Action::StopFileSharing);
    }
}
