use crate::error::{self, Result};
use crate::executor::{CommandExecutor, ExecCommand, ExecOutput, RemoteOptions};
use k3s_model::constants::DEPENDENCY_PACKAGES;
use log::{debug, info};
use snafu::{ensure, ResultExt};
use tokio_util::sync::CancellationToken;

/// Fails with `Cancelled` if an interrupt has arrived. Called before every step.
pub(crate) fn checkpoint(cancel: &CancellationToken, step: &str) -> Result<()> {
    ensure!(!cancel.is_cancelled(), error::CancelledSnafu { step });
    info!("{}", step);
    Ok(())
}

/// Runs `command`, treating a transport failure or a non-zero exit code as fatal.
pub(crate) async fn run_checked<E: CommandExecutor>(
    executor: &E,
    command: ExecCommand,
    action: &str,
) -> Result<ExecOutput> {
    debug!("Running {}", command);
    let output = executor
        .execute(&command)
        .await
        .context(error::TransportSnafu { action })?;
    ensure!(
        output.success(),
        error::ExitCodeSnafu {
            action,
            code: output.exit_code
        }
    );
    Ok(output)
}

/// `apt-get update` followed by `apt-get -y install` of the runtime's OS packages.
pub(crate) async fn install_dependencies<E: CommandExecutor>(
    executor: &E,
    remote: Option<RemoteOptions>,
) -> Result<()> {
    let sudo = remote.is_some();
    let update = with_sudo(
        ExecCommand::new("apt-get")
            .arg("update")
            .remote(remote.clone())
            .stream(),
        sudo,
    );
    run_checked(executor, update, "apt-get update").await?;

    let install = with_sudo(
        ExecCommand::new("apt-get")
            .args(["-y", "install"])
            .args(DEPENDENCY_PACKAGES.iter().copied())
            .remote(remote)
            .stream(),
        sudo,
    );
    run_checked(executor, install, "apt-get install").await?;
    Ok(())
}

fn with_sudo(command: ExecCommand, sudo: bool) -> ExecCommand {
    if sudo {
        command.sudo()
    } else {
        command
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn checkpoint_stops_after_cancel() {
        let cancel = CancellationToken::new();
        assert!(checkpoint(&cancel, "Installing dependencies").is_ok());
        cancel.cancel();
        let error = checkpoint(&cancel, "Installing dependencies").unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::Cancelled);
    }
}
