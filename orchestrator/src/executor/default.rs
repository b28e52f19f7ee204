use super::{
    CommandExecutor, ConnectSnafu, ExecCommand, ExecOutput, ExecResult, RemoteSnafu, SpawnSnafu,
    StdinSnafu, UnavailableSnafu, WaitSnafu,
};
use log::{debug, trace};
use openssh::{KnownHosts, Session, SessionBuilder};
use snafu::{OptionExt, ResultExt};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Runs local commands with `tokio::process` and remote commands over a multiplexed ssh session.
/// One session is opened per destination and reused for every later command to that host.
#[derive(Default)]
pub struct DefaultExecutor {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl DefaultExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    async fn session(&self, host: &str, allow_unknown_hosts: bool) -> ExecResult<Arc<Session>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(host) {
            return Ok(Arc::clone(session));
        }
        debug!("Opening ssh session to {}", host);
        let known_hosts = if allow_unknown_hosts {
            KnownHosts::Accept
        } else {
            KnownHosts::Strict
        };
        let session = Arc::new(
            SessionBuilder::default()
                .known_hosts_check(known_hosts)
                .connect_mux(host)
                .await
                .context(ConnectSnafu { host })?,
        );
        sessions.insert(host.to_string(), Arc::clone(&session));
        Ok(session)
    }

    async fn execute_local(&self, command: &ExecCommand) -> ExecResult<ExecOutput> {
        let argv = command.argv();
        let (program, args) = argv.split_first().context(UnavailableSnafu {
            command: command.to_string(),
            message: "empty command",
        })?;
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(output_stdio(command))
            .stderr(Stdio::inherit())
            .spawn()
            .context(SpawnSnafu {
                command: command.to_string(),
            })?;

        if let (Some(input), Some(mut stdin)) = (&command.stdin, child.stdin.take()) {
            stdin.write_all(input).await.context(StdinSnafu {
                command: command.to_string(),
            })?;
        }

        let output = child.wait_with_output().await.context(WaitSnafu {
            command: command.to_string(),
        })?;
        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn execute_remote(
        &self,
        command: &ExecCommand,
        host: &str,
        allow_unknown_hosts: bool,
    ) -> ExecResult<ExecOutput> {
        let session = self.session(host, allow_unknown_hosts).await?;
        let argv = command.argv();
        let (program, args) = argv.split_first().context(UnavailableSnafu {
            command: command.to_string(),
            message: "empty command",
        })?;
        let mut remote = session.command(program);
        remote
            .args(args)
            .stdin(if command.stdin.is_some() {
                openssh::Stdio::piped()
            } else {
                openssh::Stdio::null()
            })
            .stdout(if command.capture_output {
                openssh::Stdio::piped()
            } else if command.stream_output {
                openssh::Stdio::inherit()
            } else {
                openssh::Stdio::null()
            })
            .stderr(openssh::Stdio::inherit());
        let mut child = remote.spawn().await.context(RemoteSnafu {
            command: command.to_string(),
            host,
        })?;

        if let (Some(input), Some(mut stdin)) = (&command.stdin, child.stdin().take()) {
            stdin.write_all(input).await.context(StdinSnafu {
                command: command.to_string(),
            })?;
        }

        let output = child.wait_with_output().await.context(RemoteSnafu {
            command: command.to_string(),
            host,
        })?;
        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

fn output_stdio(command: &ExecCommand) -> Stdio {
    if command.capture_output {
        Stdio::piped()
    } else if command.stream_output {
        Stdio::inherit()
    } else {
        Stdio::null()
    }
}

#[async_trait::async_trait]
impl CommandExecutor for DefaultExecutor {
    async fn execute(&self, command: &ExecCommand) -> ExecResult<ExecOutput> {
        trace!("Executing: {}", command);
        match &command.remote {
            Some(remote) => {
                self.execute_remote(command, &remote.host, remote.allow_unknown_hosts)
                    .await
            }
            None => self.execute_local(command).await,
        }
    }
}
