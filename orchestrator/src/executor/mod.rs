/*!

The `executor` module runs programs on the local host or, over ssh, on a remote host.

!*/

mod default;

pub use default::DefaultExecutor;
use snafu::Snafu;
use std::fmt::{Display, Formatter};

/// Arguments that follow these flags are secrets and are masked when a command is displayed.
const SECRET_FLAGS: &[&str] = &["--token"];

/// Where and how a remote command is run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RemoteOptions {
    /// An ssh destination, e.g. `ssh://root@10.0.0.7`.
    pub host: String,
    /// Accept host keys that are not in `known_hosts`.
    pub allow_unknown_hosts: bool,
}

/// A single program invocation.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ExecCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Environment passed through `env`, so it survives `sudo`.
    pub env: Vec<(String, String)>,
    pub remote: Option<RemoteOptions>,
    pub sudo: bool,
    /// Connect the command's stdout and stderr to ours.
    pub stream_output: bool,
    /// Collect the command's stdout into `ExecOutput::stdout`.
    pub capture_output: bool,
    /// Bytes written to the command's stdin.
    pub stdin: Option<Vec<u8>>,
}

impl ExecCommand {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn remote(mut self, remote: Option<RemoteOptions>) -> Self {
        self.remote = remote;
        self
    }

    pub fn sudo(mut self) -> Self {
        self.sudo = true;
        self
    }

    pub fn stream(mut self) -> Self {
        self.stream_output = true;
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture_output = true;
        self
    }

    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    /// The full argument vector, including the `sudo` and `env` prefixes.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + self.env.len() + 3);
        if self.sudo {
            argv.push("sudo".to_string());
        }
        if !self.env.is_empty() {
            argv.push("env".to_string());
            argv.extend(self.env.iter().map(|(k, v)| format!("{}={}", k, v)));
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// The host this command runs on, `None` for the local host.
    pub fn remote_host(&self) -> Option<&str> {
        self.remote.as_ref().map(|remote| remote.host.as_str())
    }
}

impl Display for ExecCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut mask_next = false;
        let argv: Vec<String> = self
            .argv()
            .into_iter()
            .map(|arg| {
                let shown = if mask_next { "***".to_string() } else { arg.clone() };
                mask_next = SECRET_FLAGS.contains(&arg.as_str());
                shown
            })
            .collect();
        write!(f, "{}", argv.join(" "))?;
        if let Some(host) = self.remote_host() {
            write!(f, " (on {})", host)?;
        }
        Ok(())
    }
}

/// What a finished command produced.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ExecOutput {
    /// Empty unless the command was run with `capture_output`.
    pub stdout: String,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

pub type ExecResult<T> = std::result::Result<T, ExecError>;

/// The command could not be started or its remote connection could not be established.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExecError {
    #[snafu(display("Unable to connect to '{}': {}", host, source))]
    Connect {
        host: String,
        source: openssh::Error,
    },

    #[snafu(display("Unable to run '{}' on '{}': {}", command, host, source))]
    Remote {
        command: String,
        host: String,
        source: openssh::Error,
    },

    #[snafu(display("Unable to start '{}': {}", command, source))]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("Unable to write stdin of '{}': {}", command, source))]
    Stdin {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("'{}' is unavailable: {}", command, message))]
    Unavailable { command: String, message: String },

    #[snafu(display("Unable to wait for '{}': {}", command, source))]
    Wait {
        command: String,
        source: std::io::Error,
    },
}

/// `CommandExecutor` runs [`ExecCommand`]s and reports their exit code.
///
/// This is provided as a trait so that mock implementations can be injected into the orchestrators
/// for testing purposes. In practice you will use the [`DefaultExecutor`].
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion. A non-zero exit code is not an error at this level; an error
    /// means the command never ran.
    async fn execute(&self, command: &ExecCommand) -> ExecResult<ExecOutput>;
}
