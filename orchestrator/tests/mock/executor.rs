use super::Journal;
use k3s_orchestrator::{CommandExecutor, ExecCommand, ExecError, ExecOutput, ExecResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub(crate) const IP_OUTPUT: &str = concat!(
    "2: eth0    inet 10.0.0.5/24 brd 10.0.0.255 scope global eth0\\",
    "       valid_lft forever preferred_lft forever\n",
);
pub(crate) const VERSION_OUTPUT: &str =
    "k3s version v1.28.5+k3s1 (5b2d1271)\ngo version go1.20.12\n";

/// What a command should do when it runs.
#[derive(Clone, Debug)]
pub(crate) enum Behavior {
    Output(ExecOutput),
    Unreachable,
}

/// Records every command and answers with canned results keyed by the program's file name.
/// Unknown programs succeed with no output.
pub(crate) struct MockExecutor {
    journal: Journal,
    commands: Mutex<Vec<ExecCommand>>,
    behaviors: Mutex<HashMap<String, Behavior>>,
    cancel_on: Mutex<Option<(String, CancellationToken)>>,
}

impl MockExecutor {
    pub(crate) fn new(journal: Journal) -> Self {
        let mut behaviors = HashMap::new();
        behaviors.insert("ip".to_string(), output(IP_OUTPUT, 0));
        behaviors.insert("k3s".to_string(), output(VERSION_OUTPUT, 0));
        Self {
            journal,
            commands: Mutex::default(),
            behaviors: Mutex::new(behaviors),
            cancel_on: Mutex::default(),
        }
    }

    /// Make `program` print `stdout` and exit with `exit_code`.
    pub(crate) fn respond(&self, program: &str, stdout: &str, exit_code: i32) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(program.to_string(), output(stdout, exit_code));
    }

    /// Make `program` fail to run at all.
    pub(crate) fn unreachable(&self, program: &str) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(program.to_string(), Behavior::Unreachable);
    }

    /// Cancel `token` while `program` is running. The program itself still completes.
    pub(crate) fn cancel_during(&self, program: &str, token: CancellationToken) {
        *self.cancel_on.lock().unwrap() = Some((program.to_string(), token));
    }

    pub(crate) fn commands(&self) -> Vec<ExecCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// Commands whose program file name is `program`.
    pub(crate) fn commands_named(&self, program: &str) -> Vec<ExecCommand> {
        self.commands()
            .into_iter()
            .filter(|c| program_name(c) == program)
            .collect()
    }

    pub(crate) fn remote_commands(&self) -> Vec<ExecCommand> {
        self.commands()
            .into_iter()
            .filter(|c| c.remote.is_some())
            .collect()
    }

    /// The local installer invocation, recognised by its flags since its path is random.
    pub(crate) fn installer_command(&self) -> Option<ExecCommand> {
        self.commands()
            .into_iter()
            .find(|c| c.args.iter().any(|a| a == "--token"))
    }
}

pub(crate) fn program_name(command: &ExecCommand) -> String {
    Path::new(&command.program)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn output(stdout: &str, exit_code: i32) -> Behavior {
    Behavior::Output(ExecOutput {
        stdout: stdout.to_string(),
        exit_code,
    })
}

#[async_trait::async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute(&self, command: &ExecCommand) -> ExecResult<ExecOutput> {
        let name = program_name(command);
        self.journal.record(format!("exec {}", name));
        self.commands.lock().unwrap().push(command.clone());

        if let Some((program, token)) = self.cancel_on.lock().unwrap().as_ref() {
            if *program == name {
                token.cancel();
            }
        }

        let behavior = self.behaviors.lock().unwrap().get(&name).cloned();
        match behavior {
            Some(Behavior::Output(output)) => Ok(ExecOutput {
                stdout: if command.capture_output {
                    output.stdout
                } else {
                    String::new()
                },
                exit_code: output.exit_code,
            }),
            Some(Behavior::Unreachable) => Err(ExecError::Unavailable {
                command: command.to_string(),
                message: "connection refused".to_string(),
            }),
            None => Ok(ExecOutput::default()),
        }
    }
}
