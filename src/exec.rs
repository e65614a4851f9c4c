use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Description of one external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
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

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Key used by the mock adapter to match expectations.
    fn key(&self) -> String {
        let mut key = self.program.clone();
        for arg in &self.args {
            key.push(' ');
            key.push_str(arg);
        }
        key
    }
}

/// Port for external process execution. The core never spawns processes
/// directly; the production adapter shells out, the mock adapter serves
/// canned output for tests.
pub trait Commander {
    /// Run a command and return its stdout. Non-zero exit is an error.
    fn output(&self, cmd: &CommandLine) -> io::Result<String>;

    /// Run a command and return stdout and stderr interleaved. Non-zero
    /// exit is an error carrying the captured output.
    fn combined_output(&self, cmd: &CommandLine) -> io::Result<String>;

    /// Feed the stdout of `first` into the stdin of `second` and return
    /// the stdout of `second`, with the trailing newline stripped.
    fn pipe(&self, first: &CommandLine, second: &CommandLine) -> io::Result<String>;
}

/// Production adapter spawning real processes.
pub struct ShellCommander;

impl ShellCommander {
    fn build(cmd: &CommandLine) -> Command {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        if let Some(dir) = &cmd.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl Commander for ShellCommander {
    fn output(&self, cmd: &CommandLine) -> io::Result<String> {
        let output = Self::build(cmd).output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "{} exited with {}: {}",
                cmd.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn combined_output(&self, cmd: &CommandLine) -> io::Result<String> {
        let output = Self::build(cmd).output()?;
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "{} exited with {}: {}",
                cmd.program,
                output.status,
                text.trim()
            )));
        }
        Ok(text)
    }

    fn pipe(&self, first: &CommandLine, second: &CommandLine) -> io::Result<String> {
        let mut producer = Self::build(first).stdout(Stdio::piped()).spawn()?;
        let upstream = producer
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("failed to capture stdout of piped command"))?;
        let output = Self::build(second)
            .stdin(Stdio::from(upstream))
            .output()?;
        producer.wait()?;
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }
}

/// In-memory test adapter. Expectations are keyed on the full command
/// line (`program arg1 arg2 ...`, piped commands joined with ` | `);
/// unexpected commands fail the call. Invocations are recorded so tests
/// can assert what was (not) run.
#[derive(Default)]
pub struct MockCommander {
    outputs: RefCell<HashMap<String, String>>,
    failures: RefCell<HashMap<String, String>>,
    calls: RefCell<Vec<String>>,
}

impl MockCommander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register canned stdout for a command line.
    pub fn expect(&self, command_line: impl Into<String>, output: impl Into<String>) {
        self.outputs
            .borrow_mut()
            .insert(command_line.into(), output.into());
    }

    /// Register a failure for a command line.
    pub fn fail(&self, command_line: impl Into<String>, message: impl Into<String>) {
        self.failures
            .borrow_mut()
            .insert(command_line.into(), message.into());
    }

    /// All command lines seen so far, in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn respond(&self, key: String) -> io::Result<String> {
        self.calls.borrow_mut().push(key.clone());
        if let Some(message) = self.failures.borrow().get(&key) {
            return Err(io::Error::other(message.clone()));
        }
        match self.outputs.borrow().get(&key) {
            Some(output) => Ok(output.clone()),
            None => Err(io::Error::other(format!("unexpected command: {}", key))),
        }
    }
}

impl Commander for MockCommander {
    fn output(&self, cmd: &CommandLine) -> io::Result<String> {
        self.respond(cmd.key())
    }

    fn combined_output(&self, cmd: &CommandLine) -> io::Result<String> {
        self.respond(cmd.key())
    }

    fn pipe(&self, first: &CommandLine, second: &CommandLine) -> io::Result<String> {
        self.respond(format!("{} | {}", first.key(), second.key()))
    }
}
