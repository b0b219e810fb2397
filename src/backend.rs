use crate::error::ToolInvocationError;
use crate::t_args;
use crate::types::{Capture, TestCase, Variant};
use anyhow::{Result, anyhow};
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Flags Goblint needs to print its memory-location summary.
pub const DEFAULT_DIAGNOSTIC_FLAGS: [&str; 3] = ["dbg.uncalled", "allglobs", "printstats"];

/// A fully built analyzer command line. No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Everything about the command line that is fixed for a whole run.
#[derive(Debug, Clone)]
pub struct InvocationTemplate {
    pub tool: PathBuf,
    pub support_dir: PathBuf,
    pub diagnostic_flags: Vec<String>,
}

impl InvocationTemplate {
    pub fn new(tool: impl Into<PathBuf>, support_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            support_dir: support_dir.into(),
            diagnostic_flags: DEFAULT_DIAGNOSTIC_FLAGS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// `<tool> <file> -I <support> --sets mainfun[+] <entry> [--enable <flag>]...`
    pub fn invocation(&self, case: &TestCase, variant: Variant) -> Invocation {
        let mut args: Vec<OsString> = vec![
            case.path().into_os_string(),
            "-I".into(),
            self.support_dir.clone().into_os_string(),
            "--sets".into(),
            "mainfun[+]".into(),
            case.entry_point(variant).into(),
        ];
        for flag in &self.diagnostic_flags {
            args.push("--enable".into());
            args.push(flag.into());
        }
        Invocation {
            program: self.tool.clone(),
            args,
        }
    }
}

/// Runs one analyzer invocation to completion.
pub trait Analyzer {
    fn run(&self, invocation: &Invocation) -> Capture;

    /// Cheap check that the analyzer can be started at all.
    fn validate(&self, tool: &Path) -> Result<()>;
}

/// Runs the analyzer as a child process, capturing stdout then stderr.
#[derive(Debug, Clone, Default)]
pub struct ExternalAnalyzer {
    pub timeout: Option<Duration>,
}

/// How long reader threads may keep going after the analyzer was killed.
/// A grandchild of a wrapper script can hold the pipes open past the kill.
pub const KILL_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    error: Option<io::Error>,
}

/// One pipe, read to EOF on its own thread.
struct Drain {
    captured: Arc<Mutex<Captured>>,
    done: Receiver<()>,
}

impl Drain {
    fn spawn<R: Read + Send + 'static>(stream: Option<R>) -> Self {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&captured);
        thread::spawn(move || {
            if let Some(mut stream) = stream {
                let mut chunk = [0u8; 8192];
                loop {
                    match stream.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => lock(&sink).bytes.extend_from_slice(&chunk[..n]),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            warn!("{}", t_args!("warn-pipe-read", "error" => &e));
                            lock(&sink).error = Some(e);
                            break;
                        }
                    }
                }
            }
            let _ = tx.send(());
        });
        Self { captured, done }
    }

    /// Waits for EOF, or only until `deadline` when one is given, and
    /// returns whatever has been read by then.
    fn finish(self, deadline: Option<Instant>) -> Captured {
        match deadline {
            Some(deadline) => {
                let _ = self.done.recv_timeout(deadline.saturating_duration_since(Instant::now()));
            }
            None => {
                let _ = self.done.recv();
            }
        }
        std::mem::take(&mut *lock(&self.captured))
    }
}

fn lock(captured: &Mutex<Captured>) -> MutexGuard<'_, Captured> {
    captured.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ExternalAnalyzer {
    fn wait(&self, child: &mut Child, program: &str) -> Result<Option<std::process::ExitStatus>, ToolInvocationError> {
        let wait_error = |source| ToolInvocationError::Wait {
            program: program.to_string(),
            source,
        };
        match self.timeout {
            Some(limit) => match child.wait_timeout(limit).map_err(wait_error)? {
                Some(status) => Ok(Some(status)),
                None => {
                    let _ = child.kill();
                    child.wait().map_err(wait_error)?;
                    Ok(None)
                }
            },
            None => child.wait().map(Some).map_err(wait_error),
        }
    }
}

impl Analyzer for ExternalAnalyzer {
    fn run(&self, invocation: &Invocation) -> Capture {
        let program = invocation.program_name();
        debug!("{}", t_args!("debug-invocation", "program" => &program, "args" => format!("{:?}", invocation.args)));

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolInvocationError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Both pipes are read concurrently so a chatty child cannot block on a full pipe.
        let out = Drain::spawn(child.stdout.take());
        let err = Drain::spawn(child.stderr.take());
        let status = self.wait(&mut child, &program);
        let deadline = match status {
            Ok(Some(_)) => None,
            _ => Some(Instant::now() + KILL_GRACE),
        };
        let out = out.finish(deadline);
        let err = err.finish(deadline);
        let mut output = String::from_utf8_lossy(&out.bytes).into_owned();
        output.push_str(&String::from_utf8_lossy(&err.bytes));

        match status? {
            None => Err(ToolInvocationError::TimedOut {
                seconds: self.timeout.map(|d| d.as_secs()).unwrap_or_default(),
                output,
            }),
            Some(status) if !status.success() => Err(ToolInvocationError::NonZeroExit { status, output }),
            Some(_) => match out.error.or(err.error) {
                // Truncated output could hide the marker
                Some(source) => Err(ToolInvocationError::Capture { program, source }),
                None => Ok(output),
            },
        }
    }

    fn validate(&self, tool: &Path) -> Result<()> {
        let mut cmd = Command::new(tool);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match cmd.spawn() {
            // Exit code is irrelevant, only whether it starts.
            Ok(mut child) => child
                .wait()
                .map(|_| ())
                .map_err(|e| anyhow!(t_args!("error-tool-unusable", "tool" => tool.display(), "error" => e))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(anyhow!(t_args!("error-tool-missing", "tool" => tool.display())))
            }
            Err(e) => Err(anyhow!(t_args!("error-tool-unusable", "tool" => tool.display(), "error" => e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case() -> TestCase {
        TestCase {
            dir: PathBuf::from("testcases/CWE366"),
            file_name: "CWE366_Race__global_int_34a.c".into(),
            base: "CWE366_Race__global_int_34".into(),
        }
    }

    #[test]
    fn invocation_follows_the_analyzer_contract() {
        let template = InvocationTemplate::new("../../goblint", "testcasesupport");
        let inv = template.invocation(&case(), Variant::Bad);
        assert_eq!(inv.program, PathBuf::from("../../goblint"));
        let args: Vec<String> = inv.args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "testcases/CWE366/CWE366_Race__global_int_34a.c",
                "-I",
                "testcasesupport",
                "--sets",
                "mainfun[+]",
                "CWE366_Race__global_int_34_bad",
                "--enable",
                "dbg.uncalled",
                "--enable",
                "allglobs",
                "--enable",
                "printstats",
            ]
        );
    }

    struct BrokenPipe {
        sent: bool,
    }

    impl Read for BrokenPipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::other("pipe went away"));
            }
            self.sent = true;
            buf[..5].copy_from_slice(b"Live ");
            Ok(5)
        }
    }

    #[test]
    fn pipe_read_error_is_kept_with_partial_output() {
        let captured = Drain::spawn(Some(BrokenPipe { sent: false })).finish(None);
        assert_eq!(captured.bytes, b"Live ");
        assert!(captured.error.is_some());
    }

    #[test]
    fn finish_gives_up_at_the_deadline() {
        struct Stalled;
        impl Read for Stalled {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                thread::sleep(Duration::from_secs(5));
                Ok(0)
            }
        }
        let started = Instant::now();
        let captured = Drain::spawn(Some(Stalled)).finish(Some(Instant::now() + KILL_GRACE));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(captured.bytes.is_empty());
    }

    #[test]
    fn diagnostic_flags_are_optional() {
        let mut template = InvocationTemplate::new("goblint", "support");
        template.diagnostic_flags.clear();
        let inv = template.invocation(&case(), Variant::Good);
        assert_eq!(inv.args.len(), 6);
        assert_eq!(inv.args[5], OsString::from("CWE366_Race__global_int_34_good"));
    }
}
