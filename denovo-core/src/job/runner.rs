use crate::domain::JobRow;
use crate::job::cancel::CancelToken;
use crate::job::progress::ProgressListener;
use crate::job::status::JobStatus;
use crate::tool::Invocation;
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const POLL: Duration = Duration::from_millis(25);
const STDERR_TAIL: usize = 20;

/// One external process over one chunk.
#[derive(Debug)]
pub struct Job {
    pub id: usize,
    pub chunk: PathBuf,
    pub invocation: Invocation,
    status: JobStatus,
    error: Option<String>,
    spectra_seen: u64,
}

enum Wait {
    Exited(ExitStatus),
    Canceled,
    Failed(std::io::Error),
}

impl Job {
    pub fn new(id: usize, chunk: &Path, invocation: Invocation) -> Self {
        Self {
            id,
            chunk: chunk.to_path_buf(),
            invocation,
            status: JobStatus::Waiting,
            error: None,
            spectra_seen: 0,
        }
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn spectra_seen(&self) -> u64 {
        self.spectra_seen
    }

    pub fn output(&self) -> &Path {
        &self.invocation.output
    }

    pub fn row(&self) -> JobRow {
        JobRow {
            id: self.id,
            chunk: self.chunk.clone(),
            status: self.status.to_string(),
            spectra_seen: self.spectra_seen,
            error: self.error.clone(),
        }
    }

    fn set_status(&mut self, next: JobStatus) {
        if self.status.can_become(&next) {
            self.status = next;
        } else {
            warn!(job = self.id, from = %self.status, to = %next, "ignoring status change");
        }
    }

    fn fail(&mut self, message: String) {
        warn!(job = self.id, chunk = %self.chunk.display(), "{message}");
        self.error = Some(message);
        self.set_status(JobStatus::Error);
    }

    /// Run the process to completion, cancellation or failure. Never panics on
    /// process errors; the outcome is recorded in the job status.
    pub fn run(&mut self, cancel: &CancelToken, listener: &dyn ProgressListener) -> &JobStatus {
        self.launch(cancel, listener);
        listener.job_finished(self.id, &self.status);
        &self.status
    }

    fn launch(&mut self, cancel: &CancelToken, listener: &dyn ProgressListener) {
        if cancel.is_canceled() {
            self.set_status(JobStatus::Canceled);
            return;
        }
        for (path, text) in &self.invocation.support_files {
            if let Err(e) = fs::write(path, text) {
                let msg = format!("could not write {}: {e}", path.display());
                self.fail(msg);
                return;
            }
        }
        let capture = match &self.invocation.capture {
            Some(p) => match File::create(p) {
                Ok(f) => Some(BufWriter::new(f)),
                Err(e) => {
                    let msg = format!("could not create {}: {e}", p.display());
                    self.fail(msg);
                    return;
                }
            },
            None => None,
        };

        debug!(job = self.id, cmd = %self.invocation.command_line(), "spawning");
        let mut cmd = Command::new(&self.invocation.program);
        cmd.args(&self.invocation.args)
            .current_dir(&self.invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a kill also reaches whatever a wrapper script started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let spawned = cmd.spawn();
        let mut child = match spawned {
            Ok(c) => c,
            Err(e) => {
                let msg = format!(
                    "failed to start {}: {e}",
                    self.invocation.program.display()
                );
                self.fail(msg);
                return;
            }
        };
        self.set_status(JobStatus::Running);
        listener.job_started(self.id, &self.chunk);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let marker = self.invocation.progress_marker;
        let id = self.id;

        let (waited, pumped, tail) = thread::scope(|s| {
            let pump = s.spawn(move || match stdout {
                Some(out) => pump_stdout(out, capture, marker, cancel, listener, id),
                None => Ok(0),
            });
            let drain = s.spawn(move || stderr.map(drain_stderr).unwrap_or_default());
            let waited = supervise(&mut child, cancel);
            let pumped = pump
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("output reader panicked")));
            let tail = drain.join().unwrap_or_default();
            (waited, pumped, tail)
        });

        if let Ok(n) = &pumped {
            self.spectra_seen = *n;
        }

        // A cancel request wins over whatever the killed process reported.
        if cancel.is_canceled() {
            self.set_status(JobStatus::Canceled);
            return;
        }
        match waited {
            Wait::Canceled => self.set_status(JobStatus::Canceled),
            Wait::Failed(e) => self.fail(format!("waiting for process failed: {e}")),
            Wait::Exited(st) => {
                if let Err(e) = pumped {
                    self.fail(format!("reading tool output failed: {e}"));
                } else if !st.success() {
                    self.fail(exit_message(st, &tail));
                } else if !self.invocation.output.exists() {
                    let msg = format!(
                        "tool exited cleanly but wrote no {}",
                        self.invocation.output.display()
                    );
                    self.fail(msg);
                } else {
                    self.set_status(JobStatus::Finished);
                }
            }
        }
    }
}

fn exit_message(st: ExitStatus, tail: &[String]) -> String {
    let code = st
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    if tail.is_empty() {
        format!("exited with status {code}")
    } else {
        format!("exited with status {code}: {}", tail.join("; "))
    }
}

/// Poll the child until it exits or cancellation is requested.
fn supervise(child: &mut Child, cancel: &CancelToken) -> Wait {
    loop {
        if cancel.is_canceled() {
            kill(child);
            return Wait::Canceled;
        }
        match child.try_wait() {
            Ok(Some(st)) => return Wait::Exited(st),
            Ok(None) => thread::sleep(POLL),
            Err(e) => {
                kill(child);
                return Wait::Failed(e);
            }
        }
    }
}

fn kill(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;
        if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
            debug!(error = %e, "killpg failed (group may have exited)");
        }
    }
    if let Err(e) = child.kill() {
        debug!(error = %e, "kill failed (process may have exited)");
    }
    let _ = child.wait();
}

/// Copy stdout line by line into `capture`, ticking `listener` on every marker line.
///
/// Neither write nor read errors stop the pipe from being drained, so the
/// child never blocks on a full pipe.
fn pump_stdout<R: Read>(
    out: R,
    mut capture: Option<BufWriter<File>>,
    marker: Option<&str>,
    cancel: &CancelToken,
    listener: &dyn ProgressListener,
    id: usize,
) -> std::io::Result<u64> {
    let mut r = BufReader::new(out);
    let mut line = Vec::with_capacity(256);
    let mut seen = 0u64;
    let mut write_err: Option<std::io::Error> = None;
    loop {
        if cancel.is_canceled() {
            break;
        }
        line.clear();
        match r.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                let _ = std::io::copy(&mut r, &mut std::io::sink());
                return Err(e);
            }
        }
        if let Some(m) = marker {
            if line.starts_with(m.as_bytes()) {
                seen += 1;
                listener.spectrum_done(id);
            }
        }
        if write_err.is_none() {
            if let Some(w) = capture.as_mut() {
                if let Err(e) = w.write_all(&line) {
                    write_err = Some(e);
                }
            }
        }
    }
    if let Some(mut w) = capture {
        if write_err.is_none() {
            if let Err(e) = w.flush() {
                write_err = Some(e);
            }
        }
    }
    match write_err {
        Some(e) => Err(e),
        None => Ok(seen),
    }
}

fn drain_stderr<R: Read>(err: R) -> Vec<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL);
    for line in BufReader::new(err).split(b'\n') {
        let Ok(line) = line else { break };
        let text = String::from_utf8_lossy(&line).trim().to_string();
        if text.is_empty() {
            continue;
        }
        if tail.len() == STDERR_TAIL {
            tail.pop_front();
        }
        tail.push_back(text);
    }
    tail.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::progress::NoProgress;

    fn invocation(program: &str, out: &Path) -> Invocation {
        Invocation {
            program: PathBuf::from(program),
            args: Vec::new(),
            working_dir: std::env::temp_dir(),
            capture: Some(out.to_path_buf()),
            output: out.to_path_buf(),
            support_files: Vec::new(),
            progress_marker: None,
        }
    }

    #[test]
    fn pre_canceled_job_never_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("r.out");
        let mut job = Job::new(1, Path::new("c.mgf"), invocation("/no/such/tool", &out));
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(job.run(&cancel, &NoProgress), &JobStatus::Canceled);
        assert!(job.error().is_none());
        assert!(!out.exists());
    }

    #[test]
    fn spawn_failure_is_an_error_with_message() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("r.out");
        let mut job = Job::new(2, Path::new("c.mgf"), invocation("/no/such/tool", &out));
        assert_eq!(job.run(&CancelToken::new(), &NoProgress), &JobStatus::Error);
        assert!(job.error().unwrap().contains("failed to start /no/such/tool"));
        assert_eq!(job.row().status, "error");
    }

    #[test]
    fn exit_message_includes_stderr_tail() {
        let tail = vec!["bad model".to_string(), "abort".to_string()];
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            let st = ExitStatus::from_raw(3 << 8);
            assert_eq!(exit_message(st, &tail), "exited with status 3: bad model; abort");
        }
    }

    struct FailsOnce<'a> {
        failed: bool,
        rest: &'a mut std::io::Cursor<Vec<u8>>,
    }

    impl Read for FailsOnce<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(std::io::Error::other("broken pipe read"));
            }
            self.rest.read(buf)
        }
    }

    #[test]
    fn read_error_still_drains_the_pipe() {
        let mut rest = std::io::Cursor::new(b">> 0 0 a\n>> 0 1 b\n".repeat(1000));
        let len = rest.get_ref().len() as u64;
        let out = FailsOnce {
            failed: false,
            rest: &mut rest,
        };
        let err = pump_stdout(out, None, Some(">>"), &CancelToken::new(), &NoProgress, 1)
            .unwrap_err();
        assert_eq!(err.to_string(), "broken pipe read");
        assert_eq!(rest.position(), len);
    }

    #[test]
    fn stderr_tail_is_bounded() {
        let text: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let tail = drain_stderr(text.as_bytes());
        assert_eq!(tail.len(), STDERR_TAIL);
        assert_eq!(tail.last().map(String::as_str), Some("line 49"));
    }
}
