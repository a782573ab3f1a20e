//! # Process Runner
//!
//! Drives one tracing run from spawn to terminal state.
//!
//! ## Flow
//!
//! 1. Spawn `<elevation> <binary> -e <program>` in its own process group
//! 2. Write the elevation credential to stdin, then close it
//! 3. `select!` over: deadline, eviction signal, next stdout line
//!    (and, once stdout hits EOF, process exit)
//! 4. On deadline or eviction: SIGTERM the group, wait the termination grace,
//!    SIGKILL if still alive
//! 5. Collect stderr (drained concurrently the whole time); anything beyond
//!    the credential prompt echo fails the run
//!
//! Every fault ends up in the record. Nothing is returned to the caller.
//! Memory per run is bounded: stdout lines are cut at [`MAX_LINE_BYTES`] and
//! only the first [`MAX_STDERR_BYTES`] of stderr are kept.

use log::{debug, info, warn};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout};

use super::record::{ExecutionRecord, RecordWriter};
use crate::domain::{ExecutionError, ExecutionId};
use crate::launch::{
    send_credential, signal_process_group, spawn_piped, CredentialSupplier, ProcessLauncher,
};

/// Line appended when the deadline fires
pub const TIMEOUT_LINE: &str = "[Execution timed out]";

/// Start of the prompt `sudo -S` echoes to stderr
const CREDENTIAL_PROMPT: &str = "[sudo] password";

/// Longest stdout line kept; the rest of the line is dropped
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Appended to a line cut at [`MAX_LINE_BYTES`]
pub const LINE_TRUNCATED_SUFFIX: &str = " [line truncated]";

/// Stderr kept for the error message; the rest is read and discarded
pub const MAX_STDERR_BYTES: u64 = 64 * 1024;

/// How the stdout loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Exited,
    TimedOut,
    Evicted,
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    launcher: Arc<dyn ProcessLauncher>,
    credentials: Arc<dyn CredentialSupplier>,
    termination_grace: Duration,
}

impl ProcessRunner {
    #[must_use]
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        credentials: Arc<dyn CredentialSupplier>,
        termination_grace: Duration,
    ) -> Self {
        Self {
            launcher,
            credentials,
            termination_grace,
        }
    }

    /// Run `program` to completion, recording everything into `writer`'s
    /// record. Always leaves the record in a terminal state.
    pub async fn run(&self, mut writer: RecordWriter, program: String, timeout: Duration) {
        let record = Arc::clone(writer.record());
        debug!("{}: starting (timeout {}s)", record.id(), timeout.as_secs());

        if let Err(e) = self.drive(&mut writer, &record, &program, timeout).await {
            warn!("{}: {e}", record.id());
            writer.fail(e.to_string());
            writer.push_line(format!("[Exception] {e}"));
        }

        info!(
            "{}: {} with {} lines",
            record.id(),
            record.status(),
            record.lines_total()
        );
    }

    async fn drive(
        &self,
        writer: &mut RecordWriter,
        record: &ExecutionRecord,
        program: &str,
        timeout: Duration,
    ) -> Result<(), ExecutionError> {
        let mut child = spawn_piped(self.launcher.command(&["-e", program]))
            .map_err(ExecutionError::LaunchFault)?;
        writer.set_pid(child.id());

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(ExecutionError::MissingPipe("stdio"));
        };

        send_credential(stdin, self.credentials.credential()).await;
        let mut stderr_task = tokio::spawn(drain_stderr(stderr));

        let outcome = stream_stdout(&mut child, writer, record, stdout, timeout).await;

        match outcome {
            Ok(Outcome::Exited) => {}
            Ok(Outcome::TimedOut) => {
                self.terminate(&mut child, record.id()).await;
                writer.push_line(TIMEOUT_LINE);
                writer.fail(ExecutionError::Timeout.to_string());
            }
            Ok(Outcome::Evicted) => {
                self.terminate(&mut child, record.id()).await;
                writer.fail(ExecutionError::Evicted.to_string());
            }
            Err(e) => {
                self.terminate(&mut child, record.id()).await;
                stderr_task.abort();
                return Err(e);
            }
        }

        let stderr_text =
            match tokio::time::timeout(self.termination_grace, &mut stderr_task).await {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!("{}: stderr drain task failed: {e}", record.id());
                    String::new()
                }
                Err(_) => {
                    debug!(
                        "{}: stderr still open after exit, giving up on it",
                        record.id()
                    );
                    stderr_task.abort();
                    String::new()
                }
            };

        if writer.is_terminal() {
            return Ok(());
        }

        if let Some(text) = tool_error(&stderr_text) {
            writer.push_line(format!("[Error] {text}"));
            writer.fail(ExecutionError::ToolError(text).to_string());
        } else {
            writer.complete();
        }
        Ok(())
    }

    /// SIGTERM the process group, wait up to the grace period, then SIGKILL
    async fn terminate(&self, child: &mut Child, id: &ExecutionId) {
        let Some(pid) = child.id() else {
            return;
        };

        if let Err(e) = signal_process_group(pid, libc::SIGTERM) {
            debug!("{id}: SIGTERM to group {pid} failed: {e}");
        }
        let exited = tokio::time::timeout(self.termination_grace, child.wait()).await;
        if exited.is_ok() {
            return;
        }

        warn!("{id}: process group {pid} still alive after SIGTERM, killing");
        if let Err(e) = signal_process_group(pid, libc::SIGKILL) {
            debug!("{id}: SIGKILL to group {pid} failed: {e}");
        }
        if let Err(e) = child.kill().await {
            debug!("{id}: kill failed: {e}");
        }
    }
}

/// Read stdout line by line into the record until EOF and process exit,
/// unless the deadline or eviction fires first.
async fn stream_stdout(
    child: &mut Child,
    writer: &mut RecordWriter,
    record: &ExecutionRecord,
    stdout: ChildStdout,
    timeout: Duration,
) -> Result<Outcome, ExecutionError> {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let evicted = record.evicted();
    tokio::pin!(evicted);

    let mut lines = CappedLines::new(BufReader::new(stdout), MAX_LINE_BYTES);
    let mut stdout_open = true;

    loop {
        tokio::select! {
            biased;

            () = &mut deadline => return Ok(Outcome::TimedOut),
            () = &mut evicted => return Ok(Outcome::Evicted),
            segment = lines.next_line(), if stdout_open => match segment {
                Ok(Some(bytes)) => writer.push_line(decode_line(&bytes)),
                Ok(None) => stdout_open = false,
                Err(e) => return Err(ExecutionError::StreamFault(e)),
            },
            status = child.wait(), if !stdout_open => {
                match status {
                    Ok(status) => debug!("{}: exited with {status}", record.id()),
                    Err(e) => warn!("{}: wait failed: {e}", record.id()),
                }
                return Ok(Outcome::Exited);
            }
        }
    }
}

/// Newline-split reader that never buffers more than `max` bytes of a line
///
/// Cancel safe: a partial line stays in `buf` until the next call.
struct CappedLines<R> {
    reader: R,
    buf: Vec<u8>,
    overflowed: bool,
    max: usize,
}

impl<R: AsyncBufRead + Unpin> CappedLines<R> {
    fn new(reader: R, max: usize) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            overflowed: false,
            max,
        }
    }

    /// Next line without its `\n`, or `None` at EOF
    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.buf.is_empty() && !self.overflowed {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            let newline = available.iter().position(|&b| b == b'\n');
            let content = &available[..newline.unwrap_or(available.len())];
            let room = self.max.saturating_sub(self.buf.len());
            if content.len() > room {
                self.overflowed = true;
            }
            self.buf.extend_from_slice(&content[..content.len().min(room)]);

            let consumed = newline.map_or(available.len(), |at| at + 1);
            self.reader.consume(consumed);
            if newline.is_some() {
                return Ok(Some(self.take_line()));
            }
        }
    }

    fn take_line(&mut self) -> Vec<u8> {
        let mut line = std::mem::take(&mut self.buf);
        if std::mem::take(&mut self.overflowed) {
            line.extend_from_slice(LINE_TRUNCATED_SUFFIX.as_bytes());
        }
        line
    }
}

/// Read stderr to EOF, keeping only the first [`MAX_STDERR_BYTES`]
///
/// The remainder is still read so the process never blocks on a full pipe.
async fn drain_stderr<R: AsyncRead + Unpin>(stderr: R) -> String {
    let mut buf = Vec::new();
    let mut head = stderr.take(MAX_STDERR_BYTES);
    if let Err(e) = head.read_to_end(&mut buf).await {
        debug!("stderr read failed after {} bytes: {e}", buf.len());
        return String::from_utf8_lossy(&buf).into_owned();
    }

    let mut rest = head.into_inner();
    match tokio::io::copy(&mut rest, &mut tokio::io::sink()).await {
        Ok(0) => {}
        Ok(dropped) => debug!("discarded {dropped} bytes of stderr"),
        Err(e) => debug!("stderr read failed while discarding: {e}"),
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Lossy UTF-8 with trailing whitespace (including `\r`) removed
fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}

/// Remove leading `[sudo] password for <user>: ` echoes
#[must_use]
pub fn strip_credential_prompt(text: &str) -> &str {
    let mut rest = text.trim();
    while let Some(after) = rest.strip_prefix(CREDENTIAL_PROMPT) {
        rest = match after.find(':') {
            Some(colon) => after[colon + 1..].trim_start(),
            None => "",
        };
    }
    rest
}

/// Stderr text that should fail a run, if any
#[must_use]
pub fn tool_error(stderr: &str) -> Option<String> {
    let text = strip_credential_prompt(stderr);
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_only_is_benign() {
        assert_eq!(tool_error("[sudo] password for alice: "), None);
        assert_eq!(tool_error("[sudo] password for alice:\n"), None);
        assert_eq!(tool_error("   \n"), None);
    }

    #[test]
    fn test_error_after_prompt_is_kept() {
        let stderr =
            "[sudo] password for alice: stdin:1:1-4: ERROR: syntax error, unexpected end of file";
        assert_eq!(
            tool_error(stderr).as_deref(),
            Some("stdin:1:1-4: ERROR: syntax error, unexpected end of file")
        );
    }

    #[test]
    fn test_plain_error_is_kept() {
        assert_eq!(
            tool_error("ERROR: probe not found\n").as_deref(),
            Some("ERROR: probe not found")
        );
    }

    #[test]
    fn test_repeated_prompts_stripped() {
        let echoed = "[sudo] password for a: [sudo] password for a: ";
        assert_eq!(strip_credential_prompt(echoed), "");
    }

    #[test]
    fn test_decode_line_trims_trailing_whitespace() {
        assert_eq!(decode_line(b"@count: 42\r"), "@count: 42");
        assert_eq!(decode_line(b"  indented  "), "  indented");
        assert_eq!(decode_line(&[0x66, 0x6f, 0xff]), "fo\u{fffd}");
    }

    async fn read_all(input: &[u8], max: usize) -> Vec<String> {
        let mut lines = CappedLines::new(input, max);
        let mut out = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            out.push(String::from_utf8(line).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_capped_lines_split_on_newline() {
        let lines = read_all(b"one\n\ntwo\nthree", 16).await;
        assert_eq!(lines, vec!["one", "", "two", "three"]);
    }

    #[tokio::test]
    async fn test_overlong_line_is_cut_and_marked() {
        let input = format!("short\n{}\nafter\n{}", "x".repeat(20), "y".repeat(9));
        let lines = read_all(input.as_bytes(), 8).await;
        assert_eq!(
            lines,
            vec![
                "short".to_string(),
                format!("xxxxxxxx{LINE_TRUNCATED_SUFFIX}"),
                "after".to_string(),
                format!("yyyyyyyy{LINE_TRUNCATED_SUFFIX}"),
            ]
        );
    }

    #[tokio::test]
    async fn test_overlong_line_across_small_reads() {
        let input = format!("{}\nend\n", "z".repeat(100));
        let reader = BufReader::with_capacity(7, input.as_bytes());
        let mut lines = CappedLines::new(reader, 10);
        let first = lines.next_line().await.unwrap().unwrap();
        let expected = format!("zzzzzzzzzz{LINE_TRUNCATED_SUFFIX}");
        assert_eq!(first, expected.into_bytes());
        assert_eq!(lines.next_line().await.unwrap().unwrap(), b"end");
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stderr_capture_is_capped() {
        let flood = vec![b'e'; 3 * usize::try_from(MAX_STDERR_BYTES).unwrap()];
        let text = drain_stderr(flood.as_slice()).await;
        assert_eq!(text.len() as u64, MAX_STDERR_BYTES);
    }

    #[tokio::test]
    async fn test_short_stderr_kept_whole() {
        assert_eq!(drain_stderr(&b"ERROR: oops\n"[..]).await, "ERROR: oops\n");
    }
}
