// # Capture Trap Source
//
// This crate provides the capture-stream form of the trap listener: an
// external packet-capture process (tcpdump) whose decoded text output is read
// line by line.
//
// ## When to Use
//
// Use this form when a socket cannot be bound on the notification port, for
// example because another agent already owns it. The capture process sees the
// traffic without taking the port.
//
// ## Architecture
//
// `open()` spawns `<program> -i <interface> -l -n -vv udp port <port>` with
// stdout piped. Stdout is read only while the engine polls the stream, and
// every line containing the configured marker becomes an
// `InboundUnit::CaptureLine`. Bytes that are not UTF-8 are replaced, never
// fatal. The stream ends when the process exits; dropping it kills the
// process.

use trapd_core::config::{ListenerConfig, TrapConfig};
use trapd_core::traits::{InboundStream, InboundUnit, TrapSource};
use trapd_core::{Error, Result};

use futures_util::stream;
use std::io::ErrorKind;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

/// Packet-capture trap listener
#[derive(Debug, Clone)]
pub struct CaptureTrapSource {
    /// Program to launch
    program: String,

    /// Full argument list passed to the program
    args: Vec<String>,

    /// Substring a line must contain to be forwarded
    marker: String,
}

impl CaptureTrapSource {
    /// Create a tcpdump-style capture source
    ///
    /// # Parameters
    ///
    /// - `program`: Capture program (e.g., "tcpdump")
    /// - `interface`: Interface to capture on ("any" for all)
    /// - `port`: UDP port to filter on
    /// - `marker`: Lines without this substring are skipped
    pub fn new(
        program: impl Into<String>,
        interface: &str,
        port: u16,
        marker: impl Into<String>,
    ) -> Self {
        let mut args: Vec<String> = ["-i", interface, "-l", "-n", "-vv", "udp", "port"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(port.to_string());

        Self {
            program: program.into(),
            args,
            marker: marker.into(),
        }
    }

    /// Create a source running an arbitrary command line
    ///
    /// The command's stdout must use the same text layout as tcpdump.
    pub fn with_command(
        program: impl Into<String>,
        args: Vec<String>,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            marker: marker.into(),
        }
    }

    /// Create a source from the listener section of a config
    pub fn from_config(config: &TrapConfig) -> Result<Self> {
        match &config.listener {
            ListenerConfig::Capture {
                program,
                interface,
                port,
                marker,
            } => Ok(Self::new(program.clone(), interface, *port, marker.clone())),
            other => Err(Error::config(format!(
                "Invalid listener config for capture source: {}",
                other.type_name()
            ))),
        }
    }

    /// Program this source launches
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether a line is worth decoding
    pub fn is_candidate(&self, line: &str) -> bool {
        line.contains(&self.marker)
    }
}

/// Turn one raw stdout line into text
///
/// The line terminator (`\n` or `\r\n`) is dropped and invalid UTF-8 is
/// replaced with U+FFFD.
fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// A running capture process and its stdout
struct CaptureProcess {
    child: Child,
    stdout: BufReader<ChildStdout>,
    buf: Vec<u8>,
    source: CaptureTrapSource,
}

impl CaptureProcess {
    /// Next marked line, or `None` once the process is gone
    async fn next_line(&mut self) -> Option<String> {
        loop {
            self.buf.clear();

            match self.stdout.read_until(b'\n', &mut self.buf).await {
                Ok(0) => {
                    match self.child.wait().await {
                        Ok(status) => {
                            tracing::warn!("Capture process {} exited: {}", self.source.program, status)
                        }
                        Err(e) => tracing::error!("Failed to reap {}: {}", self.source.program, e),
                    }
                    return None;
                }
                Ok(_) => {
                    let line = decode_line(&self.buf);
                    if self.source.is_candidate(&line) {
                        return Some(line);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::error!("Failed to read {} output: {}", self.source.program, e);
                    return None;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl TrapSource for CaptureTrapSource {
    async fn open(&self) -> Result<InboundStream> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::transport(format!("Failed to start {}: {}", self.program, e))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            Error::transport(format!("Failed to capture {} stdout", self.program))
        })?;

        tracing::info!(
            "Capture process started: {} {}",
            self.program,
            self.args.join(" ")
        );

        let process = CaptureProcess {
            child,
            stdout: BufReader::new(stdout),
            buf: Vec::new(),
            source: self.clone(),
        };

        Ok(Box::pin(stream::unfold(process, |mut process| async move {
            let line = process.next_line().await?;
            Some((InboundUnit::capture_line(line), process))
        })))
    }

    fn source_name(&self) -> &'static str {
        "capture"
    }
}
