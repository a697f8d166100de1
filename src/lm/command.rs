//! Local command backend.
//!
//! Runs a user-configured command with the prompt on stdin and reads the
//! generated text from stdout. Any tool that behaves like a filter works
//! (`llm`, `ollama run <model>`, a wrapper script). The child is polled rather
//! than waited on so a timeout or cancellation can kill it.
use super::{normalize_output, GenerationClient, GenerationError, GenerationRequest};
use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Generation backend that shells out to a local command.
#[derive(Debug, Clone)]
pub struct CommandClient {
    argv: Vec<String>,
}

impl CommandClient {
    /// Parse a shell-style command line.
    pub fn from_command_line(command: &str) -> Result<Self, GenerationError> {
        let argv = shell_words::split(command).map_err(|err| {
            GenerationError::Configuration(format!("parse LM command {command:?}: {err}"))
        })?;
        if argv.is_empty() {
            return Err(GenerationError::Configuration(
                "LM command is empty".to_string(),
            ));
        }
        Ok(Self { argv })
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    fn spawn(&self) -> Result<Child, GenerationError> {
        Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                GenerationError::Configuration(format!("spawn LM command {}: {err}", self.argv[0]))
            })
    }
}

fn read_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut bytes);
        }
        bytes
    })
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl GenerationClient for CommandClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        if request.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        let start = Instant::now();
        let mut child = self.spawn()?;

        let prompt = request.prompt.as_bytes().to_vec();
        let stdin = child.stdin.take();
        let writer = thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(&prompt) {
                    Err(err) if err.kind() == ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            Ok(())
        });
        let stdout = read_pipe(child.stdout.take());
        let stderr = read_pipe(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    kill(&mut child);
                    return Err(GenerationError::Provider(format!("wait for LM command: {err}")));
                }
            }
            if request.is_cancelled() {
                kill(&mut child);
                return Err(GenerationError::Cancelled);
            }
            if let Some(timeout) = request.timeout {
                if start.elapsed() >= timeout {
                    kill(&mut child);
                    return Err(GenerationError::Timeout {
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let write_result = writer
            .join()
            .map_err(|_| GenerationError::Provider("LM stdin writer panicked".to_string()))?;
        let stdout = stdout
            .join()
            .map_err(|_| GenerationError::Provider("LM stdout reader panicked".to_string()))?;
        let stderr = stderr
            .join()
            .map_err(|_| GenerationError::Provider("LM stderr reader panicked".to_string()))?;

        tracing::info!(
            label = request.label,
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = request.prompt.len(),
            response_bytes = stdout.len(),
            "lm command complete"
        );

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(GenerationError::Provider(format!(
                "LM command failed with status {status}: {}",
                stderr.trim()
            )));
        }
        if let Err(err) = write_result {
            return Err(GenerationError::Provider(format!(
                "write prompt to LM stdin: {err}"
            )));
        }
        let text = String::from_utf8(stdout)
            .map_err(|err| GenerationError::Provider(format!("decode LM stdout as UTF-8: {err}")))?;
        normalize_output(&text)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::lm::CancelToken;

    #[test]
    fn echoes_stdin_through_cat() {
        let client = CommandClient::from_command_line("cat").expect("client");
        let request = GenerationRequest::new("strategy", "  plano de mídia \n");
        assert_eq!(client.generate(&request).expect("text"), "plano de mídia");
    }

    #[test]
    fn non_zero_exit_is_a_provider_error() {
        let client =
            CommandClient::from_command_line("sh -c 'echo quota >&2; exit 3'").expect("client");
        let err = client
            .generate(&GenerationRequest::new("strategy", "prompt"))
            .expect_err("failing command");
        assert_eq!(err.kind(), "provider");
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn timeout_kills_the_command() {
        let client = CommandClient::from_command_line("sleep 5").expect("client");
        let mut request = GenerationRequest::new("strategy", "prompt");
        request.timeout = Some(Duration::from_millis(100));
        let start = Instant::now();
        let err = client.generate(&request).expect_err("timeout");
        assert!(matches!(err, GenerationError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let client = CommandClient::from_command_line("cat").expect("client");
        let token = CancelToken::new();
        token.cancel();
        let mut request = GenerationRequest::new("strategy", "prompt");
        request.cancel = Some(&token);
        assert!(matches!(
            client.generate(&request),
            Err(GenerationError::Cancelled)
        ));
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandClient::from_command_line("  ").is_err());
    }
}
