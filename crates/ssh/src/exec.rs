//! Remote command execution on an established session.
//!
//! Scripts run through a configurable runner binary with variables passed as
//! inline JSON. Vault material is uploaded next to the script for the
//! duration of the run and removed again afterwards, whatever the outcome.

use runforge_core::vars::VariableMap;
use russh::ChannelMsg;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::{SshClientError, SshSession};

/// Everything needed to launch one script execution on an open session.
#[derive(Clone)]
pub struct ScriptRun {
    /// Remote path the script was uploaded to.
    pub remote_path: String,
    /// Variables handed to the runner as inline JSON.
    pub variables: VariableMap,
    /// Command chained in front of the runner invocation with `&&`.
    pub preamble: Option<String>,
    /// Decrypted vault material for protected variables.
    pub secret: Option<SecretMaterial>,
    /// Runner binary invoked on the remote host.
    pub runner: String,
}

/// Decrypted credential material uploaded alongside a script for the
/// duration of a single run.
#[derive(Clone)]
pub struct SecretMaterial {
    pub password: String,
    pub vars_file: Option<Vec<u8>>,
}

/// Result of a remote command that actually ran. A non-zero exit code is a
/// normal outcome here, not an error.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub output: String,
    pub exit_code: i32,
}

impl ScriptRun {
    /// Path the vault password file is uploaded to, derived from the script
    /// path so every run-scoped file shares one prefix.
    fn vault_pass_path(&self) -> String {
        sibling_path(&self.remote_path, "-vault-pass")
    }

    /// Path the encrypted variables file is uploaded to.
    fn vault_vars_path(&self) -> String {
        sibling_path(&self.remote_path, "-vault-vars.yml")
    }

    /// Builds the full shell command line for this run.
    fn command_line(&self) -> Result<String, serde_json::Error> {
        let vars_json = serde_json::to_string(&self.variables)?;
        let mut command = format!(
            "{} {} --extra-vars {}",
            self.runner,
            sh_quote(&self.remote_path),
            sh_quote(&vars_json)
        );
        if let Some(secret) = &self.secret {
            command.push_str(&format!(
                " --vault-password-file {}",
                sh_quote(&self.vault_pass_path())
            ));
            if secret.vars_file.is_some() {
                command.push_str(&format!(
                    " --extra-vars {}",
                    sh_quote(&format!("@{}", self.vault_vars_path()))
                ));
            }
        }
        if let Some(preamble) = self.preamble.as_deref().filter(|p| !p.trim().is_empty()) {
            command = format!("{preamble} && {command}");
        }
        Ok(command)
    }
}

// ---------------------------------------------------------------------------
// Session operations
// ---------------------------------------------------------------------------

impl SshSession {
    /// Writes `content` to `remote_path` by piping it into `cat` on the
    /// remote side, so no file-transfer subsystem is needed on the host.
    pub async fn upload_file(
        &self,
        remote_path: &str,
        content: &[u8],
    ) -> Result<(), SshClientError> {
        let mut channel = self.handle.channel_open_session().await?;
        channel
            .exec(true, format!("cat > {}", sh_quote(remote_path)))
            .await?;
        channel.data(content).await?;
        channel.eof().await?;

        let mut complaint = Vec::new();
        let mut exit_code = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data }
                | ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                    complaint.extend_from_slice(data);
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status as i32),
                _ => {}
            }
        }

        match exit_code {
            Some(0) => {
                tracing::debug!(path = remote_path, bytes = content.len(), "Uploaded file");
                Ok(())
            }
            Some(code) => {
                let detail = String::from_utf8_lossy(&complaint);
                let detail = detail.trim();
                let reason = if detail.is_empty() {
                    format!("exit status {code}")
                } else {
                    format!("exit status {code}: {detail}")
                };
                Err(SshClientError::Upload {
                    path: remote_path.to_string(),
                    reason,
                })
            }
            None => Err(SshClientError::Upload {
                path: remote_path.to_string(),
                reason: "no exit status received".to_string(),
            }),
        }
    }

    /// Runs a short command and collects its merged stdout and stderr.
    pub async fn run_command(&self, command: &str) -> Result<ExecOutcome, SshClientError> {
        let mut channel = self.handle.channel_open_session().await?;
        channel.exec(true, command).await?;

        let mut output = Vec::new();
        let mut exit_code = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data }
                | ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                    output.extend_from_slice(data);
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status as i32),
                _ => {}
            }
        }

        Ok(ExecOutcome {
            output: String::from_utf8_lossy(&output).into_owned(),
            exit_code: exit_code.unwrap_or(0),
        })
    }

    /// Executes a script, streaming each produced line into `lines` as it
    /// arrives. The caller keeps ownership of the sender and decides when the
    /// receiving side is done.
    ///
    /// Returns the accumulated output and exit code once the remote command
    /// finishes. Cancellation stops the line relay promptly but does not kill
    /// the remote process.
    pub async fn run_script(
        &self,
        run: &ScriptRun,
        lines: &mpsc::Sender<String>,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, SshClientError> {
        let mut secret_paths = Vec::new();
        let result = self.exec_script(run, lines, cancel, &mut secret_paths).await;
        for path in &secret_paths {
            if let Err(err) = self.run_command(&format!("rm -f {}", sh_quote(path))).await {
                tracing::warn!(path = %path, error = %err, "Failed to remove remote secret file");
            }
        }
        result
    }

    async fn exec_script(
        &self,
        run: &ScriptRun,
        lines: &mpsc::Sender<String>,
        cancel: &CancellationToken,
        secret_paths: &mut Vec<String>,
    ) -> Result<ExecOutcome, SshClientError> {
        let command = run.command_line()?;

        if let Some(secret) = &run.secret {
            let pass_path = run.vault_pass_path();
            self.upload_file(&pass_path, secret.password.as_bytes())
                .await?;
            secret_paths.push(pass_path);
            if let Some(vars_file) = &secret.vars_file {
                let vars_path = run.vault_vars_path();
                self.upload_file(&vars_path, vars_file).await?;
                secret_paths.push(vars_path);
            }
        }

        tracing::debug!(path = %run.remote_path, "Executing remote script");

        let mut channel = self.handle.channel_open_session().await?;
        channel.exec(true, command).await?;

        let mut buffer = LineBuffer::new();
        let mut output = String::new();
        let mut exit_code = None;
        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => return Err(SshClientError::Cancelled),
                msg = channel.wait() => msg,
            };
            let Some(msg) = msg else { break };
            match msg {
                ChannelMsg::Data { ref data }
                | ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                    for line in buffer.feed(data) {
                        push_line(&mut output, line, lines, cancel).await?;
                    }
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status as i32),
                _ => {}
            }
        }
        if let Some(line) = buffer.flush() {
            push_line(&mut output, line, lines, cancel).await?;
        }

        let exit_code = exit_code.ok_or(SshClientError::NoExitStatus)?;
        Ok(ExecOutcome { output, exit_code })
    }
}

/// Appends a line to the accumulated output and forwards it to the caller's
/// channel, giving up promptly when the run is cancelled.
async fn push_line(
    output: &mut String,
    line: String,
    lines: &mpsc::Sender<String>,
    cancel: &CancellationToken,
) -> Result<(), SshClientError> {
    output.push_str(&line);
    output.push('\n');
    tokio::select! {
        _ = cancel.cancelled() => Err(SshClientError::Cancelled),
        sent = lines.send(line) => {
            // A dropped receiver just means nobody is listening anymore.
            let _ = sent;
            Ok(())
        }
    }
}

/// Quotes a string for use as a single shell word, surviving embedded
/// single quotes.
pub fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r#"'"'"'"#))
}

/// Swaps the extension of the final path element for `suffix`, so secret
/// files land next to the script they belong to.
fn sibling_path(path: &str, suffix: &str) -> String {
    let name_start = path.rfind('/').map_or(0, |pos| pos + 1);
    match path[name_start..].rfind('.') {
        Some(dot) => format!("{}{}", &path[..name_start + dot], suffix),
        None => format!("{path}{suffix}"),
    }
}

/// Splits a raw byte stream into complete text lines, holding back any
/// trailing partial line until more data (or the end of stream) arrives.
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Absorbs a chunk and returns every line completed by it, with line
    /// endings stripped.
    fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Returns the final unterminated line, if any.
    fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, Value};

    use super::*;

    fn plain_run() -> ScriptRun {
        ScriptRun {
            remote_path: "/tmp/deploy-7.yml".to_string(),
            variables: Map::new(),
            preamble: None,
            secret: None,
            runner: "ansible-playbook".to_string(),
        }
    }

    #[test]
    fn quoting_wraps_and_escapes_single_quotes() {
        assert_eq!(sh_quote("/tmp/play.yml"), "'/tmp/play.yml'");
        assert_eq!(sh_quote("it's"), r#"'it'"'"'s'"#);
    }

    #[test]
    fn sibling_path_replaces_the_extension() {
        assert_eq!(
            sibling_path("/tmp/play.yml", "-vault-pass"),
            "/tmp/play-vault-pass"
        );
        assert_eq!(sibling_path("/tmp/play", "-vault-pass"), "/tmp/play-vault-pass");
        assert_eq!(
            sibling_path("/srv/a.b/play", "-vault-vars.yml"),
            "/srv/a.b/play-vault-vars.yml"
        );
    }

    #[test]
    fn command_line_for_a_plain_run() {
        let run = plain_run();
        assert_eq!(
            run.command_line().unwrap(),
            "ansible-playbook '/tmp/deploy-7.yml' --extra-vars '{}'"
        );
    }

    #[test]
    fn command_line_includes_vault_flags_and_preamble() {
        let mut run = plain_run();
        run.variables
            .insert("env".to_string(), Value::String("prod".to_string()));
        run.preamble = Some("cd /opt/site".to_string());
        run.secret = Some(SecretMaterial {
            password: "pw".to_string(),
            vars_file: Some(b"cipher".to_vec()),
        });
        assert_eq!(
            run.command_line().unwrap(),
            "cd /opt/site && ansible-playbook '/tmp/deploy-7.yml' \
             --extra-vars '{\"env\":\"prod\"}' \
             --vault-password-file '/tmp/deploy-7-vault-pass' \
             --extra-vars '@/tmp/deploy-7-vault-vars.yml'"
        );
    }

    #[test]
    fn blank_preamble_is_ignored() {
        let mut run = plain_run();
        run.preamble = Some("   ".to_string());
        assert_eq!(
            run.command_line().unwrap(),
            "ansible-playbook '/tmp/deploy-7.yml' --extra-vars '{}'"
        );
    }

    #[test]
    fn feed_emits_only_complete_lines() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.feed(b"alpha\nbra"), vec!["alpha"]);
        assert_eq!(buffer.feed(b"vo\ncharlie"), vec!["bravo"]);
        assert_eq!(buffer.flush(), Some("charlie".to_string()));
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn feed_strips_carriage_returns() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.feed(b"one\r\ntwo\r"), vec!["one"]);
        assert_eq!(buffer.flush(), Some("two".to_string()));
    }

    #[test]
    fn feed_splits_multiple_lines_in_one_chunk() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.feed(b"a\nb\nc\n"), vec!["a", "b", "c"]);
        assert_eq!(buffer.flush(), None);
    }
}
