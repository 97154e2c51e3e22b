// src/tools/ssh.rs

use crate::tools::shell::{CommandOutput, CommandSpec, Shell};
use crate::tools::ToolCall;
use std::sync::Arc;
use std::time::Duration;

/// Runs one command on a remote host through the `ssh` binary.
///
/// Key and agent logins run in batch mode. A password-only credential goes
/// through `sshpass -e` with the password in the environment, never argv.
#[derive(Clone)]
pub struct RemoteShell {
    shell: Arc<dyn Shell>,
    ssh_bin: String,
    sshpass_bin: String,
    connect_timeout_secs: u64,
    command_timeout: Option<Duration>,
}

impl RemoteShell {
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self {
            shell,
            ssh_bin: "ssh".into(),
            sshpass_bin: "sshpass".into(),
            connect_timeout_secs: 10,
            command_timeout: None,
        }
    }

    pub fn with_binaries(mut self, ssh_bin: &str, sshpass_bin: &str) -> Self {
        self.ssh_bin = ssh_bin.into();
        self.sshpass_bin = sshpass_bin.into();
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Kills the local `ssh` when the remote command runs longer than
    /// `limit`; `ConnectTimeout` alone only bounds the handshake.
    pub fn with_command_timeout(mut self, limit: Duration) -> Self {
        self.command_timeout = Some(limit);
        self
    }

    pub fn command_spec(&self, call: &ToolCall<'_>, command: &str) -> Result<CommandSpec, String> {
        let host = call.host().ok_or("missing required argument 'host'")?;
        let user = call
            .username()
            .ok_or("no ssh username in step arguments or credentials")?;
        let port = call.port().unwrap_or(22);
        let key_path = call.credential.and_then(|c| c.key_path.as_ref());
        let password = call.password().filter(|_| key_path.is_none());

        let mut spec = match password {
            Some(password) => CommandSpec::new(&self.sshpass_bin)
                .args(["-e", self.ssh_bin.as_str()])
                .env("SSHPASS", password),
            None => CommandSpec::new(&self.ssh_bin).args(["-o", "BatchMode=yes"]),
        };
        spec = spec.args([
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-p".to_string(),
            port.to_string(),
        ]);
        if let Some(key) = key_path {
            spec = spec.arg("-i").arg(key.to_string_lossy());
        }
        Ok(spec
            .arg(format!("{user}@{host}"))
            .arg("--")
            .arg(command)
            .timeout(self.command_timeout))
    }

    /// Runs `command` and returns its output when it exits with status 0.
    pub fn exec(&self, call: &ToolCall<'_>, command: &str) -> Result<CommandOutput, String> {
        let spec = self.command_spec(call, command)?;
        let output = self
            .shell
            .run(&spec)
            .map_err(|e| format!("failed to run {}: {e}", spec.program))?;
        if output.success() {
            Ok(output)
        } else {
            Err(format!("ssh exec failed, {}", output.failure_reason()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::protocol::{PlanStep, ToolId};
    use crate::tools::shell::testing::FakeShell;

    fn step() -> PlanStep {
        PlanStep::new(ToolId::VmLinuxFsUsage)
            .arg("host", "vm1")
            .arg("port", 2222)
    }

    #[test]
    fn key_login_runs_in_batch_mode() {
        let remote = RemoteShell::new(Arc::new(FakeShell::replying(0, "")));
        let credential = Credential {
            username: Some("root".into()),
            password: Some("ignored".into()),
            key_path: Some("/keys/id_ed25519".into()),
        };
        let step = step();
        let call = ToolCall::new(&step).with_credential(Some(&credential));
        let spec = remote.command_spec(&call, "df -P -k").unwrap();
        assert_eq!(spec.program, "ssh");
        assert_eq!(
            spec.args,
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-o",
                "StrictHostKeyChecking=accept-new",
                "-p",
                "2222",
                "-i",
                "/keys/id_ed25519",
                "root@vm1",
                "--",
                "df -P -k",
            ]
        );
        assert!(spec.env.is_empty());
    }

    #[test]
    fn password_login_goes_through_sshpass_env() {
        let remote = RemoteShell::new(Arc::new(FakeShell::replying(0, "")));
        let credential = Credential {
            username: Some("ops".into()),
            password: Some("pw".into()),
            key_path: None,
        };
        let step = step();
        let call = ToolCall::new(&step).with_credential(Some(&credential));
        let spec = remote.command_spec(&call, "uptime").unwrap();
        assert_eq!(spec.program, "sshpass");
        assert_eq!(&spec.args[..2], ["-e", "ssh"]);
        assert!(!spec.args.iter().any(|a| a == "pw"));
        assert_eq!(spec.env, vec![("SSHPASS".to_string(), "pw".to_string())]);
    }

    #[test]
    fn missing_user_or_host_is_reported() {
        let remote = RemoteShell::new(Arc::new(FakeShell::replying(0, "")));
        let step = step();
        assert!(remote.exec(&ToolCall::new(&step), "uptime").is_err());

        let no_host = PlanStep::new(ToolId::VmLinuxFsUsage).arg("username", "root");
        let err = remote.exec(&ToolCall::new(&no_host), "uptime").unwrap_err();
        assert_eq!(err, "missing required argument 'host'");
    }

    #[test]
    fn nonzero_exit_is_an_error() {
        let remote = RemoteShell::new(Arc::new(FakeShell::failing(255, "Connection refused")));
        let step = step().arg("username", "root");
        let err = remote.exec(&ToolCall::new(&step), "uptime").unwrap_err();
        assert_eq!(err, "ssh exec failed, exit status 255: Connection refused");
    }

    #[test]
    fn hung_remote_command_is_reported_as_timeout() {
        let shell = Arc::new(FakeShell::timing_out("timed out after 60s"));
        let remote =
            RemoteShell::new(shell.clone()).with_command_timeout(Duration::from_secs(60));
        let step = step().arg("username", "root");
        let err = remote.exec(&ToolCall::new(&step), "df -P -k").unwrap_err();

        assert_eq!(err, "failed to run ssh: timed out after 60s");
        assert_eq!(shell.last_call().timeout, Some(Duration::from_secs(60)));
    }
}
