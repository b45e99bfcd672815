//! Tunnel readiness probing.
//!
//! Before configuration management connects to freshly provisioned hosts,
//! every hostname is probed through the Cloudflare tunnel with a short-lived
//! SSH check. Probes run sequentially in host-list order; one host exhausting
//! its attempt budget aborts the whole aggregate.

use crate::error::{CoreError, Result};
use crate::hosts::HostList;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::info;

/// Default attempt budget per host.
pub const DEFAULT_ATTEMPTS: u32 = 30;

/// Default delay between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// Per-attempt SSH connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 5;

pub struct TunnelProber {
    attempts: u32,
    delay: Duration,
}

impl TunnelProber {
    pub fn new() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }

    pub fn with_policy(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Wait for a single tunnel to become reachable via SSH through
    /// cloudflared.
    pub async fn wait_for_tunnel(&self, hostname: &str, ssh_key: &Path) -> Result<()> {
        for attempt in 1..=self.attempts {
            if self.probe(hostname, ssh_key).await? {
                info!("Tunnel reachable: {hostname}");
                return Ok(());
            }

            info!(
                "Waiting for tunnel {hostname} to become reachable (attempt {attempt}/{})...",
                self.attempts
            );
            if attempt < self.attempts {
                sleep(self.delay).await;
            }
        }

        Err(CoreError::TunnelUnreachable {
            hostname: hostname.to_string(),
            attempts: self.attempts,
        })
    }

    /// Wait for every host in the aggregate, in order.
    ///
    /// An empty aggregate is a no-op success.
    pub async fn wait_for_all(&self, hosts: &HostList, ssh_key: &Path) -> Result<()> {
        for hostname in hosts.hostnames() {
            self.wait_for_tunnel(hostname, ssh_key).await?;
        }
        Ok(())
    }

    async fn probe(&self, hostname: &str, ssh_key: &Path) -> Result<bool> {
        let status = self
            .probe_command(hostname, ssh_key)
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CoreError::CommandNotFound("ssh".to_string())
                } else {
                    CoreError::Io(e)
                }
            })?;
        Ok(status.success())
    }

    /// A single short-lived connectivity check. Host-key persistence is
    /// disabled: each run is independent, with no accumulated trust state.
    fn probe_command(&self, hostname: &str, ssh_key: &Path) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg(format!(
                "ProxyCommand=cloudflared access ssh --hostname {hostname}"
            ))
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"))
            .arg("-o")
            .arg("StrictHostKeyChecking=no")
            .arg("-o")
            .arg("UserKnownHostsFile=/dev/null")
            .arg("-i")
            .arg(ssh_key)
            .arg(format!("root@{hostname}"))
            .arg("exit")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl Default for TunnelProber {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_empty_aggregate_is_noop_success() {
        let prober = TunnelProber::with_policy(1, Duration::from_millis(1));
        prober
            .wait_for_all(&HostList::default(), Path::new("/tmp/key"))
            .await
            .unwrap();
    }

    #[test]
    fn test_probe_command_line() {
        let prober = TunnelProber::new();
        let cmd = prober.probe_command("app.example.com", &PathBuf::from("/tmp/key"));
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert!(args.contains(
            &"ProxyCommand=cloudflared access ssh --hostname app.example.com".to_string()
        ));
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"ConnectTimeout=5".to_string()));
        assert!(args.contains(&"UserKnownHostsFile=/dev/null".to_string()));
        assert!(args.contains(&"root@app.example.com".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("exit"));
    }

    #[test]
    fn test_exhaustion_error_names_host_and_attempts() {
        let err = CoreError::TunnelUnreachable {
            hostname: "app.example.com".to_string(),
            attempts: 30,
        };
        let message = err.to_string();
        assert!(message.contains("app.example.com"));
        assert!(message.contains("30"));
    }
}
