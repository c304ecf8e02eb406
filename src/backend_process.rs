use std::{
    process::Stdio,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    sync::mpsc,
};

use crate::{
    events::StreamChannel,
    launch_plan::{spawn_environment, LaunchPlan},
    logging,
};

/// What a supervised child reports back: tagged output lines while it runs,
/// then exactly one exit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Line {
        channel: StreamChannel,
        text: String,
    },
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
}

/// One live backend child: its pid, a liveness flag, and the merged event
/// stream. Owned exclusively by the supervisor for the span of an attempt.
#[derive(Debug)]
pub struct BackendHandle {
    pid: Option<u32>,
    alive: Arc<AtomicBool>,
    events: mpsc::UnboundedReceiver<ProcessEvent>,
}

impl BackendHandle {
    pub fn from_parts(
        pid: Option<u32>,
        alive: Arc<AtomicBool>,
        events: mpsc::UnboundedReceiver<ProcessEvent>,
    ) -> Self {
        Self { pid, alive, events }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Shared liveness flag, cleared by the exit watcher. The probe reads it
    /// to abandon a backend that died mid-probe.
    pub fn liveness(&self) -> Arc<AtomicBool> {
        self.alive.clone()
    }

    /// Next line or the exit record. `None` only once the child is gone and
    /// every buffered event has been drained.
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        self.events.recv().await
    }
}

/// Seam between the supervisor and process creation, so launch flows can be
/// exercised against scripted backends.
#[async_trait]
pub trait BackendLauncher: Send + Sync {
    async fn launch(&self, plan: &LaunchPlan) -> Result<BackendHandle, String>;
}

/// Spawns the real backend with piped streams and the configured runtime
/// environment.
pub struct ProcessLauncher;

#[async_trait]
impl BackendLauncher for ProcessLauncher {
    async fn launch(&self, plan: &LaunchPlan) -> Result<BackendHandle, String> {
        let mut command = Command::new(&plan.cmd);
        command
            .args(&plan.args)
            .current_dir(&plan.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in spawn_environment(plan) {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|error| {
            format!("Failed to spawn backend process '{}': {}", plan.cmd, error)
        })?;
        let pid = child.id();
        let alive = Arc::new(AtomicBool::new(true));
        let (sender, events) = mpsc::unbounded_channel();

        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, StreamChannel::Stdout, sender.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, StreamChannel::Stderr, sender.clone());
        }

        let exit_alive = alive.clone();
        tokio::spawn(async move {
            let exited = match child.wait().await {
                Ok(status) => ProcessEvent::Exited {
                    code: status.code(),
                    signal: exit_signal(&status),
                },
                Err(error) => {
                    logging::append_shell_log(&format!("failed to await backend exit: {error}"));
                    ProcessEvent::Exited {
                        code: None,
                        signal: None,
                    }
                }
            };
            exit_alive.store(false, Ordering::Relaxed);
            let _ = sender.send(exited);
        });

        Ok(BackendHandle::from_parts(pid, alive, events))
    }
}

/// Forwards one child stream line-by-line into the shared event channel.
/// Per-stream arrival order is preserved; no order holds across streams.
fn spawn_line_reader<R>(
    stream: R,
    channel: StreamChannel,
    sender: mpsc::UnboundedSender<ProcessEvent>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(text)) = lines.next_line().await {
            if sender.send(ProcessEvent::Line { channel, text }).is_err() {
                break;
            }
        }
    });
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_reports_liveness_and_drains_events() {
        let (sender, events) = mpsc::unbounded_channel();
        let alive = Arc::new(AtomicBool::new(true));
        let mut handle = BackendHandle::from_parts(Some(4321), alive.clone(), events);

        sender
            .send(ProcessEvent::Line {
                channel: StreamChannel::Stderr,
                text: "warming up".to_string(),
            })
            .unwrap();
        alive.store(false, Ordering::Relaxed);
        sender
            .send(ProcessEvent::Exited {
                code: Some(0),
                signal: None,
            })
            .unwrap();
        drop(sender);

        assert_eq!(handle.pid(), Some(4321));
        assert_eq!(
            handle.next_event().await,
            Some(ProcessEvent::Line {
                channel: StreamChannel::Stderr,
                text: "warming up".to_string(),
            })
        );
        assert_eq!(
            handle.next_event().await,
            Some(ProcessEvent::Exited {
                code: Some(0),
                signal: None,
            })
        );
        assert!(!handle.is_alive());
        assert_eq!(handle.next_event().await, None);
    }
}
