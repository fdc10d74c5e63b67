//! Container startup ordering inside one task
//!
//! Models what the orchestrator does with a workload definition once a task is
//! placed: each container moves through
//! `pending -> waiting-on-dependency -> starting -> healthy -> running`, held in
//! `waiting-on-dependency` until its declared dependency reaches the required
//! condition. Probe failures count against the retry budget once the start
//! period has elapsed or the container has passed a probe; exhausting it marks
//! the container unhealthy.

use std::fmt;

use fargate_console_models::{
    DependencyCondition, HealthProbe, StartupDependency, WorkloadDefinition,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ContainerPhase {
    Pending,
    WaitingOnDependency,
    Starting,
    Healthy,
    /// Healthy, and every other container of the task is too
    Running,
    Unhealthy,
    Exited { code: i32 },
}

impl fmt::Display for ContainerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerPhase::Pending => write!(f, "pending"),
            ContainerPhase::WaitingOnDependency => write!(f, "waiting-on-dependency"),
            ContainerPhase::Starting => write!(f, "starting"),
            ContainerPhase::Healthy => write!(f, "healthy"),
            ContainerPhase::Running => write!(f, "running"),
            ContainerPhase::Unhealthy => write!(f, "unhealthy"),
            ContainerPhase::Exited { code } => write!(f, "exited({code})"),
        }
    }
}

impl ContainerPhase {
    fn is_started(&self) -> bool {
        matches!(
            self,
            ContainerPhase::Starting
                | ContainerPhase::Healthy
                | ContainerPhase::Running
                | ContainerPhase::Unhealthy
                | ContainerPhase::Exited { .. }
        )
    }

    fn is_healthy(&self) -> bool {
        matches!(self, ContainerPhase::Healthy | ContainerPhase::Running)
    }

    /// Does this phase of the dependency satisfy `condition`
    pub fn satisfies(&self, condition: DependencyCondition) -> bool {
        match condition {
            DependencyCondition::Start => self.is_started(),
            DependencyCondition::Healthy => self.is_healthy(),
            DependencyCondition::Complete => matches!(self, ContainerPhase::Exited { .. }),
            DependencyCondition::Success => matches!(self, ContainerPhase::Exited { code: 0 }),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StartupError {
    #[error("container '{0}' is not part of the task")]
    UnknownContainer(String),

    #[error("container '{name}' cannot report a probe while {phase}")]
    NotStarted { name: String, phase: ContainerPhase },
}

#[derive(Debug, Clone)]
struct TrackedContainer {
    name: String,
    dependency: Option<StartupDependency>,
    probe: HealthProbe,
    phase: ContainerPhase,
    consecutive_failures: u32,
}

#[derive(Debug, Clone)]
pub struct StartupTracker {
    containers: Vec<TrackedContainer>,
}

impl StartupTracker {
    pub fn new(workload: &WorkloadDefinition) -> Self {
        let containers = workload
            .containers
            .iter()
            .map(|c| TrackedContainer {
                name: c.name.clone(),
                dependency: c.startup_dependency.clone(),
                probe: c.health_probe.clone(),
                phase: ContainerPhase::Pending,
                consecutive_failures: 0,
            })
            .collect();

        Self { containers }
    }

    pub fn phase(&self, name: &str) -> Option<ContainerPhase> {
        self.find(name).map(|c| c.phase)
    }

    pub fn phases(&self) -> Vec<(String, ContainerPhase)> {
        self.containers
            .iter()
            .map(|c| (c.name.clone(), c.phase))
            .collect()
    }

    fn find(&self, name: &str) -> Option<&TrackedContainer> {
        self.containers.iter().find(|c| c.name == name)
    }

    fn index_of(&self, name: &str) -> Result<usize, StartupError> {
        self.containers
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| StartupError::UnknownContainer(name.to_string()))
    }

    /// Start every container whose dependency is satisfied
    ///
    /// Repeats until nothing changes, so a chain of `START` dependencies is
    /// released in one call.
    pub fn advance(&mut self) {
        loop {
            let mut changed = false;

            for i in 0..self.containers.len() {
                let phase = self.containers[i].phase;
                if !matches!(
                    phase,
                    ContainerPhase::Pending | ContainerPhase::WaitingOnDependency
                ) {
                    continue;
                }

                let ready = match &self.containers[i].dependency {
                    None => true,
                    Some(dependency) => self
                        .find(&dependency.on_container)
                        .is_some_and(|on| on.phase.satisfies(dependency.condition)),
                };

                let next = if ready {
                    ContainerPhase::Starting
                } else {
                    ContainerPhase::WaitingOnDependency
                };

                if next != phase {
                    tracing::debug!(
                        container = %self.containers[i].name,
                        from = %phase,
                        to = %next,
                        "Container phase changed"
                    );
                    self.containers[i].phase = next;
                    changed = true;
                }
            }

            if !changed {
                return;
            }
        }
    }

    /// Record one probe result taken `elapsed_seconds` after the container started
    pub fn record_probe(
        &mut self,
        name: &str,
        passed: bool,
        elapsed_seconds: u32,
    ) -> Result<ContainerPhase, StartupError> {
        let index = self.index_of(name)?;
        let container = &mut self.containers[index];

        if !matches!(
            container.phase,
            ContainerPhase::Starting | ContainerPhase::Healthy | ContainerPhase::Running
        ) {
            return Err(StartupError::NotStarted {
                name: name.to_string(),
                phase: container.phase,
            });
        }

        if passed {
            container.consecutive_failures = 0;
            if container.phase == ContainerPhase::Starting {
                container.phase = ContainerPhase::Healthy;
            }
        } else if container.phase.is_healthy()
            || elapsed_seconds >= container.probe.start_period_seconds
        {
            // The start period ends early at the first passing probe.
            container.consecutive_failures += 1;
            if container.consecutive_failures >= container.probe.retries {
                tracing::warn!(
                    container = %name,
                    retries = container.probe.retries,
                    "Container is unhealthy"
                );
                container.phase = ContainerPhase::Unhealthy;
            }
        }

        self.settle();
        Ok(self.containers[index].phase)
    }

    pub fn record_exit(&mut self, name: &str, code: i32) -> Result<(), StartupError> {
        let index = self.index_of(name)?;
        self.containers[index].phase = ContainerPhase::Exited { code };
        self.settle();
        Ok(())
    }

    fn settle(&mut self) {
        self.advance();

        let all_healthy = self.containers.iter().all(|c| c.phase.is_healthy());
        for container in &mut self.containers {
            match container.phase {
                ContainerPhase::Healthy if all_healthy => {
                    container.phase = ContainerPhase::Running;
                }
                ContainerPhase::Running if !all_healthy => {
                    container.phase = ContainerPhase::Healthy;
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::containers;
    use crate::secrets::secret_bundle;
    use crate::storage::storage_subsystem;
    use crate::testing::{sample_config, sample_names, sample_network};
    use crate::workload::{build_workload, WorkloadImages};
    use fargate_console_models::RemovalPolicy;

    fn tracker() -> StartupTracker {
        let names = sample_names();
        let bundle = secret_bundle(&names, RemovalPolicy::Destroy);
        let storage = storage_subsystem(&names, &sample_network());
        let workload = build_workload(
            &sample_config(),
            &names,
            &bundle,
            &storage.volume,
            &WorkloadImages::default(),
        )
        .unwrap();
        StartupTracker::new(&workload)
    }

    #[test]
    fn test_console_waits_for_database_health() {
        let mut tracker = tracker();
        tracker.advance();

        assert_eq!(tracker.phase(containers::DATABASE), Some(ContainerPhase::Starting));
        assert_eq!(
            tracker.phase(containers::CONSOLE),
            Some(ContainerPhase::WaitingOnDependency)
        );

        // Database failing inside its start period keeps the console blocked.
        tracker.record_probe(containers::DATABASE, false, 30).unwrap();
        assert_eq!(
            tracker.phase(containers::CONSOLE),
            Some(ContainerPhase::WaitingOnDependency)
        );

        tracker.record_probe(containers::DATABASE, true, 60).unwrap();
        assert_eq!(tracker.phase(containers::DATABASE), Some(ContainerPhase::Healthy));
        assert_eq!(tracker.phase(containers::CONSOLE), Some(ContainerPhase::Starting));
    }

    #[test]
    fn test_monitoring_starts_without_console() {
        // No dependency edge is declared for the monitoring container, so it
        // starts alongside the database while the console is still blocked.
        let mut tracker = tracker();
        tracker.advance();

        assert_eq!(tracker.phase(containers::MONITORING), Some(ContainerPhase::Starting));
        assert_eq!(
            tracker.phase(containers::CONSOLE),
            Some(ContainerPhase::WaitingOnDependency)
        );

        assert_eq!(
            tracker.record_probe(containers::MONITORING, true, 10).unwrap(),
            ContainerPhase::Healthy
        );
    }

    #[test]
    fn test_all_healthy_means_running() {
        let mut tracker = tracker();
        tracker.advance();
        tracker.record_probe(containers::DATABASE, true, 40).unwrap();
        tracker.record_probe(containers::MONITORING, true, 40).unwrap();
        tracker.record_probe(containers::CONSOLE, true, 20).unwrap();

        for (name, phase) in tracker.phases() {
            assert_eq!(phase, ContainerPhase::Running, "{name}");
        }
    }

    fn all_running() -> StartupTracker {
        let mut tracker = tracker();
        tracker.advance();
        tracker.record_probe(containers::DATABASE, true, 40).unwrap();
        tracker.record_probe(containers::MONITORING, true, 40).unwrap();
        tracker.record_probe(containers::CONSOLE, true, 20).unwrap();
        tracker
    }

    #[test]
    fn test_unhealthy_container_demotes_running_peers() {
        let mut tracker = all_running();

        for elapsed in [130, 160, 190, 220, 250] {
            tracker.record_probe(containers::DATABASE, false, elapsed).unwrap();
        }

        assert_eq!(
            tracker.phases(),
            vec![
                (containers::DATABASE.to_string(), ContainerPhase::Unhealthy),
                (containers::CONSOLE.to_string(), ContainerPhase::Healthy),
                (containers::MONITORING.to_string(), ContainerPhase::Healthy),
            ]
        );
    }

    #[test]
    fn test_exit_demotes_running_peers() {
        let mut tracker = all_running();
        tracker.record_exit(containers::MONITORING, 137).unwrap();

        assert_eq!(tracker.phase(containers::DATABASE), Some(ContainerPhase::Healthy));
        assert_eq!(tracker.phase(containers::CONSOLE), Some(ContainerPhase::Healthy));
        assert_eq!(
            tracker.phase(containers::MONITORING),
            Some(ContainerPhase::Exited { code: 137 })
        );
    }

    #[test]
    fn test_failures_count_after_first_pass_inside_start_period() {
        let mut tracker = tracker();
        tracker.advance();
        tracker.record_probe(containers::DATABASE, true, 10).unwrap();

        // Still inside the 120s start period, but the container already passed.
        for elapsed in [20, 30, 40, 50] {
            assert_eq!(
                tracker.record_probe(containers::DATABASE, false, elapsed).unwrap(),
                ContainerPhase::Healthy
            );
        }
        assert_eq!(
            tracker.record_probe(containers::DATABASE, false, 60).unwrap(),
            ContainerPhase::Unhealthy
        );
    }

    #[test]
    fn test_retries_exhausted_after_start_period() {
        let mut tracker = tracker();
        tracker.advance();

        // Five retries, start period 120s.
        for elapsed in [130, 160, 190, 220] {
            assert_eq!(
                tracker.record_probe(containers::DATABASE, false, elapsed).unwrap(),
                ContainerPhase::Starting
            );
        }
        assert_eq!(
            tracker.record_probe(containers::DATABASE, false, 250).unwrap(),
            ContainerPhase::Unhealthy
        );
        assert_eq!(
            tracker.phase(containers::CONSOLE),
            Some(ContainerPhase::WaitingOnDependency)
        );
    }

    #[test]
    fn test_success_resets_failures() {
        let mut tracker = tracker();
        tracker.advance();
        for elapsed in [130, 160, 190, 220] {
            tracker.record_probe(containers::DATABASE, false, elapsed).unwrap();
        }
        tracker.record_probe(containers::DATABASE, true, 250).unwrap();
        assert_eq!(
            tracker.record_probe(containers::DATABASE, false, 280).unwrap(),
            ContainerPhase::Healthy
        );
    }

    #[test]
    fn test_probe_before_start_is_rejected() {
        let mut tracker = tracker();
        tracker.advance();
        assert!(matches!(
            tracker.record_probe(containers::CONSOLE, true, 0),
            Err(StartupError::NotStarted { .. })
        ));
        assert!(matches!(
            tracker.record_probe("sidecar", true, 0),
            Err(StartupError::UnknownContainer(_))
        ));
    }

    #[test]
    fn test_condition_semantics() {
        assert!(ContainerPhase::Starting.satisfies(DependencyCondition::Start));
        assert!(!ContainerPhase::Starting.satisfies(DependencyCondition::Healthy));
        assert!(ContainerPhase::Running.satisfies(DependencyCondition::Healthy));
        assert!(ContainerPhase::Exited { code: 1 }.satisfies(DependencyCondition::Complete));
        assert!(!ContainerPhase::Exited { code: 1 }.satisfies(DependencyCondition::Success));
        assert!(ContainerPhase::Exited { code: 0 }.satisfies(DependencyCondition::Success));
    }

    #[test]
    fn test_exited_dependency_releases_complete_waiters() {
        let mut tracker = tracker();
        tracker.containers[1].dependency = Some(StartupDependency {
            on_container: containers::DATABASE.to_string(),
            condition: DependencyCondition::Complete,
        });
        tracker.advance();
        assert_eq!(
            tracker.phase(containers::CONSOLE),
            Some(ContainerPhase::WaitingOnDependency)
        );

        tracker.record_exit(containers::DATABASE, 0).unwrap();
        assert_eq!(tracker.phase(containers::CONSOLE), Some(ContainerPhase::Starting));
    }
}
