//! Workload definition builder
//!
//! Builds the task budget and the three container specs: the database, the
//! console (started only once the database is healthy) and the monitoring
//! sidecar.

use std::collections::BTreeMap;

use fargate_console_models::{
    ContainerSpec, DependencyCondition, HealthProbe, LogSink, MountPoint, PortMapping,
    RemovalPolicy, SecretBundle, StackConfig, StartupDependency, StorageVolume, TaskBudget,
    Ulimit, UlimitName, WorkloadDefinition,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PlanError;
use crate::names::{containers, ResourceNames};
use crate::secrets::{fields, resolve_refs};
use crate::security::ports;

/// Pinned images; never `latest`
pub mod images {
    pub const DATABASE: &str = "postgres:14.11";
    pub const CONSOLE: &str = "conduktor/conduktor-console:1.21.0";
    pub const MONITORING: &str = "conduktor/conduktor-console-cortex:1.21.0";
}

pub const DATABASE_DATA_DIR: &str = "/var/lib/postgresql/data";

pub const LOG_RETENTION_DAYS: u32 = 60;

/// Log lines matching this start a new record; stack traces stay attached
pub const MULTILINE_PATTERN: &str = r"^(INFO|DEBUG|WARN|ERROR|CRITICAL)";

pub const DATABASE_ULIMIT: u32 = 65536;

static RECORD_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(MULTILINE_PATTERN).expect("multiline pattern is a valid regex"));

/// Does `line` open a new log record
pub fn is_record_boundary(line: &str) -> bool {
    RECORD_START.is_match(line)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadImages {
    pub database: String,
    pub console: String,
    pub monitoring: String,
}

impl Default for WorkloadImages {
    fn default() -> Self {
        Self {
            database: images::DATABASE.to_string(),
            console: images::CONSOLE.to_string(),
            monitoring: images::MONITORING.to_string(),
        }
    }
}

/// Slice of the task budget given to one container
#[derive(Debug, Clone, Copy)]
struct Share {
    cpu: u32,
    memory: u32,
}

impl Share {
    /// `budget / divisor`, rounded down so shares never exceed the budget
    fn of(budget: TaskBudget, divisor: u32) -> Self {
        Self {
            cpu: budget.cpu_units / divisor,
            memory: budget.memory_mib / divisor,
        }
    }
}

pub fn build_workload(
    config: &StackConfig,
    names: &ResourceNames,
    bundle: &SecretBundle,
    volume: &StorageVolume,
    images: &WorkloadImages,
) -> Result<WorkloadDefinition, PlanError> {
    let budget = TaskBudget {
        cpu_units: config.cpu_units,
        memory_mib: config.memory_limit,
    };

    let containers = vec![
        database_container(names, bundle, volume, &images.database, Share::of(budget, 4))?,
        console_container(
            names,
            bundle,
            &images.console,
            &config.health_check_path,
            Share::of(budget, 2),
        )?,
        monitoring_container(names, &images.monitoring, Share::of(budget, 4)),
    ];

    let workload = WorkloadDefinition {
        family: names.task_family(),
        budget,
        containers,
        volumes: vec![volume.clone()],
    };

    validate_workload(&workload)?;

    tracing::debug!(
        family = %workload.family,
        cpu = workload.cpu_allocated(),
        memory = workload.memory_allocated(),
        "Workload definition built"
    );

    Ok(workload)
}

fn database_container(
    names: &ResourceNames,
    bundle: &SecretBundle,
    volume: &StorageVolume,
    image: &str,
    share: Share,
) -> Result<ContainerSpec, PlanError> {
    let secrets = resolve_refs(
        bundle,
        containers::DATABASE,
        &[
            (fields::POSTGRES_USER, fields::POSTGRES_USER),
            (fields::POSTGRES_PASSWORD, fields::POSTGRES_PASSWORD),
            (fields::POSTGRES_DB, fields::POSTGRES_DB),
        ],
    )?;

    Ok(ContainerSpec {
        name: containers::DATABASE.to_string(),
        image: image.to_string(),
        essential: true,
        cpu_share: share.cpu,
        memory_share: share.memory,
        environment: BTreeMap::from([(
            "PGDATA".to_string(),
            format!("{DATABASE_DATA_DIR}/pgdata"),
        )]),
        secrets,
        health_probe: HealthProbe {
            command: shell(r#"pg_isready -U "$POSTGRES_USER" -d "$POSTGRES_DB""#),
            interval_seconds: 30,
            timeout_seconds: 5,
            retries: 5,
            start_period_seconds: 120,
        },
        ports: vec![PortMapping::tcp("postgresql", ports::POSTGRES)],
        mounts: vec![MountPoint {
            volume: volume.name.clone(),
            container_path: DATABASE_DATA_DIR.to_string(),
            read_only: false,
        }],
        ulimits: vec![
            Ulimit {
                name: UlimitName::Nofile,
                soft_limit: DATABASE_ULIMIT,
                hard_limit: DATABASE_ULIMIT,
            },
            Ulimit {
                name: UlimitName::Nproc,
                soft_limit: DATABASE_ULIMIT,
                hard_limit: DATABASE_ULIMIT,
            },
        ],
        log_sink: log_sink(names, containers::DATABASE),
        startup_dependency: None,
    })
}

fn console_container(
    names: &ResourceNames,
    bundle: &SecretBundle,
    image: &str,
    health_check_path: &str,
    share: Share,
) -> Result<ContainerSpec, PlanError> {
    let secrets = resolve_refs(
        bundle,
        containers::CONSOLE,
        &[
            (fields::CDK_ADMIN_EMAIL, fields::CDK_ADMIN_EMAIL),
            (fields::CDK_ADMIN_PASSWORD, fields::CDK_ADMIN_PASSWORD),
            (fields::CDK_DATABASE_NAME, fields::CDK_DATABASE_NAME),
            (fields::CDK_DATABASE_PASSWORD, fields::CDK_DATABASE_PASSWORD),
            (fields::CDK_DATABASE_PORT, fields::CDK_DATABASE_PORT),
            (fields::CDK_DATABASE_USERNAME, fields::CDK_DATABASE_USERNAME),
        ],
    )?;

    let monitoring = |port: u16| format!("http://localhost:{port}/");
    let environment = BTreeMap::from([
        ("CDK_DATABASE_HOST".to_string(), "localhost".to_string()),
        ("CDK_LISTENING_PORT".to_string(), ports::CONSOLE.to_string()),
        (
            "CDK_MONITORING_CORTEX-URL".to_string(),
            monitoring(ports::MONITORING_CORTEX),
        ),
        (
            "CDK_MONITORING_ALERT-MANAGER-URL".to_string(),
            monitoring(ports::MONITORING_ALERTMANAGER),
        ),
        (
            "CDK_MONITORING_CALLBACK-URL".to_string(),
            format!("http://localhost:{}/monitoring/api/", ports::CONSOLE),
        ),
        (
            "CDK_MONITORING_NOTIFICATIONS-CALLBACK-URL".to_string(),
            format!("http://localhost:{}", ports::CONSOLE),
        ),
    ]);

    Ok(ContainerSpec {
        name: containers::CONSOLE.to_string(),
        image: image.to_string(),
        essential: true,
        cpu_share: share.cpu,
        memory_share: share.memory,
        environment,
        secrets,
        health_probe: HealthProbe {
            command: shell(&format!(
                "curl -f http://localhost:{}{} || exit 1",
                ports::CONSOLE,
                health_check_path
            )),
            interval_seconds: 30,
            timeout_seconds: 5,
            retries: 3,
            start_period_seconds: 60,
        },
        ports: vec![PortMapping::tcp("console", ports::CONSOLE)],
        mounts: Vec::new(),
        ulimits: Vec::new(),
        log_sink: log_sink(names, containers::CONSOLE),
        startup_dependency: Some(StartupDependency {
            on_container: containers::DATABASE.to_string(),
            condition: DependencyCondition::Healthy,
        }),
    })
}

/// Reads the console's metrics but declares no startup dependency on it.
fn monitoring_container(names: &ResourceNames, image: &str, share: Share) -> ContainerSpec {
    ContainerSpec {
        name: containers::MONITORING.to_string(),
        image: image.to_string(),
        essential: true,
        cpu_share: share.cpu,
        memory_share: share.memory,
        environment: BTreeMap::from([(
            "CDK_CONSOLE-URL".to_string(),
            format!("http://localhost:{}", ports::CONSOLE),
        )]),
        secrets: BTreeMap::new(),
        health_probe: HealthProbe {
            command: shell(&format!(
                "curl -f http://localhost:{}/ready || exit 1",
                ports::MONITORING_CORTEX
            )),
            interval_seconds: 30,
            timeout_seconds: 5,
            retries: 3,
            start_period_seconds: 60,
        },
        ports: vec![
            PortMapping::tcp("prometheus", ports::MONITORING_PROMETHEUS),
            PortMapping::tcp("alertmanager", ports::MONITORING_ALERTMANAGER),
            PortMapping::tcp("cortex", ports::MONITORING_CORTEX),
        ],
        mounts: Vec::new(),
        ulimits: Vec::new(),
        log_sink: log_sink(names, containers::MONITORING),
        startup_dependency: None,
    }
}

pub fn log_sink(names: &ResourceNames, container: &str) -> LogSink {
    LogSink {
        group_name: names.log_group(container),
        stream_prefix: container.to_string(),
        retention_days: LOG_RETENTION_DAYS,
        removal_policy: RemovalPolicy::Destroy,
        multiline_pattern: MULTILINE_PATTERN.to_string(),
    }
}

fn shell(command: &str) -> Vec<String> {
    vec!["CMD-SHELL".to_string(), command.to_string()]
}

/// Check the invariants every workload definition must hold
pub fn validate_workload(workload: &WorkloadDefinition) -> Result<(), PlanError> {
    let cpu = workload.cpu_allocated();
    if cpu > workload.budget.cpu_units {
        return Err(PlanError::BudgetExceeded {
            resource: "cpu units",
            requested: cpu,
            budget: workload.budget.cpu_units,
        });
    }

    let memory = workload.memory_allocated();
    if memory > workload.budget.memory_mib {
        return Err(PlanError::BudgetExceeded {
            resource: "MiB memory",
            requested: memory,
            budget: workload.budget.memory_mib,
        });
    }

    for container in &workload.containers {
        match container.image_tag() {
            Some(tag) if tag != "latest" => {}
            _ => return Err(PlanError::UnpinnedImage(container.image.clone())),
        }

        if let Some(dependency) = &container.startup_dependency {
            if workload.container(&dependency.on_container).is_none() {
                return Err(PlanError::UnknownDependency {
                    container: container.name.clone(),
                    on: dependency.on_container.clone(),
                });
            }
        }

        Regex::new(&container.log_sink.multiline_pattern).map_err(|e| PlanError::LogPattern {
            container: container.name.clone(),
            pattern: container.log_sink.multiline_pattern.clone(),
            reason: e.to_string(),
        })?;
    }

    for volume in &workload.volumes {
        let writers = workload.writers_of(&volume.name).len();
        if writers != 1 {
            return Err(PlanError::VolumeWriters {
                volume: volume.name.clone(),
                writers,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::secret_bundle;
    use crate::storage::storage_subsystem;
    use crate::testing::{sample_config, sample_names, sample_network};

    fn build() -> WorkloadDefinition {
        let config = sample_config();
        let names = sample_names();
        let bundle = secret_bundle(&names, RemovalPolicy::Destroy);
        let storage = storage_subsystem(&names, &sample_network());
        build_workload(&config, &names, &bundle, &storage.volume, &WorkloadImages::default())
            .unwrap()
    }

    #[test]
    fn test_container_order_and_ports() {
        let workload = build();
        let names: Vec<_> = workload.containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["postgresql", "conduktor-console", "conduktor-monitoring"]);

        let db = workload.container(containers::DATABASE).unwrap();
        assert_eq!(db.container_ports(), vec![5432]);

        let console = workload.container(containers::CONSOLE).unwrap();
        assert_eq!(console.container_ports(), vec![8080]);

        let monitoring = workload.container(containers::MONITORING).unwrap();
        assert_eq!(monitoring.container_ports(), vec![9090, 9010, 9009]);
        assert!(!monitoring.exposes(9095));
    }

    #[test]
    fn test_database_container() {
        let workload = build();
        let db = workload.container(containers::DATABASE).unwrap();

        assert_eq!(db.image, "postgres:14.11");
        assert_eq!(db.mounts.len(), 1);
        assert_eq!(db.mounts[0].container_path, DATABASE_DATA_DIR);
        assert!(!db.mounts[0].read_only);

        let probe = &db.health_probe;
        assert!(probe.command[1].starts_with("pg_isready"));
        assert_eq!(
            (
                probe.interval_seconds,
                probe.timeout_seconds,
                probe.retries,
                probe.start_period_seconds
            ),
            (30, 5, 5, 120)
        );

        assert_eq!(db.ulimits.len(), 2);
        assert!(db.ulimits.iter().all(|u| u.soft_limit == 65536 && u.hard_limit == 65536));

        let fields: Vec<_> = db.secrets.values().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["POSTGRES_DB", "POSTGRES_PASSWORD", "POSTGRES_USER"]);
    }

    #[test]
    fn test_console_waits_for_healthy_database() {
        let workload = build();
        let console = workload.container(containers::CONSOLE).unwrap();

        let dependency = console.startup_dependency.as_ref().unwrap();
        assert_eq!(dependency.on_container, containers::DATABASE);
        assert_eq!(dependency.condition, DependencyCondition::Healthy);

        assert!(console.mounts.is_empty());
        assert!(console.health_probe.command[1].contains("/api/health/live"));
        assert_eq!(console.secrets.len(), 6);
    }

    #[test]
    fn test_monitoring_declares_no_dependency() {
        let workload = build();
        let monitoring = workload.container(containers::MONITORING).unwrap();
        assert!(monitoring.startup_dependency.is_none());
        assert!(monitoring.environment["CDK_CONSOLE-URL"].contains("8080"));
    }

    #[test]
    fn test_shares_fit_budget() {
        let workload = build();
        assert!(workload.fits_budget());
        assert_eq!(workload.cpu_allocated(), 1024);
        assert_eq!(workload.memory_allocated(), 4096);
    }

    #[test]
    fn test_log_sinks() {
        let workload = build();
        for container in &workload.containers {
            let sink = &container.log_sink;
            assert_eq!(sink.group_name, format!("dev-acme-conduktor/{}", container.name));
            assert_eq!(sink.retention_days, 60);
            assert!(sink.removal_policy.is_destructive());
        }
    }

    #[test]
    fn test_record_boundaries() {
        assert!(is_record_boundary("INFO  starting console"));
        assert!(is_record_boundary("CRITICAL out of memory"));
        assert!(!is_record_boundary("    at io.conduktor.Main.run(Main.java:42)"));
        assert!(!is_record_boundary("java.lang.IllegalStateException: boom"));
    }

    #[test]
    fn test_validate_rejects_overcommit() {
        let mut workload = build();
        workload.containers[0].cpu_share += 1;
        assert!(matches!(
            validate_workload(&workload),
            Err(PlanError::BudgetExceeded { resource: "cpu units", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_latest_image() {
        let mut workload = build();
        workload.containers[0].image = "postgres:latest".to_string();
        assert!(matches!(
            validate_workload(&workload),
            Err(PlanError::UnpinnedImage(_))
        ));

        workload.containers[0].image = "postgres".to_string();
        assert!(validate_workload(&workload).is_err());
    }

    #[test]
    fn test_validate_rejects_second_writer() {
        let mut workload = build();
        let mount = workload.containers[0].mounts[0].clone();
        workload.containers[1].mounts.push(mount);
        assert!(matches!(
            validate_workload(&workload),
            Err(PlanError::VolumeWriters { writers: 2, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_dependency() {
        let mut workload = build();
        workload.containers[2].startup_dependency = Some(StartupDependency {
            on_container: "missing".to_string(),
            condition: DependencyCondition::Start,
        });
        assert!(matches!(
            validate_workload(&workload),
            Err(PlanError::UnknownDependency { .. })
        ));
    }
}
