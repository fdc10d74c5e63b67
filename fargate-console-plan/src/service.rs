//! Service instance declaration

use fargate_console_models::{ServiceAddress, ServiceInstance, StackConfig, WorkloadDefinition};

use crate::error::PlanError;
use crate::names::ResourceNames;
use crate::network::NetworkContext;

/// Failed health probes inside this window never replace a task
pub const HEALTH_CHECK_GRACE_PERIOD_SECONDS: u32 = 300;

/// Image pull plus container start, on top of the slowest probe start period
pub const EXPECTED_STARTUP_LATENCY_SECONDS: u32 = 90;

pub fn build_service(
    config: &StackConfig,
    names: &ResourceNames,
    cluster: &str,
    workload: &WorkloadDefinition,
    network: &NetworkContext,
    file_system: &str,
) -> Result<ServiceInstance, PlanError> {
    let service = ServiceInstance {
        name: names.service(),
        address: ServiceAddress::new(cluster, names.service()),
        workload_family: workload.family.clone(),
        access_groups: vec![names.access_group()],
        subnet_ids: network.subnet_ids(),
        desired_count: config.desired_count,
        assign_public_ip: false,
        health_check_grace_period_seconds: HEALTH_CHECK_GRACE_PERIOD_SECONDS,
        file_system: file_system.to_string(),
    };

    check_grace_period(&service, workload)?;

    Ok(service)
}

/// The grace period must outlast the slowest container start
pub fn check_grace_period(
    service: &ServiceInstance,
    workload: &WorkloadDefinition,
) -> Result<(), PlanError> {
    let start_period = workload
        .containers
        .iter()
        .map(|c| c.health_probe.start_period_seconds)
        .max()
        .unwrap_or(0);

    let grace = service.health_check_grace_period_seconds;
    if grace <= start_period + EXPECTED_STARTUP_LATENCY_SECONDS {
        return Err(PlanError::GracePeriodTooShort {
            grace,
            start_period,
            latency: EXPECTED_STARTUP_LATENCY_SECONDS,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::secret_bundle;
    use crate::storage::storage_subsystem;
    use crate::testing::{sample_config, sample_names, sample_network};
    use crate::workload::{build_workload, WorkloadImages};
    use fargate_console_models::RemovalPolicy;

    fn workload() -> WorkloadDefinition {
        let names = sample_names();
        let bundle = secret_bundle(&names, RemovalPolicy::Destroy);
        let storage = storage_subsystem(&names, &sample_network());
        build_workload(
            &sample_config(),
            &names,
            &bundle,
            &storage.volume,
            &WorkloadImages::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_service_declaration() {
        let names = sample_names();
        let service = build_service(
            &sample_config(),
            &names,
            "shared-cluster",
            &workload(),
            &sample_network(),
            &names.file_system(),
        )
        .unwrap();

        assert_eq!(service.desired_count, 1);
        assert!(!service.assign_public_ip);
        assert_eq!(service.health_check_grace_period_seconds, 300);
        assert_eq!(service.subnet_ids, vec!["subnet-a", "subnet-b"]);
        assert_eq!(service.access_groups, vec!["dev-acme-conduktor-sg"]);
        assert_eq!(service.file_system, "dev-acme-conduktor-efs");
        assert_eq!(
            service.address.to_string(),
            "service/shared-cluster/dev-acme-conduktor-service"
        );
    }

    #[test]
    fn test_grace_period_must_cover_slowest_start() {
        let names = sample_names();
        let mut workload = workload();
        let mut service = build_service(
            &sample_config(),
            &names,
            "shared-cluster",
            &workload,
            &sample_network(),
            &names.file_system(),
        )
        .unwrap();

        workload.containers[0].health_probe.start_period_seconds = 240;
        assert!(matches!(
            check_grace_period(&service, &workload),
            Err(PlanError::GracePeriodTooShort { start_period: 240, .. })
        ));

        service.health_check_grace_period_seconds = 600;
        check_grace_period(&service, &workload).unwrap();
    }
}
