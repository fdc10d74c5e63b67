//! Plan builder
//!
//! Turns a [`StackConfig`] into a [`Plan`]. The network is read through the
//! injected [`NetworkLookup`]; nothing else outside the config is consulted, so
//! the same config and network always give the same plan.
//!
//! Any error here aborts before a single resource is declared.

use chrono::{DateTime, Utc};
use fargate_console_models::{ServiceAddress, StackConfig};

use crate::error::PlanError;
use crate::graph::order_resources;
use crate::names::{containers, ResourceNames};
use crate::network::NetworkLookup;
use crate::plan::{Plan, PlannedResource, ResourceProperties};
use crate::schedule::{check_alternating, start_rule, stop_rule};
use crate::secrets::secret_bundle;
use crate::security::{
    ports, storage_access_group, validate_group, workload_access_group, workload_ports,
};
use crate::service::build_service;
use crate::storage::storage_subsystem;
use crate::workload::{build_workload, WorkloadImages};

/// Cluster the service joins when none is configured
pub const DEFAULT_CLUSTER: &str = "default";

/// Days of schedule fires checked for strict start/stop alternation
const SCHEDULE_CHECK_DAYS: i64 = 7;

pub struct PlanBuilder<'a> {
    config: StackConfig,
    network: &'a dyn NetworkLookup,
    cluster: String,
    images: WorkloadImages,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(config: StackConfig, network: &'a dyn NetworkLookup) -> Self {
        Self {
            config,
            network,
            cluster: DEFAULT_CLUSTER.to_string(),
            images: WorkloadImages::default(),
        }
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = cluster.into();
        self
    }

    pub fn with_images(mut self, images: WorkloadImages) -> Self {
        self.images = images;
        self
    }

    /// Address the service will have once applied
    pub fn service_address(&self) -> ServiceAddress {
        ServiceAddress::new(&self.cluster, ResourceNames::new(&self.config).service())
    }

    pub fn build(&self) -> Result<Plan, PlanError> {
        let config = &self.config;
        config.validate()?;

        let names = ResourceNames::new(config);
        tracing::info!(prefix = %names.prefix(), network = %config.network_id, "Building plan");

        // 1. Network
        let network = self.network.resolve(&config.network_id)?;
        tracing::info!(
            network = %network.network_id,
            subnets = network.private_subnets.len(),
            "Network resolved"
        );

        // 2. Access groups
        let workload_group =
            workload_access_group(&names, &network, config.management_cidr, &config.allowlist);
        validate_group(&workload_group, &workload_ports())?;

        let storage_group = storage_access_group(&names, &network);
        validate_group(&storage_group, &[ports::NFS])?;
        tracing::info!(
            rules = workload_group.ingress().len() + storage_group.ingress().len(),
            "Access groups declared"
        );

        // 3. Storage and secrets
        let storage = storage_subsystem(&names, &network);
        let bundle = secret_bundle(&names, config.removal_policy);
        tracing::info!(
            file_system = %storage.file_system.name,
            secrets = %bundle.name,
            "Storage and secrets declared"
        );

        // 4. Workload
        let workload = build_workload(config, &names, &bundle, &storage.volume, &self.images)?;
        tracing::info!(
            family = %workload.family,
            containers = workload.containers.len(),
            "Workload declared"
        );

        // 5. Service
        let service = build_service(
            config,
            &names,
            &self.cluster,
            &workload,
            &network,
            &storage.file_system.name,
        )?;
        tracing::info!(
            service = %service.address,
            desired_count = service.desired_count,
            "Service declared"
        );

        // 6. Schedules
        let start = start_rule(&names, &service.address);
        let stop = stop_rule(&names, &service.address);
        check_alternating(&start, &stop, DateTime::<Utc>::UNIX_EPOCH, SCHEDULE_CHECK_DAYS)?;
        tracing::info!(start = %start.expression, stop = %stop.expression, "Schedules declared");

        // Declaration order; dependencies are explicit
        let log_ids: Vec<String> = [
            containers::DATABASE,
            containers::CONSOLE,
            containers::MONITORING,
        ]
        .into_iter()
        .map(|container| names.log_sink_id(container))
        .collect();

        let mut resources = vec![
            PlannedResource::new(
                names.access_group(),
                ResourceProperties::AccessGroup(workload_group),
            ),
            PlannedResource::new(
                names.storage_access_group(),
                ResourceProperties::AccessGroup(storage_group),
            )
            .depends_on([names.access_group()]),
            PlannedResource::new(
                names.file_system(),
                ResourceProperties::FileSystem(storage.file_system),
            )
            .depends_on([names.storage_access_group()]),
            PlannedResource::new(
                names.access_point(),
                ResourceProperties::AccessPoint(storage.access_point),
            )
            .depends_on([names.file_system()]),
            PlannedResource::new(names.secret_bundle(), ResourceProperties::SecretBundle(bundle)),
        ];

        for (container, id) in workload.containers.iter().zip(&log_ids) {
            resources.push(PlannedResource::new(
                id.clone(),
                ResourceProperties::LogSink(container.log_sink.clone()),
            ));
        }

        resources.push(
            PlannedResource::new(names.task_family(), ResourceProperties::Workload(workload))
                .depends_on([names.secret_bundle(), names.access_point()])
                .depends_on(log_ids.iter().cloned()),
        );

        resources.push(
            PlannedResource::new(names.service(), ResourceProperties::Service(service))
                .depends_on([
                    names.task_family(),
                    names.access_group(),
                    names.file_system(),
                    names.access_point(),
                ]),
        );

        for rule in [start, stop] {
            resources.push(
                PlannedResource::new(rule.name.clone(), ResourceProperties::ScheduleRule(rule))
                    .depends_on([names.service()]),
            );
        }

        let resources = order_resources(resources)?;
        tracing::info!(resources = resources.len(), "Plan ready");

        Ok(Plan {
            prefix: names.prefix().to_string(),
            resources,
        })
    }
}
