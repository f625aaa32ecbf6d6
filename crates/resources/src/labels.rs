//! Label and annotation keys shared across controllers.

/// Links a demand, machine, or request to its machine request set.
pub const LABEL_MACHINE_REQUEST_SET: &str = "fleet.dev/machine-request-set";

/// Cluster a resource belongs to.
pub const LABEL_CLUSTER: &str = "fleet.dev/cluster";

/// Machine set a config patch targets.
pub const LABEL_MACHINE_SET: &str = "fleet.dev/machine-set";

/// Cluster machine a config patch targets.
pub const LABEL_CLUSTER_MACHINE: &str = "fleet.dev/cluster-machine";

/// Machine a config patch targets.
pub const LABEL_MACHINE: &str = "fleet.dev/machine";

/// Machine class a config patch was generated for.
pub const LABEL_MACHINE_CLASS: &str = "fleet.dev/machine-class";

/// Machine-class patch targeting one cluster machine.
pub const LABEL_CLUSTER_MACHINE_CLASS_PATCH: &str = "fleet.dev/cluster-machine-class-patch";

/// Set on a machine that is idle and eligible for release.
pub const LABEL_MACHINE_AVAILABLE: &str = "fleet.dev/available";

/// Annotation on a provider resource holding the name of the last attempted
/// provisioning step, the resume point after a restart.
pub const ANNOTATION_CURRENT_STEP: &str = "infra.fleet.dev/step";
