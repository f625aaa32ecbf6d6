//! Config patch lookup by machine and machine set.

use resources::{
    ClusterMachine, ConfigPatch, MachineSet, LABEL_CLUSTER, LABEL_CLUSTER_MACHINE,
    LABEL_CLUSTER_MACHINE_CLASS_PATCH, LABEL_MACHINE, LABEL_MACHINE_CLASS, LABEL_MACHINE_SET,
};
use store::{LabelQuery, TypedClient};

use crate::error::ControllerError;

/// Looks up the config patches applicable to a machine from a snapshot of
/// all patches.
pub struct ConfigPatchHelper {
    all_patches: Vec<ConfigPatch>,
}

impl ConfigPatchHelper {
    /// Takes a snapshot of every config patch in the store.
    pub async fn load(patches: &TypedClient<ConfigPatch>) -> Result<Self, ControllerError> {
        Ok(Self {
            all_patches: patches.list(&LabelQuery::new()).await?,
        })
    }

    /// Collects the patches applying to `machine` within `machine_set`, in
    /// precedence order:
    ///
    /// 1. cluster-wide patches,
    /// 2. machine-set patches,
    /// 3. cluster-machine-class patches,
    /// 4. cluster-machine patches,
    /// 5. machine patches.
    ///
    /// Store order is preserved within each level, and only Running-phase
    /// patches are returned.
    pub fn get(
        &self,
        machine: &ClusterMachine,
        machine_set: &MachineSet,
    ) -> Result<Vec<&ConfigPatch>, ControllerError> {
        let machine_id = machine.metadata.id.as_str();
        let cluster = machine
            .metadata
            .labels
            .get(LABEL_CLUSTER)
            .ok_or_else(|| ControllerError::MissingClusterLabel(machine_id.to_owned()))?;

        // machine-class generated patches never apply at the cluster levels
        let cluster_scope = LabelQuery::new()
            .eq(LABEL_CLUSTER, cluster)
            .not_exists(LABEL_MACHINE_CLASS)
            .not_exists(LABEL_CLUSTER_MACHINE_CLASS_PATCH);

        let mut cluster_patches = Vec::new();
        let mut machine_set_patches = Vec::new();
        let mut cluster_machine_patches = Vec::new();

        for patch in &self.all_patches {
            if !cluster_scope.matches(&patch.metadata.labels) {
                continue;
            }

            let for_machine_set = patch.metadata.labels.get(LABEL_MACHINE_SET);
            let for_cluster_machine = patch.metadata.labels.get(LABEL_CLUSTER_MACHINE);

            match (for_machine_set, for_cluster_machine) {
                (Some(set), _) if set == machine_set.metadata.id => {
                    machine_set_patches.push(patch);
                }
                (_, Some(id)) if id == machine_id => {
                    cluster_machine_patches.push(patch);
                }
                (None, None) => cluster_patches.push(patch),
                _ => {}
            }
        }

        let machine_class_patches = self.all_patches.iter().filter(|patch| {
            patch.metadata.labels.get(LABEL_CLUSTER_MACHINE_CLASS_PATCH) == Some(machine_id)
        });
        let machine_patches = self
            .all_patches
            .iter()
            .filter(|patch| patch.metadata.labels.get(LABEL_MACHINE) == Some(machine_id));

        Ok(cluster_patches
            .into_iter()
            .chain(machine_set_patches)
            .chain(machine_class_patches)
            .chain(cluster_machine_patches)
            .chain(machine_patches)
            .filter(|patch| !patch.metadata.phase.is_tearing_down())
            .collect())
    }
}
