use formats::ProjectedCollection;
use layers::{AREA_LIST_NAME, AreaStyle, RegionMeshFactory};
use scene::Node;
use scene::components::{GroupKind, GroupTag};

use crate::config::ErrorPolicy;
use crate::error::EngineError;
use crate::state::SceneState;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionReport {
    pub built: usize,
    pub skipped: usize,
}

/// Builds every region block under a fresh `NAME_AREA_LIST` container.
pub fn build_regions(
    state: &mut SceneState,
    projected: &ProjectedCollection,
    style: &AreaStyle,
    policy: ErrorPolicy,
) -> Result<RegionReport, EngineError> {
    let factory = RegionMeshFactory::new(style)?;
    let root = state.graph.root();
    let list = state.graph.add_child(
        root,
        Node::group()
            .named(AREA_LIST_NAME)
            .tagged(GroupTag::new(GroupKind::RegionList, AREA_LIST_NAME)),
    )?;
    state.area_list = Some(list);

    let mut report = RegionReport::default();
    for feature in &projected.features {
        match factory.build(
            &mut state.graph,
            &mut state.resources,
            list,
            feature,
            &mut state.hit_targets,
        ) {
            Ok(_) => report.built += 1,
            Err(err) => {
                policy.absorb("region", err)?;
                report.skipped += 1;
            }
        }
    }

    if projected.features.is_empty() {
        tracing::warn!("dataset has no features, no regions built");
    }
    tracing::info!(built = report.built, skipped = report.skipped, "regions built");
    Ok(report)
}
