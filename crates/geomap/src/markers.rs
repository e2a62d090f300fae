//! Point marker replacement.
//!
//! A new marker set is built detached, then the previous container is disposed and
//! removed, and only then is the new one attached. Under the strict policy a failing
//! marker discards the half-built set and leaves the old one in place.

use std::collections::BTreeMap;

use formats::{Feature, Properties};
use foundation::math::MercatorProjection;
use layers::{PointMarkerFactory, PointStyle};
use scene::components::MarkerId;
use scene::{DisposeReport, NodeId, dispose_subtree};

use crate::config::ErrorPolicy;
use crate::error::EngineError;
use crate::state::SceneState;

/// The markers currently in the scene and the properties each one reports on click.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSet {
    pub container: NodeId,
    entries: BTreeMap<MarkerId, Properties>,
}

impl MarkerSet {
    pub fn properties(&self, marker: MarkerId) -> Option<&Properties> {
        self.entries.get(&marker)
    }

    pub fn ids(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerReplacement {
    pub added: usize,
    pub skipped: usize,
    /// Disposal of the previous set, if there was one.
    pub disposed: Option<DisposeReport>,
}

/// Monotonic marker ids; never reused, so a click on a stale DOM element cannot reach a
/// newer marker.
#[derive(Debug, Default)]
pub struct MarkerIds {
    next: u64,
}

impl MarkerIds {
    pub fn next_id(&mut self) -> MarkerId {
        self.next += 1;
        MarkerId(self.next)
    }
}

pub fn replace_markers(
    state: &mut SceneState,
    ids: &mut MarkerIds,
    projection: &MercatorProjection,
    style: &PointStyle,
    policy: ErrorPolicy,
    icon_url: &str,
    points: &[Feature],
) -> Result<MarkerReplacement, EngineError> {
    let factory = PointMarkerFactory::new(projection, style);
    let container = factory.container(&mut state.graph);
    let mut entries = BTreeMap::new();
    let mut skipped = 0usize;

    for feature in points {
        let marker = ids.next_id();
        match factory.build(&mut state.graph, container, marker, icon_url, feature) {
            Ok(_) => {
                entries.insert(marker, feature.properties.clone());
            }
            Err(err) => {
                if let Err(err) = policy.absorb("marker", err) {
                    discard(state, container);
                    return Err(err);
                }
                skipped += 1;
            }
        }
    }

    let disposed = match state.markers.take() {
        Some(previous) => {
            let report = dispose_subtree(&mut state.graph, &mut state.resources, previous.container)?;
            state.graph.remove_node(previous.container)?;
            Some(report)
        }
        None => None,
    };

    let root = state.graph.root();
    state.graph.attach(root, container)?;
    let added = entries.len();
    state.markers = Some(MarkerSet { container, entries });

    tracing::debug!(added, skipped, "markers replaced");
    Ok(MarkerReplacement {
        added,
        skipped,
        disposed,
    })
}

fn discard(state: &mut SceneState, container: NodeId) {
    let removed = dispose_subtree(&mut state.graph, &mut state.resources, container)
        .map_err(EngineError::from)
        .and_then(|_| state.graph.remove_node(container).map_err(EngineError::from));
    if let Err(err) = removed {
        tracing::warn!(error = %err, "failed to discard partial marker set");
    }
}
