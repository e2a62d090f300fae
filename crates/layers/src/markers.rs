use formats::{Feature, project_anchor};
use foundation::math::{MercatorProjection, ProjectionError, Vec3};
use scene::components::{GroupKind, GroupTag, MarkerId, OverlayLayer, OverlaySprite};
use scene::{GraphError, Node, NodeId, NodeKind, SceneGraph};

use crate::theme::PointStyle;

/// Name of the container holding every point marker.
pub const POINT_LIST_NAME: &str = "NAME_POINT_LIST";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkerError {
    #[error("marker features must be points, got {0}")]
    NotAPoint(&'static str),
    #[error("malformed marker feature: {0}")]
    Malformed(String),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub struct PointMarkerFactory<'a> {
    projection: &'a MercatorProjection,
    style: &'a PointStyle,
}

impl<'a> PointMarkerFactory<'a> {
    pub fn new(projection: &'a MercatorProjection, style: &'a PointStyle) -> Self {
        Self { projection, style }
    }

    /// Creates an empty, detached marker container.
    pub fn container(&self, graph: &mut SceneGraph) -> NodeId {
        graph.add_node(
            Node::group()
                .named(POINT_LIST_NAME)
                .tagged(GroupTag::new(GroupKind::MarkerList, POINT_LIST_NAME)),
        )
    }

    /// Adds one icon+label marker for a point feature under `container`.
    pub fn build(
        &self,
        graph: &mut SceneGraph,
        container: NodeId,
        marker: MarkerId,
        icon_url: &str,
        feature: &Feature,
    ) -> Result<NodeId, MarkerError> {
        if let Some(reason) = &feature.invalid {
            return Err(MarkerError::Malformed(reason.clone()));
        }
        let anchor = project_anchor(self.projection, feature)
            .ok_or(MarkerError::NotAPoint(feature.geometry_type()))??;
        let name = feature.name().unwrap_or_default();
        let sprite = OverlaySprite::marker(
            OverlayLayer::Sprites,
            self.style.layout_class.clone(),
            marker,
            icon_url,
            name.clone(),
        );

        let mut node = Node::new(NodeKind::Sprite(sprite))
            .named(name.clone())
            .tagged(GroupTag::new(GroupKind::Marker, name))
            .at(Vec3::new(anchor.x, anchor.y, self.style.z_offset));
        node.transform.scale = Vec3::ONE * self.style.scale;
        Ok(graph.add_child(container, node)?)
    }
}
