/// Marker distinguishing engine-built groups from other scene-graph nodes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// One extruded region (body, outlines, label).
    RegionBlock,
    /// Container holding every region block.
    RegionList,
    /// Container holding every point marker.
    MarkerList,
    /// One point marker.
    Marker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTag {
    pub kind: GroupKind,
    pub name: String,
}

impl GroupTag {
    pub fn new(kind: GroupKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}
