use foundation::math::Vec3;

/// Translation + non-uniform scale. Rotation is never needed by the map scene.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            scale: Vec3::ONE,
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn apply(&self, p: Vec3) -> Vec3 {
        p.mul_elem(self.scale) + self.position
    }

    /// `parent ∘ self`: the transform of a child expressed in the parent's space.
    pub fn then(&self, parent: &Transform) -> Transform {
        Transform {
            position: parent.apply(self.position),
            scale: self.scale.mul_elem(parent.scale),
        }
    }
}
