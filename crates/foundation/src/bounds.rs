use crate::math::Vec3;

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    /// Tight bounds over `points`; `None` when empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Aabb3::new(first.as_array(), first.as_array());
        for p in iter {
            out.extend(*p);
        }
        Some(out)
    }

    pub fn extend(&mut self, p: Vec3) {
        let a = p.as_array();
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(a[axis]);
            self.max[axis] = self.max[axis].max(a[axis]);
        }
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        let o = offset.as_array();
        let mut out = *self;
        for axis in 0..3 {
            out.min[axis] += o[axis];
            out.max[axis] += o[axis];
        }
        out
    }

    /// Slab test; returns the entry distance along `dir` within `[t_min, t_max]`.
    pub fn ray_hit_t(&self, origin: Vec3, dir: Vec3, mut t_min: f64, mut t_max: f64) -> Option<f64> {
        let o = origin.as_array();
        let d = dir.as_array();
        for axis in 0..3 {
            let (min, max) = (self.min[axis], self.max[axis]);
            if d[axis].abs() < 1e-12 {
                if o[axis] < min || o[axis] > max {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d[axis];
            let mut t1 = (min - o[axis]) * inv;
            let mut t2 = (max - o[axis]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_max < t_min {
                return None;
            }
        }

        Some(t_min.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb3;
    use crate::math::Vec3;

    #[test]
    fn from_points_is_tight() {
        let pts = [Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 0.5)];
        let b = Aabb3::from_points(pts.iter()).expect("bounds");
        assert_eq!(b.min, [-1.0, -2.0, 0.0]);
        assert_eq!(b.max, [1.0, 3.0, 0.5]);
        assert!(Aabb3::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn ray_enters_box() {
        let b = Aabb3::new([4.0, -1.0, -1.0], [6.0, 1.0, 1.0]);
        let t = b
            .ray_hit_t(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 0.0, f64::INFINITY)
            .expect("hit");
        assert_eq!(t, 4.0);
        assert!(b
            .ray_hit_t(Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0), 0.0, f64::INFINITY)
            .is_none());
    }
}
