//! Source pose and coordinate projection.
//!
//! The transmittance model is axisymmetric about the fiber axis, so every
//! 3D point must first be reduced to an (axial, radial) offset pair
//! relative to the source pose. This projection is used both to populate
//! coupling coefficients and to sample light cones for visualization.

use nalgebra::{Point3, Unit, Vector3};

/// Position and orientation of a directional point light source.
#[derive(Debug, Clone)]
pub struct SourcePose {
    /// Location of the emitting tip (m).
    pub location: Point3<f64>,
    /// Unit direction the source is pointing.
    pub direction: Unit<Vector3<f64>>,
}

impl SourcePose {
    /// Pose from a location and an arbitrary (non-zero) direction vector,
    /// which is normalised.
    pub fn new(location: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            location,
            direction: Unit::new_normalize(direction),
        }
    }

    /// Pose at the origin pointing along +z.
    pub fn origin_down_z() -> Self {
        Self::new(Point3::origin(), Vector3::z())
    }

    /// Project a point onto this pose's axis.
    ///
    /// Returns `(radial, axial)` offsets in meters: the axial offset is
    /// the signed distance along the direction vector, the radial offset
    /// is the perpendicular distance from the axis.
    pub fn project(&self, point: &Point3<f64>) -> (f64, f64) {
        let rel = point - self.location;
        let axial = rel.dot(&self.direction);
        let radial = (rel - axial * self.direction.into_inner()).norm();
        (radial, axial)
    }

    /// Project a whole set of points, preserving order.
    pub fn project_all(&self, points: &[Point3<f64>]) -> Vec<(f64, f64)> {
        points.iter().map(|p| self.project(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_axis_point() {
        let pose = SourcePose::origin_down_z();
        let (r, z) = pose.project(&Point3::new(0.0, 0.0, 2.5));
        assert!(r.abs() < 1e-12);
        assert!((z - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_off_axis_point() {
        let pose = SourcePose::origin_down_z();
        let (r, z) = pose.project(&Point3::new(3.0, 4.0, 1.0));
        assert!((r - 5.0).abs() < 1e-12);
        assert!((z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_translated_tilted_pose() {
        // Source at (1, 0, 0) pointing along +x: a point 2 m further along
        // x and 1 m off in y has axial 2, radial 1.
        let pose = SourcePose::new(Point3::new(1.0, 0.0, 0.0), Vector3::x());
        let (r, z) = pose.project(&Point3::new(3.0, 1.0, 0.0));
        assert!((r - 1.0).abs() < 1e-12);
        assert!((z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_direction_is_normalised() {
        let pose = SourcePose::new(Point3::origin(), Vector3::new(0.0, 0.0, 10.0));
        let (_, z) = pose.project(&Point3::new(0.0, 0.0, 1.0));
        assert!((z - 1.0).abs() < 1e-12);
    }
}
