use glam::{Mat4, Vec3};

/// The fixed camera looking down onto the board.
///
/// The view never changes; only the projection follows the viewport's aspect
/// ratio, recomputed on every resize.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov: f32, // radians
    pub near: f32,
    pub far: f32,
    projection: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 500.0, 250.0),
            target: Vec3::new(0.0, 0.0, 30.0),
            up: Vec3::Y,
            fov: 45f32.to_radians(),
            near: 10.0,
            far: 1000.0,
            projection: Mat4::IDENTITY,
        };
        camera.set_aspect(1.0);
        camera
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the projection for a viewport of the given aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        self.projection = Mat4::perspective_rh(self.fov, aspect, self.near, self.far);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// World to clip space.
    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn to_ndc(camera: &Camera, point: Vec3) -> Vec3 {
        let clip = camera.view_proj() * point.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn target_projects_to_center() {
        let mut camera = Camera::new();
        camera.set_aspect(16.0 / 9.0);

        let ndc = to_ndc(&camera, camera.target);
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn board_is_in_front_of_the_camera() {
        let camera = Camera::new();
        // Corners of the 4x4 layout at 105 unit spacing.
        for (x, z) in [(-157.5, -157.5), (157.5, -157.5), (-157.5, 157.5), (157.5, 157.5)] {
            let ndc = to_ndc(&camera, Vec3::new(x, 0.0, z));
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "corner ({x}, {z}) off screen");
            assert!((0.0..=1.0).contains(&ndc.z));
        }
    }

    #[test]
    fn far_row_is_drawn_higher_on_screen() {
        let camera = Camera::new();
        let near_row = to_ndc(&camera, Vec3::new(0.0, 0.0, 157.5));
        let far_row = to_ndc(&camera, Vec3::new(0.0, 0.0, -157.5));
        assert!(far_row.y > near_row.y);
    }

    #[test]
    fn degenerate_aspect_falls_back_to_square() {
        let mut square = Camera::new();
        square.set_aspect(1.0);
        let mut broken = Camera::new();
        broken.set_aspect(f32::NAN);

        let probe = Vec4::new(10.0, 0.0, 10.0, 1.0);
        assert_eq!(
            square.view_proj() * probe,
            broken.view_proj() * probe
        );
    }
}
