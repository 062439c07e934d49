//! A pinhole camera generating primary rays for the diagnostic
//! renderer.

// pbrt
use crate::core::geometry::{vec3_cross_vec3, Bounds3f, Point3f, Ray, Vector3f};
use crate::core::pbrt::{radians, Float};

#[derive(Debug, Copy, Clone)]
pub struct Camera {
    pub eye: Point3f,
    /// normalized viewing direction
    forward: Vector3f,
    /// half width of the image plane at distance one
    right: Vector3f,
    /// half height of the image plane at distance one
    up: Vector3f,
    pub resolution: (u32, u32),
}

impl Camera {
    /// Look from *eye* at *target*; *fov* (in degrees) spans the
    /// shorter image axis.
    pub fn look_at(
        eye: Point3f,
        target: Point3f,
        up: Vector3f,
        fov: Float,
        resolution: (u32, u32),
    ) -> Self {
        assert!(resolution.0 > 0 && resolution.1 > 0);
        let forward: Vector3f = (target - eye).normalize();
        let right: Vector3f = vec3_cross_vec3(&forward, &up).normalize();
        let true_up: Vector3f = vec3_cross_vec3(&right, &forward);
        let tan_half: Float = (radians(fov) * 0.5 as Float).tan();
        let aspect: Float = resolution.0 as Float / resolution.1 as Float;
        let (sx, sy) = if aspect > 1.0 as Float {
            (tan_half * aspect, tan_half)
        } else {
            (tan_half, tan_half / aspect)
        };
        Camera {
            eye,
            forward,
            right: right * sx,
            up: true_up * sy,
            resolution,
        }
    }
    /// A view of the whole box *b*, slightly from above and the side.
    pub fn framing(b: &Bounds3f, fov: Float, resolution: (u32, u32)) -> Self {
        let target: Point3f = b.centroid();
        let radius: Float = (b.diagonal().length() * 0.5 as Float).max(1e-3);
        let distance: Float = 1.1 as Float * radius / (radians(fov) * 0.5 as Float).sin();
        let dir: Vector3f = Vector3f {
            x: 0.6,
            y: 0.5,
            z: -1.0,
        }
        .normalize();
        let up: Vector3f = Vector3f {
            x: 0.0,
            y: 1.0,
            z: 0.0,
        };
        Camera::look_at(target + dir * distance, target, up, fov, resolution)
    }
    /// Ray through the raster position `(x, y)`, *y* pointing down.
    pub fn generate_ray(&self, x: Float, y: Float) -> Ray {
        let sx: Float = 2.0 as Float * x / self.resolution.0 as Float - 1.0 as Float;
        let sy: Float = 1.0 as Float - 2.0 as Float * y / self.resolution.1 as Float;
        let d: Vector3f = (self.forward + self.right * sx + self.up * sy).normalize();
        Ray::new(self.eye, d, 0.0 as Float, std::f32::INFINITY)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn center_ray_looks_at_target() {
        let cam = Camera::look_at(
            Point3f {
                x: 0.0,
                y: 0.0,
                z: -5.0,
            },
            Point3f {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            Vector3f {
                x: 0.0,
                y: 1.0,
                z: 0.0,
            },
            45.0,
            (64, 32),
        );
        let r = cam.generate_ray(32.0, 16.0);
        assert_relative_eq!(r.d.z, 1.0, epsilon = 1e-6);
        // top of the image looks up
        let top = cam.generate_ray(32.0, 0.0);
        assert!(top.d.y > 0.0);
        assert_relative_eq!(top.d.y / top.d.z, (radians(45.0) * 0.5).tan(), epsilon = 1e-5);
    }
}
