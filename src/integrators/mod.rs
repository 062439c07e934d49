//! Diagnostic images of a BVH, rendered tile by tile on all cores.
//!
//! - Heatmap: number of node boxes tested per primary ray
//! - Normals: shading normal of the closest hit
//! - AmbientOcclusion: fraction of unoccluded hemisphere directions,
//!   exercising the any-hit query
//!
//! ## Ambient Occlusion (AO)
//!
//! Rays which reach the background increase the brightness of the
//! surface, whereas a ray which hits any other triangle contributes
//! nothing. Points surrounded by a lot of geometry are rendered dark.

// std
use std::io::{Error, ErrorKind, Result};
// others
use log::debug;
// pbrt
use crate::accelerators::bvh::BVHAccel;
use crate::blockqueue::BlockQueue;
use crate::core::camera::Camera;
use crate::core::film::{Film, FilmTile};
use crate::core::geometry::{nrm_faceforward_nrm, vec3_dot_vec3f, Normal3f, Ray, Vector3f};
use crate::core::interaction::SurfaceInteraction;
use crate::core::pbrt::Float;
use crate::core::rng::Rng;

const TILE_SIZE: u32 = 16;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DiagnosticMode {
    Heatmap,
    Normals,
    AmbientOcclusion { n_samples: u32, max_distance: Float },
}

/// Blue for cheap rays, via green, to red for expensive ones.
fn heat_ramp(t: Float) -> [Float; 3] {
    let t: Float = t.max(0.0 as Float).min(1.0 as Float);
    [t, 1.0 as Float - (2.0 as Float * t - 1.0 as Float).abs(), 1.0 as Float - t]
}

/// Uniformly distributed direction on the hemisphere around *n*.
fn sample_hemisphere(n: &Normal3f, rng: &mut Rng) -> Vector3f {
    let z: Float = 1.0 as Float - 2.0 as Float * rng.uniform_float();
    let r: Float = (1.0 as Float - z * z).max(0.0 as Float).sqrt();
    let phi: Float = 2.0 as Float * std::f32::consts::PI * rng.uniform_float();
    let d: Vector3f = Vector3f {
        x: r * phi.cos(),
        y: r * phi.sin(),
        z,
    };
    if vec3_dot_vec3f(&d, &Vector3f::from(*n)) < 0.0 as Float {
        -d
    } else {
        d
    }
}

fn ambient_occlusion(
    bvh: &BVHAccel,
    isect: &SurfaceInteraction,
    n_samples: u32,
    max_distance: Float,
    rng: &mut Rng,
) -> Float {
    let n: Normal3f = nrm_faceforward_nrm(&isect.n, &Normal3f::from(isect.wo));
    // move the origin off the surface by the error bound of the hit point
    let nv: Vector3f = Vector3f::from(n);
    let offset: Float = 2.0 as Float * vec3_dot_vec3f(&nv.abs(), &isect.p_error);
    let o = isect.p + nv * offset;
    let mut unoccluded: u32 = 0;
    for _ in 0..n_samples {
        let d: Vector3f = sample_hemisphere(&n, rng);
        let ray: Ray = Ray::new(o, d, 0.0 as Float, max_distance);
        if !bvh.hit(&ray) {
            unoccluded += 1;
        }
    }
    unoccluded as Float / n_samples.max(1) as Float
}

/// Radiance-like value of a single primary ray.
pub fn li(bvh: &BVHAccel, ray: &Ray, mode: &DiagnosticMode, heat_scale: Float, rng: &mut Rng) -> [Float; 3] {
    match *mode {
        DiagnosticMode::Heatmap => {
            let (_hit, nodes_visited) = bvh.intersect_counted(ray);
            heat_ramp(nodes_visited as Float * heat_scale)
        }
        DiagnosticMode::Normals => {
            let mut isect: SurfaceInteraction = SurfaceInteraction::default();
            if bvh.intersect(ray, &mut isect) {
                let n: Normal3f = isect.shading.n;
                [
                    0.5 as Float * (n.x + 1.0 as Float),
                    0.5 as Float * (n.y + 1.0 as Float),
                    0.5 as Float * (n.z + 1.0 as Float),
                ]
            } else {
                [0.0 as Float; 3]
            }
        }
        DiagnosticMode::AmbientOcclusion {
            n_samples,
            max_distance,
        } => {
            let mut isect: SurfaceInteraction = SurfaceInteraction::default();
            if bvh.intersect(ray, &mut isect) {
                let v: Float = ambient_occlusion(bvh, &isect, n_samples, max_distance, rng);
                [v, v, v]
            } else {
                [0.0 as Float; 3]
            }
        }
    }
}

/// Render *mode* through *camera* into *film* with *num_threads*
/// workers (0 means one per core).
pub fn render(
    bvh: &BVHAccel,
    camera: &Camera,
    film: &Film,
    mode: DiagnosticMode,
    num_threads: u8,
) -> Result<()> {
    let num_cores: usize = if num_threads == 0_u8 {
        num_cpus::get()
    } else {
        num_threads as usize
    };
    println!("Rendering with {:?} thread(s) ...", num_cores);
    // a ray visiting this many boxes shows up red
    let heat_scale: Float = 1.0 as Float / (8 * (bvh.stats().max_depth + 1)) as Float;
    debug!("heat map saturates at {} boxes", (1.0 / heat_scale) as usize);
    let block_queue = BlockQueue::new(film.resolution, (TILE_SIZE, TILE_SIZE));
    let bq = &block_queue;
    let mode = &mode;
    crossbeam::scope(|scope| {
        let (pixel_tx, pixel_rx) = crossbeam_channel::bounded(num_cores);
        // spawn worker threads
        for _ in 0..num_cores {
            let pixel_tx = pixel_tx.clone();
            scope.spawn(move |_| {
                while let Some(block) = bq.next() {
                    let (p0, p1) = bq.block_bounds(block);
                    let mut tile: FilmTile = FilmTile::new(p0, p1);
                    let mut rng: Rng = Rng::new((block.1 as u64) << 32 | block.0 as u64);
                    for y in p0.1..p1.1 {
                        for x in p0.0..p1.0 {
                            let ray: Ray =
                                camera.generate_ray(x as Float + 0.5, y as Float + 0.5);
                            tile.set_pixel(x, y, li(bvh, &ray, mode, heat_scale, &mut rng));
                        }
                    }
                    // send the tile through the channel to the collector
                    if pixel_tx.send(tile).is_err() {
                        break;
                    }
                }
            });
        }
        drop(pixel_tx);
        // spawn thread to collect tiles
        scope.spawn(move |_| {
            for _ in pbr::PbIter::new(0..bq.len()) {
                match pixel_rx.recv() {
                    Ok(tile) => film.merge_film_tile(&tile),
                    Err(_) => break,
                }
            }
        });
    })
    .map_err(|_| Error::new(ErrorKind::Other, "a render thread panicked"))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::accelerators::bvh::SplitMethod;
    use crate::shapes::boxes::create_box_grid;
    use std::sync::Arc;

    #[test]
    fn heat_ramp_ends() {
        assert_eq!(heat_ramp(0.0), [0.0, 0.0, 1.0]);
        assert_eq!(heat_ramp(1.0), [1.0, 0.0, 0.0]);
        assert_eq!(heat_ramp(7.0), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn renders_every_tile() {
        let mesh = Arc::new(create_box_grid(3, 1.0, 2.0));
        let bvh = BVHAccel::new(mesh, 4, SplitMethod::Sbvh);
        let camera = Camera::framing(&bvh.world_bound(), 45.0, (40, 24));
        for mode in &[
            DiagnosticMode::Heatmap,
            DiagnosticMode::Normals,
            DiagnosticMode::AmbientOcclusion {
                n_samples: 8,
                max_distance: 1.0,
            },
        ] {
            let film = Film::new((40, 24));
            render(&bvh, &camera, &film, *mode, 2).unwrap();
            let rgb = film.to_rgb8();
            // the center of the image sees the grid
            let center = 3 * (12 * 40 + 20);
            assert!(rgb[center..center + 3].iter().any(|&c| c > 0), "{:?}", mode);
        }
    }
}
