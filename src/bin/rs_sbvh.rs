//! Build a BVH over a PLY mesh (or a generated grid of boxes), report
//! its statistics, optionally check it against brute force ray
//! casting, and optionally render a diagnostic image.

// std
use std::io::{Error, ErrorKind, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
// others
use clap::{Parser, ValueEnum};
use log::info;
use rayon::prelude::*;
// pbrt
use rs_sbvh::accelerators::bvh::{BVHAccel, BVHStats};
use rs_sbvh::core::camera::Camera;
use rs_sbvh::core::film::Film;
use rs_sbvh::core::geometry::{bnd3_expand, Bounds3f, Point3f, Ray, Vector3f};
use rs_sbvh::core::paramset::ParamSet;
use rs_sbvh::core::pbrt::Float;
use rs_sbvh::core::rng::Rng;
use rs_sbvh::integrators::{render, DiagnosticMode};
use rs_sbvh::shapes::boxes::create_box_grid;
use rs_sbvh::shapes::plymesh::read_ply_mesh;
use rs_sbvh::shapes::triangle::TriangleMesh;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ModeArg {
    Heatmap,
    Normals,
    Ao,
}

/// Build a bounding volume hierarchy over a triangle mesh.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// use specified number of threads for checking and rendering
    #[arg(short = 't', long = "nthreads", default_value_t = 0)]
    nthreads: u8,
    /// split method: binned, sah or sbvh
    #[arg(short = 's', long = "splitmethod", default_value = "sbvh")]
    splitmethod: String,
    /// more triangles than this in a node force a split
    #[arg(short = 'm', long = "maxnodeprims", default_value_t = 64)]
    maxnodeprims: i32,
    /// upper limit of optimizer passes, 0 skips the optimizer
    #[arg(short = 'o', long = "optimize", default_value_t = 0)]
    optimize: i32,
    /// fraction of interior nodes reinserted per optimizer pass
    #[arg(long = "batch", default_value_t = 0.01)]
    batch: Float,
    /// seed for the optimizer and the random check rays
    #[arg(long, default_value_t = 0)]
    seed: i32,
    /// number of random rays compared against a linear scan
    #[arg(short = 'c', long = "check", default_value_t = 0)]
    check: usize,
    /// write a diagnostic image (PNG) to this file
    #[arg(short = 'i', long = "image")]
    image: Option<PathBuf>,
    /// what the diagnostic image shows
    #[arg(long, value_enum, default_value_t = ModeArg::Heatmap)]
    mode: ModeArg,
    /// image width in pixels
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// image height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,
    /// boxes per axis of the generated scene (without a PLY file)
    #[arg(short = 'g', long = "grid", default_value_t = 10)]
    grid: usize,
    /// The path to the PLY file to read
    path: Option<PathBuf>,
}

fn print_stats(bvh: &BVHAccel, stats: &BVHStats) {
    println!("  triangles:         {}", bvh.mesh.n_triangles);
    println!("  references:        {}", stats.n_references);
    println!("  interior nodes:    {}", stats.n_interior);
    println!("  leaves:            {}", stats.n_leaves);
    println!("  max. depth:        {}", stats.max_depth);
    println!("  max. leaf size:    {}", stats.max_leaf_size);
    println!("  mean leaf size:    {:.2}", stats.mean_leaf_size);
    println!("  SAH cost:          {:.4}", bvh.sah_cost());
    println!("  tree cost:         {:.4}", bvh.tree_cost());
}

fn random_ray(rng: &mut Rng, b: &Bounds3f) -> Ray {
    let o: Point3f = Point3f {
        x: rng.uniform_range(b.p_min.x, b.p_max.x),
        y: rng.uniform_range(b.p_min.y, b.p_max.y),
        z: rng.uniform_range(b.p_min.z, b.p_max.z),
    };
    // uniform direction on the sphere
    let z: Float = 1.0 as Float - 2.0 as Float * rng.uniform_float();
    let r: Float = (1.0 as Float - z * z).max(0.0 as Float).sqrt();
    let phi: Float = 2.0 as Float * std::f32::consts::PI * rng.uniform_float();
    let d: Vector3f = Vector3f {
        x: r * phi.cos(),
        y: r * phi.sin(),
        z,
    };
    Ray::new(o, d, 0.0 as Float, std::f32::INFINITY)
}

/// Cast *n_rays* random rays through the BVH and through a linear scan
/// over all triangles, in parallel, and count disagreements.
fn check_rays(bvh: &BVHAccel, n_rays: usize, seed: u64) -> usize {
    let wb: Bounds3f = bvh.world_bound();
    let b: Bounds3f = bnd3_expand(&wb, 0.25 as Float * wb.diagonal().length());
    let start = Instant::now();
    let (mismatches, nodes_visited) = (0..n_rays)
        .into_par_iter()
        .map(|i| {
            let mut rng: Rng = Rng::new(seed << 32 ^ i as u64);
            let ray: Ray = random_ray(&mut rng, &b);
            let any_hit: bool = bvh.hit(&ray);
            let (closest, visited) = bvh.intersect_counted(&ray);
            let linear = bvh.intersect_linear(&ray);
            let agree: bool = match (closest, linear) {
                (Some((_, t0)), Some((_, t1))) => {
                    (t0 - t1).abs() <= 1e-4 as Float * t1.max(1.0 as Float)
                }
                (None, None) => true,
                _ => false,
            };
            let mismatch: bool = !agree || any_hit != closest.is_some();
            (mismatch as usize, visited)
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
    println!(
        "Checked {} rays in {:.3} s: {} mismatches, {:.1} boxes tested per ray",
        n_rays,
        start.elapsed().as_secs_f32(),
        mismatches,
        nodes_visited as Float / n_rays.max(1) as Float
    );
    mismatches
}

fn run(args: Cli) -> Result<()> {
    let mesh: TriangleMesh = match args.path {
        Some(ref path) => read_ply_mesh(path)?,
        None => {
            println!(
                "No PLY file given, using a grid of {}^3 boxes",
                args.grid
            );
            create_box_grid(args.grid.max(1), 1.0 as Float, 2.0 as Float)
        }
    };
    let mut ps: ParamSet = ParamSet::default();
    ps.add_string(String::from("splitmethod"), args.splitmethod.clone());
    ps.add_int(String::from("maxnodeprims"), args.maxnodeprims);
    ps.add_int(String::from("optimizepasses"), args.optimize);
    ps.add_float(String::from("optimizebatch"), args.batch);
    ps.add_int(String::from("seed"), args.seed);
    let start = Instant::now();
    let bvh: BVHAccel = BVHAccel::create(Arc::new(mesh), &ps);
    println!(
        "BVH ({:?}) ready after {:.3} s",
        bvh.split_method(),
        start.elapsed().as_secs_f32()
    );
    print_stats(&bvh, &bvh.stats());
    bvh.validate()
        .map_err(|msg| Error::new(ErrorKind::InvalidData, msg))?;
    info!("BVH structure is valid");
    let num_threads: usize = if args.nthreads == 0_u8 {
        num_cpus::get()
    } else {
        args.nthreads as usize
    };
    if args.check > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| Error::new(ErrorKind::Other, e))?;
        let mismatches: usize = pool.install(|| check_rays(&bvh, args.check, args.seed as u64));
        if mismatches > 0 {
            return Err(Error::new(
                ErrorKind::Other,
                format!("{} rays disagree with the linear scan", mismatches),
            ));
        }
    }
    if let Some(ref path) = args.image {
        let resolution: (u32, u32) = (args.width.max(1), args.height.max(1));
        let camera: Camera = Camera::framing(&bvh.world_bound(), 45.0 as Float, resolution);
        let film: Film = Film::new(resolution);
        let mode: DiagnosticMode = match args.mode {
            ModeArg::Heatmap => DiagnosticMode::Heatmap,
            ModeArg::Normals => DiagnosticMode::Normals,
            ModeArg::Ao => DiagnosticMode::AmbientOcclusion {
                n_samples: 16,
                max_distance: 0.1 as Float * bvh.world_bound().diagonal().length(),
            },
        };
        render(&bvh, &camera, &film, mode, args.nthreads)?;
        film.write_image(path)?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    // handle command line options
    let args = Cli::parse();
    let num_cores = num_cpus::get();
    println!(
        "rs_sbvh version {} [Detected {} cores]",
        VERSION, num_cores
    );
    if let Err(e) = run(args) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
