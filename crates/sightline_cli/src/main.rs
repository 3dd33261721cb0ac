//! Sightline demo binary.
//!
//! With no arguments, builds a small in-memory scene (a ground plane and
//! a wall) and prints the result of a handful of line-of-sight queries.
//! Given a path to an .opt geometry file, loads it instead and exercises
//! the BVH cache round-trip next to it.
//!
//! Run with: cargo run --bin sightline [-- path/to/geometry.opt]

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Result};
use sightline_core::{Mesh, VisibilityEngine};
use sightline_math::{Triangle, Vec3};

/// Ground quad plus a wall, the same scene the engine tests use.
fn demo_meshes() -> Vec<Mesh> {
    let ground = Mesh::new(vec![
        Triangle::new(
            Vec3::new(-1000.0, 0.0, -1000.0),
            Vec3::new(1000.0, 0.0, -1000.0),
            Vec3::new(1000.0, 0.0, 1000.0),
        ),
        Triangle::new(
            Vec3::new(-1000.0, 0.0, -1000.0),
            Vec3::new(1000.0, 0.0, 1000.0),
            Vec3::new(-1000.0, 0.0, 1000.0),
        ),
    ]);

    let wall = Mesh::new(vec![
        Triangle::new(
            Vec3::new(-100.0, 0.0, 500.0),
            Vec3::new(100.0, 0.0, 500.0),
            Vec3::new(100.0, 1000.0, 500.0),
        ),
        Triangle::new(
            Vec3::new(-100.0, 0.0, 500.0),
            Vec3::new(100.0, 1000.0, 500.0),
            Vec3::new(-100.0, 1000.0, 500.0),
        ),
    ]);

    vec![ground, wall]
}

fn report_query(engine: &VisibilityEngine, label: &str, p1: Vec3, p2: Vec3) {
    let verdict = if engine.is_visible(p1, p2) {
        "VISIBLE"
    } else {
        "BLOCKED"
    };
    println!("{label}: {verdict}");
}

fn run_demo_queries(engine: &VisibilityEngine) {
    report_query(
        engine,
        "Short of the wall    ",
        Vec3::new(0.0, 100.0, 0.0),
        Vec3::new(0.0, 100.0, 200.0),
    );
    report_query(
        engine,
        "Through the wall     ",
        Vec3::new(0.0, 100.0, 0.0),
        Vec3::new(0.0, 100.0, 1000.0),
    );
    report_query(
        engine,
        "Coincident points    ",
        Vec3::new(0.0, 100.0, 0.0),
        Vec3::new(0.0, 100.0, 0.0),
    );
    report_query(
        engine,
        "Straddling the wall  ",
        Vec3::new(0.0, 50.0, 400.0),
        Vec3::new(0.0, 50.0, 600.0),
    );
    report_query(
        engine,
        "Above the wall top   ",
        Vec3::new(0.0, 1500.0, 400.0),
        Vec3::new(0.0, 1500.0, 600.0),
    );
    report_query(
        engine,
        "Past the wall in x   ",
        Vec3::new(500.0, 100.0, 0.0),
        Vec3::new(500.0, 100.0, 1000.0),
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut engine = VisibilityEngine::new();

    match args.get(1) {
        None => {
            println!("Loading built-in demo scene");
            if !engine.load_geometry(demo_meshes()) {
                bail!("failed to load demo geometry");
            }
        }
        Some(path) => {
            println!("Loading geometry from {path}");
            if !engine.load_from_opt_file(path) {
                bail!("failed to load geometry from {path}");
            }
            println!(
                "Loaded {} meshes, {} triangles",
                engine.mesh_count(),
                engine.triangle_count()
            );

            // Exercise the cache next to the input file
            let cache_path = PathBuf::from(path).with_extension("bvh");
            if engine.save_bvh_to_file(&cache_path) {
                println!("Wrote BVH cache to {}", cache_path.display());
                if engine.load_bvh_from_file(&cache_path) {
                    println!("Reloaded BVH cache");
                }
            }
        }
    }

    run_demo_queries(&engine);

    Ok(())
}
