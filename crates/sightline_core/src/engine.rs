//! Visibility query façade.
//!
//! [`VisibilityEngine`] owns the loaded meshes and their BVH trees and
//! answers segment visibility queries against them. Geometry is loaded
//! once (from memory, a raw `.opt` file, or a BVH cache) and is immutable
//! afterwards; queries only read tree state, so a loaded engine can be
//! shared across threads.
//!
//! The public operations report failure as `false` and log a diagnostic;
//! no error escapes this boundary and a failed load leaves the previous
//! state untouched.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use sightline_math::{Ray, Vec3};

use crate::bvh::BvhNode;
use crate::error::{GeometryError, GeometryResult};
use crate::formats::{cache, opt};
use crate::mesh::Mesh;

/// Point pairs closer than this are trivially visible.
const COINCIDENT_EPSILON: f32 = 1e-3;

/// Line-of-sight engine over a static set of triangle meshes.
///
/// `meshes` and `bvh_roots` stay parallel: one tree per retained mesh.
/// Empty meshes are dropped at load time, so every tree is non-empty.
pub struct VisibilityEngine {
    meshes: Vec<Mesh>,
    bvh_roots: Vec<BvhNode>,
    geometry_loaded: bool,
    warned_not_loaded: AtomicBool,
}

impl Default for VisibilityEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityEngine {
    /// Create an empty engine. Queries return not-visible until geometry
    /// is loaded.
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            bvh_roots: Vec::new(),
            geometry_loaded: false,
            warned_not_loaded: AtomicBool::new(false),
        }
    }

    /// Load geometry from in-memory meshes and build one BVH per mesh.
    ///
    /// Empty meshes are skipped with a warning. Returns false (keeping
    /// any previously loaded state) when the list is empty or every mesh
    /// in it is.
    pub fn load_geometry(&mut self, meshes: Vec<Mesh>) -> bool {
        if meshes.is_empty() {
            log::error!("no geometry meshes provided");
            return false;
        }

        let mut kept = Vec::with_capacity(meshes.len());
        let mut roots = Vec::with_capacity(meshes.len());

        for (i, mesh) in meshes.into_iter().enumerate() {
            if mesh.is_empty() {
                log::warn!("mesh {i} is empty, skipping");
                continue;
            }
            log::info!(
                "building BVH for mesh {i} with {} triangles",
                mesh.triangle_count()
            );
            roots.push(BvhNode::build(&mesh.triangles));
            kept.push(mesh);
        }

        if kept.is_empty() {
            log::error!("all provided meshes are empty");
            return false;
        }

        self.commit(kept, roots);
        true
    }

    /// Load raw geometry from an .opt file, building BVHs in the same
    /// pass.
    pub fn load_from_opt_file<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        match self.try_load_from_opt_file(path) {
            Ok(()) => true,
            Err(err) => {
                log::error!("failed to load geometry from {}: {err}", path.display());
                false
            }
        }
    }

    /// Write the current meshes and trees as a BVH cache file.
    pub fn save_bvh_to_file<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        if !self.geometry_loaded {
            log::warn!("no geometry loaded, not writing BVH cache");
            return false;
        }
        match self.try_save_bvh(path) {
            Ok(()) => true,
            Err(err) => {
                log::error!("failed to write BVH cache {}: {err}", path.display());
                false
            }
        }
    }

    /// Load pre-built trees from a BVH cache file.
    ///
    /// The cache must describe the same scene that is currently loaded:
    /// its mesh count has to match, which it does when the caller loaded
    /// the same raw geometry the cache was built from. Meshes are rebuilt
    /// from the trees' leaves.
    pub fn load_bvh_from_file<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        if !self.geometry_loaded {
            log::warn!("load geometry before loading a BVH cache");
            return false;
        }

        match self.try_load_bvh(path) {
            Ok((meshes, roots)) => {
                if meshes.len() != self.meshes.len() {
                    log::warn!(
                        "BVH cache {} holds {} meshes but {} are loaded",
                        path.display(),
                        meshes.len(),
                        self.meshes.len()
                    );
                    return false;
                }
                self.commit(meshes, roots);
                true
            }
            Err(err) => {
                log::error!("failed to load BVH cache {}: {err}", path.display());
                false
            }
        }
    }

    /// Test whether the open segment between two points is free of any
    /// triangle intersection.
    ///
    /// Points closer than a millimeter-scale tolerance see each other
    /// trivially. A triangle exactly at the far endpoint does not
    /// occlude; anything strictly between the endpoints does.
    pub fn is_visible(&self, p1: Vec3, p2: Vec3) -> bool {
        if !self.geometry_loaded || self.bvh_roots.is_empty() {
            if !self.warned_not_loaded.swap(true, Ordering::Relaxed) {
                log::warn!("geometry not loaded, visibility queries return false");
            }
            return false;
        }

        let delta = p2 - p1;
        let distance = delta.length();
        if distance < COINCIDENT_EPSILON {
            return true;
        }

        let ray = Ray::new(p1, delta / distance);
        let mut hit_dist = f32::MAX;

        for root in &self.bvh_roots {
            if root.intersect(&ray, distance, &mut hit_dist) && hit_dist < distance {
                return false;
            }
        }

        true
    }

    /// Whether geometry has been loaded successfully.
    pub fn is_geometry_loaded(&self) -> bool {
        self.geometry_loaded
    }

    /// Number of loaded meshes (equals the number of BVH trees).
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Total triangles across all loaded meshes.
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    fn commit(&mut self, meshes: Vec<Mesh>, roots: Vec<BvhNode>) {
        debug_assert_eq!(meshes.len(), roots.len());
        log::info!(
            "loaded {} meshes with {} BVH trees",
            meshes.len(),
            roots.len()
        );
        self.meshes = meshes;
        self.bvh_roots = roots;
        self.geometry_loaded = true;
    }

    fn try_load_from_opt_file(&mut self, path: &Path) -> GeometryResult<()> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let parsed = opt::read_meshes(&mut reader)?;

        if parsed.is_empty() {
            return Err(GeometryError::Malformed(
                "geometry file holds no meshes".into(),
            ));
        }

        let mut kept = Vec::with_capacity(parsed.len());
        let mut roots = Vec::with_capacity(parsed.len());

        for (i, mesh) in parsed.into_iter().enumerate() {
            if mesh.is_empty() {
                log::warn!("mesh {i} has no triangles, skipping");
                continue;
            }
            log::info!(
                "building BVH for mesh {i} with {} triangles",
                mesh.triangle_count()
            );
            roots.push(BvhNode::build(&mesh.triangles));
            kept.push(mesh);
        }

        if kept.is_empty() {
            return Err(GeometryError::Malformed(
                "every mesh in the geometry file is empty".into(),
            ));
        }

        self.commit(kept, roots);
        Ok(())
    }

    fn try_save_bvh(&self, path: &Path) -> GeometryResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        cache::write_cache(&mut writer, &self.meshes, &self.bvh_roots)?;
        writer.flush()?;
        Ok(())
    }

    fn try_load_bvh(&self, path: &Path) -> GeometryResult<(Vec<Mesh>, Vec<BvhNode>)> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        cache::read_cache(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_math::Triangle;
    use std::path::PathBuf;

    /// Ground quad at y = 0 spanning x, z in [-1000, 1000].
    fn ground_mesh() -> Mesh {
        Mesh::new(vec![
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
        ])
    }

    /// Wall at z = 500 spanning x in [-100, 100], y in [0, 1000].
    fn wall_mesh() -> Mesh {
        Mesh::new(vec![
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
        ])
    }

    fn demo_engine() -> VisibilityEngine {
        let mut engine = VisibilityEngine::new();
        assert!(engine.load_geometry(vec![ground_mesh(), wall_mesh()]));
        engine
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sightline_engine_{tag}_{}", std::process::id()))
    }

    #[test]
    fn test_unloaded_engine_sees_nothing() {
        let engine = VisibilityEngine::new();
        assert!(!engine.is_geometry_loaded());
        assert!(!engine.is_visible(Vec3::ZERO, Vec3::ONE));
    }

    #[test]
    fn test_load_geometry_rejects_empty_input() {
        let mut engine = VisibilityEngine::new();
        assert!(!engine.load_geometry(vec![]));
        assert!(!engine.load_geometry(vec![Mesh::default(), Mesh::default()]));
        assert!(!engine.is_geometry_loaded());
    }

    #[test]
    fn test_empty_mesh_is_skipped_not_fatal() {
        let mut engine = VisibilityEngine::new();
        assert!(engine.load_geometry(vec![ground_mesh(), Mesh::default(), wall_mesh()]));
        assert_eq!(engine.mesh_count(), 2);
        assert_eq!(engine.triangle_count(), 4);
    }

    #[test]
    fn test_demo_scene_queries() {
        let engine = demo_engine();

        // Short of the wall
        assert!(engine.is_visible(Vec3::new(0.0, 100.0, 0.0), Vec3::new(0.0, 100.0, 200.0)));
        // Through the wall
        assert!(!engine.is_visible(Vec3::new(0.0, 100.0, 0.0), Vec3::new(0.0, 100.0, 1000.0)));
        // Coincident points
        assert!(engine.is_visible(Vec3::new(0.0, 100.0, 0.0), Vec3::new(0.0, 100.0, 0.0)));
        // Straddling the wall
        assert!(!engine.is_visible(Vec3::new(0.0, 50.0, 400.0), Vec3::new(0.0, 50.0, 600.0)));
        // Above the wall top
        assert!(engine.is_visible(
            Vec3::new(0.0, 1500.0, 400.0),
            Vec3::new(0.0, 1500.0, 600.0)
        ));
        // Past the wall in x
        assert!(engine.is_visible(
            Vec3::new(500.0, 100.0, 0.0),
            Vec3::new(500.0, 100.0, 1000.0)
        ));
    }

    #[test]
    fn test_visibility_is_symmetric() {
        let engine = demo_engine();
        let pairs = [
            (Vec3::new(0.0, 100.0, 0.0), Vec3::new(0.0, 100.0, 1000.0)),
            (Vec3::new(0.0, 100.0, 0.0), Vec3::new(0.0, 100.0, 200.0)),
            (Vec3::new(0.0, 50.0, 400.0), Vec3::new(0.0, 50.0, 600.0)),
            (Vec3::new(-300.0, 5.0, -300.0), Vec3::new(300.0, 700.0, 800.0)),
        ];

        for (p, q) in pairs {
            assert_eq!(engine.is_visible(p, q), engine.is_visible(q, p));
        }
    }

    #[test]
    fn test_near_coincident_points_are_visible() {
        let engine = demo_engine();
        let p = Vec3::new(0.0, 100.0, 0.0);
        let q = p + Vec3::new(0.0, 0.0, 5e-4);
        assert!(engine.is_visible(p, q));
    }

    #[test]
    fn test_more_geometry_never_unblocks() {
        let mut sparse = VisibilityEngine::new();
        assert!(sparse.load_geometry(vec![wall_mesh()]));

        let mut dense = VisibilityEngine::new();
        assert!(dense.load_geometry(vec![wall_mesh(), ground_mesh()]));

        let queries = [
            (Vec3::new(0.0, 100.0, 0.0), Vec3::new(0.0, 100.0, 1000.0)),
            (Vec3::new(0.0, 50.0, 400.0), Vec3::new(0.0, 50.0, 600.0)),
            (Vec3::new(50.0, 900.0, 450.0), Vec3::new(-50.0, 100.0, 550.0)),
        ];
        for (p, q) in queries {
            if !sparse.is_visible(p, q) {
                assert!(!dense.is_visible(p, q), "added geometry unblocked {p:?}->{q:?}");
            }
        }
    }

    #[test]
    fn test_ray_grazing_start_point_on_ground() {
        let engine = demo_engine();
        // Both endpoints on the ground plane: the segment runs inside the
        // plane, the strict hit-parameter test keeps it visible
        assert!(engine.is_visible(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 10.0)));
    }

    #[test]
    fn test_opt_file_round_trip_through_engine() {
        let opt_path = temp_path("geometry.opt");
        crate::formats::opt::GeometryFile {
            meshes: vec![ground_mesh(), wall_mesh()],
        }
        .save_to_file(&opt_path)
        .unwrap();

        let mut engine = VisibilityEngine::new();
        assert!(engine.load_from_opt_file(&opt_path));
        std::fs::remove_file(&opt_path).ok();

        assert_eq!(engine.mesh_count(), 2);
        assert!(!engine.is_visible(Vec3::new(0.0, 100.0, 0.0), Vec3::new(0.0, 100.0, 1000.0)));
    }

    #[test]
    fn test_load_from_missing_opt_file_fails() {
        let mut engine = VisibilityEngine::new();
        assert!(!engine.load_from_opt_file(temp_path("missing.opt")));
        assert!(!engine.is_geometry_loaded());
    }

    #[test]
    fn test_failed_opt_load_keeps_previous_state() {
        let mut engine = demo_engine();
        assert!(!engine.load_from_opt_file(temp_path("missing.opt")));

        assert!(engine.is_geometry_loaded());
        assert_eq!(engine.mesh_count(), 2);
        assert!(!engine.is_visible(Vec3::new(0.0, 100.0, 0.0), Vec3::new(0.0, 100.0, 1000.0)));
    }

    #[test]
    fn test_bvh_cache_round_trip() {
        let cache_path = temp_path("cache.bvh");

        let engine = demo_engine();
        assert!(engine.save_bvh_to_file(&cache_path));

        let mut rehydrated = VisibilityEngine::new();
        assert!(rehydrated.load_geometry(vec![ground_mesh(), wall_mesh()]));
        assert!(rehydrated.load_bvh_from_file(&cache_path));
        std::fs::remove_file(&cache_path).ok();

        assert_eq!(rehydrated.mesh_count(), 2);
        assert_eq!(rehydrated.triangle_count(), 4);
        assert!(!rehydrated.is_visible(
            Vec3::new(0.0, 100.0, 0.0),
            Vec3::new(0.0, 100.0, 1000.0)
        ));
        assert!(rehydrated.is_visible(
            Vec3::new(500.0, 100.0, 0.0),
            Vec3::new(500.0, 100.0, 1000.0)
        ));
    }

    #[test]
    fn test_cache_mesh_count_mismatch_rejected() {
        let cache_path = temp_path("mismatch.bvh");

        let engine = demo_engine();
        assert!(engine.save_bvh_to_file(&cache_path));

        let mut other = VisibilityEngine::new();
        assert!(other.load_geometry(vec![wall_mesh()]));
        assert!(!other.load_bvh_from_file(&cache_path));
        std::fs::remove_file(&cache_path).ok();

        // Prior single-mesh state survives the rejected load
        assert_eq!(other.mesh_count(), 1);
        assert!(!other.is_visible(Vec3::new(0.0, 50.0, 400.0), Vec3::new(0.0, 50.0, 600.0)));
    }

    #[test]
    fn test_cache_load_requires_loaded_geometry() {
        let cache_path = temp_path("orphan.bvh");

        let engine = demo_engine();
        assert!(engine.save_bvh_to_file(&cache_path));

        let mut fresh = VisibilityEngine::new();
        assert!(!fresh.load_bvh_from_file(&cache_path));
        std::fs::remove_file(&cache_path).ok();
        assert!(!fresh.is_geometry_loaded());
    }

    #[test]
    fn test_save_without_geometry_fails() {
        let engine = VisibilityEngine::new();
        assert!(!engine.save_bvh_to_file(temp_path("empty.bvh")));
    }
}
