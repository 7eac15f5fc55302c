//! Collision oracle and an in-memory obstacle scene

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Identifies who owns a piece of collision geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

/// Bit mask of collision layers (bit `n` = layer `n`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Every layer
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    /// No layer
    pub const NONE: LayerMask = LayerMask(0);

    /// Mask containing exactly the given layers (layers >= 32 are ignored)
    pub fn from_layers(layers: &[u8]) -> Self {
        LayerMask(
            layers
                .iter()
                .filter(|&&layer| layer < 32)
                .fold(0u32, |mask, &layer| mask | (1 << layer)),
        )
    }

    /// Whether `layer` is part of this mask
    pub fn contains_layer(self, layer: u8) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// A collider overlapped by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Collider identifier
    pub collider: u64,
    /// Owner of the collider
    pub owner: OwnerId,
}

/// One sphere-overlap question, built per oracle call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearanceQuery {
    /// Sphere center
    pub position: Vec3,
    /// Sphere radius
    pub radius: f32,
    /// Ignore hits on geometry owned by the asking object
    pub exclude_self: bool,
}

impl ClearanceQuery {
    /// Ask the oracle whether this sphere is free of obstacles.
    ///
    /// A hit set containing only `self_owner` geometry counts as clear when
    /// `exclude_self` is set. Negative radii are queried as a point.
    pub fn is_clear(
        &self,
        oracle: &dyn CollisionOracle,
        layers: LayerMask,
        self_owner: Option<OwnerId>,
    ) -> bool {
        let hits = oracle.overlap_sphere(self.position, self.radius.max(0.0), layers);
        hits.iter().all(|hit| {
            self.exclude_self && self_owner.is_some_and(|owner| owner == hit.owner)
        })
    }
}

/// Answers sphere-overlap queries against the world
pub trait CollisionOracle {
    /// Every collider on `layers` that a sphere at `center` with `radius` overlaps
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<Hit>;
}

/// Obstacle geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Sphere
    Sphere {
        /// Center point
        center: Vec3,
        /// Radius
        radius: f32,
    },
    /// Axis-aligned box
    Aabb {
        /// Minimum corner
        min: Vec3,
        /// Maximum corner
        max: Vec3,
    },
}

impl Shape {
    /// Whether a sphere at `center` with `radius` touches or overlaps this shape
    pub fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        match *self {
            Shape::Sphere {
                center: c,
                radius: r,
            } => center.distance_squared(c) <= (radius + r) * (radius + r),
            Shape::Aabb { min, max } => {
                let closest = center.clamp(min.min(max), max.max(min));
                center.distance_squared(closest) <= radius * radius
            }
        }
    }
}

/// A collider in an [`ObstacleScene`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Collider identifier
    pub id: u64,
    /// Owning object
    pub owner: OwnerId,
    /// Collision layer (0-31)
    pub layer: u8,
    /// Geometry
    pub shape: Shape,
}

/// In-memory collision world of spheres and boxes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstacleScene {
    obstacles: Vec<Obstacle>,
    #[serde(default)]
    next_id: u64,
}

impl ObstacleScene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sphere obstacle, returning its collider id
    pub fn add_sphere(&mut self, owner: OwnerId, layer: u8, center: Vec3, radius: f32) -> u64 {
        self.add(owner, layer, Shape::Sphere { center, radius })
    }

    /// Add an axis-aligned box obstacle, returning its collider id
    pub fn add_box(&mut self, owner: OwnerId, layer: u8, min: Vec3, max: Vec3) -> u64 {
        self.add(owner, layer, Shape::Aabb { min, max })
    }

    fn add(&mut self, owner: OwnerId, layer: u8, shape: Shape) -> u64 {
        // Loaded scenes may carry ids beyond next_id
        let id = self
            .obstacles
            .iter()
            .map(|o| o.id + 1)
            .max()
            .unwrap_or(0)
            .max(self.next_id);
        self.next_id = id + 1;
        self.obstacles.push(Obstacle {
            id,
            owner,
            layer,
            shape,
        });
        id
    }

    /// Remove an obstacle by collider id
    pub fn remove(&mut self, id: u64) -> Option<Obstacle> {
        let index = self.obstacles.iter().position(|o| o.id == id)?;
        Some(self.obstacles.remove(index))
    }

    /// Replace the shape of an existing obstacle
    pub fn set_shape(&mut self, id: u64, shape: Shape) -> bool {
        match self.obstacles.iter_mut().find(|o| o.id == id) {
            Some(obstacle) => {
                obstacle.shape = shape;
                true
            }
            None => false,
        }
    }

    /// All obstacles
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Remove all obstacles
    pub fn clear(&mut self) {
        self.obstacles.clear();
    }
}

impl CollisionOracle for ObstacleScene {
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<Hit> {
        self.obstacles
            .iter()
            .filter(|o| layers.contains_layer(o.layer))
            .filter(|o| o.shape.overlaps_sphere(center, radius))
            .map(|o| Hit {
                collider: o.id,
                owner: o.owner,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD: OwnerId = OwnerId(0);
    const ORB: OwnerId = OwnerId(7);

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask::from_layers(&[0, 3, 40]);
        assert!(mask.contains_layer(0));
        assert!(mask.contains_layer(3));
        assert!(!mask.contains_layer(1));
        assert!(!mask.contains_layer(40));
        assert!(LayerMask::ALL.contains_layer(31));
        assert!(!LayerMask::NONE.contains_layer(0));
    }

    #[test]
    fn test_sphere_overlap() {
        let shape = Shape::Sphere {
            center: Vec3::new(1.0, 0.0, 0.0),
            radius: 0.25,
        };
        assert!(shape.overlaps_sphere(Vec3::ZERO, 0.8));
        assert!(shape.overlaps_sphere(Vec3::ZERO, 0.75));
        assert!(!shape.overlaps_sphere(Vec3::ZERO, 0.7));
    }

    #[test]
    fn test_box_overlap() {
        let wall = Shape::Aabb {
            min: Vec3::new(0.5, -1.0, -1.0),
            max: Vec3::new(0.6, 1.0, 1.0),
        };
        assert!(wall.overlaps_sphere(Vec3::ZERO, 0.5));
        assert!(!wall.overlaps_sphere(Vec3::ZERO, 0.49));
        // Center inside the box
        assert!(wall.overlaps_sphere(Vec3::new(0.55, 0.0, 0.0), 0.0));
    }

    #[test]
    fn test_scene_respects_layers() {
        let mut scene = ObstacleScene::new();
        scene.add_sphere(WORLD, 2, Vec3::new(0.5, 0.0, 0.0), 0.1);

        let all = scene.overlap_sphere(Vec3::ZERO, 1.0, LayerMask::ALL);
        assert_eq!(all.len(), 1);

        let other = scene.overlap_sphere(Vec3::ZERO, 1.0, LayerMask::from_layers(&[0, 1]));
        assert!(other.is_empty());
    }

    #[test]
    fn test_self_hits_count_as_clear() {
        let mut scene = ObstacleScene::new();
        scene.add_sphere(ORB, 0, Vec3::ZERO, 0.05);

        let query = ClearanceQuery {
            position: Vec3::ZERO,
            radius: 0.5,
            exclude_self: true,
        };
        assert!(query.is_clear(&scene, LayerMask::ALL, Some(ORB)));
        assert!(!query.is_clear(&scene, LayerMask::ALL, None));

        let strict = ClearanceQuery {
            exclude_self: false,
            ..query
        };
        assert!(!strict.is_clear(&scene, LayerMask::ALL, Some(ORB)));

        scene.add_sphere(WORLD, 0, Vec3::new(0.3, 0.0, 0.0), 0.05);
        assert!(!query.is_clear(&scene, LayerMask::ALL, Some(ORB)));
    }

    #[test]
    fn test_ids_are_unique_after_removal() {
        let mut scene = ObstacleScene::new();
        let a = scene.add_sphere(WORLD, 0, Vec3::ZERO, 0.1);
        let b = scene.add_sphere(WORLD, 0, Vec3::ONE, 0.1);
        assert_ne!(a, b);

        assert!(scene.remove(a).is_some());
        let c = scene.add_box(WORLD, 0, Vec3::ZERO, Vec3::ONE);
        assert_ne!(c, b);
        assert_eq!(scene.obstacles().len(), 2);
        assert!(scene.remove(a).is_none());
    }

    #[test]
    fn test_set_shape() {
        let mut scene = ObstacleScene::new();
        let id = scene.add_sphere(WORLD, 0, Vec3::new(2.0, 0.0, 0.0), 0.1);
        assert!(scene.overlap_sphere(Vec3::ZERO, 1.0, LayerMask::ALL).is_empty());

        assert!(scene.set_shape(
            id,
            Shape::Sphere {
                center: Vec3::new(1.0, 0.0, 0.0),
                radius: 0.5
            }
        ));
        assert_eq!(scene.overlap_sphere(Vec3::ZERO, 1.0, LayerMask::ALL).len(), 1);
        assert!(!scene.set_shape(99, Shape::Sphere { center: Vec3::ZERO, radius: 1.0 }));
    }
}
