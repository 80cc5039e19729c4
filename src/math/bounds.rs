use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(point1: Vec3, point2: Vec3) -> AABB {
        let min = point1.min(point2);
        let max = point1.max(point2);
        AABB { min, max }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> AABB {
        let half = size.abs() * 0.5;
        AABB {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box containing all `points`, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<AABB> {
        points.into_iter().fold(None, |acc, point| match acc {
            None => Some(AABB {
                min: point,
                max: point,
            }),
            Some(aabb) => Some(aabb.union_point(point)),
        })
    }

    pub fn union_point(&self, point: Vec3) -> AABB {
        AABB {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn expanded(&self, margin: Vec3) -> AABB {
        AABB {
            min: self.min - margin,
            max: self.max + margin,
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Axis-aligned box around this box's corners after `transform`.
    pub fn transformed(&self, transform: &Mat4) -> AABB {
        let corners = self
            .corners()
            .map(|corner| transform.transform_point3(corner));

        let mut result = AABB {
            min: corners[0],
            max: corners[0],
        };
        for corner in &corners[1..] {
            result = result.union_point(*corner);
        }
        result
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Tests a world-space point against this box expressed in the local
    /// space described by `world_matrix`.
    pub fn contains_world_point(&self, world_matrix: &Mat4, point: Vec3) -> bool {
        let local = world_matrix.inverse().transform_point3(point);
        self.contains_point(local)
    }
}
