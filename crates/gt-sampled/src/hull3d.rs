//! 3-D convex hull (incremental) with outward facet normals, and extraction
//! of lower/upper half hulls along an axis.

use crate::error::{SampledError, SampledResult};
use nalgebra::{Matrix3, Vector3};

/// A triangular hull facet with its outward plane `normal . x = offset`.
#[derive(Debug, Clone, Copy)]
pub struct Facet {
    pub vertices: [usize; 3],
    pub normal: [f64; 3],
    pub offset: f64,
}

/// Convex hull of a 3-D point cloud.
#[derive(Debug, Clone)]
pub struct ConvexHull3 {
    points: Vec<[f64; 3]>,
    facets: Vec<Facet>,
    min_bound: [f64; 3],
    max_bound: [f64; 3],
}

/// Which side of the hull to extract along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfSide {
    Lower,
    Upper,
}

/// Facets of one side of a hull along an axis, with the unique vertex set.
#[derive(Debug, Clone)]
pub struct HalfHull {
    pub facets: Vec<[usize; 3]>,
    pub point_indices: Vec<usize>,
}

fn sub(a: [f64; 3], b: [f64; 3]) -> Vector3<f64> {
    Vector3::new(a[0] - b[0], a[1] - b[1], a[2] - b[2])
}

fn make_facet(points: &[[f64; 3]], a: usize, b: usize, c: usize, interior: [f64; 3]) -> Facet {
    let normal = sub(points[b], points[a]).cross(&sub(points[c], points[a]));
    let norm = normal.norm();
    let normal = if norm > 0.0 { normal / norm } else { normal };
    let offset = normal.dot(&Vector3::new(points[a][0], points[a][1], points[a][2]));
    let interior_side = normal.dot(&Vector3::new(interior[0], interior[1], interior[2])) - offset;
    if interior_side > 0.0 {
        // Flip so the interior is on the negative side.
        Facet {
            vertices: [a, c, b],
            normal: [-normal.x, -normal.y, -normal.z],
            offset: -offset,
        }
    } else {
        Facet {
            vertices: [a, b, c],
            normal: [normal.x, normal.y, normal.z],
            offset,
        }
    }
}

impl ConvexHull3 {
    pub fn new(points: Vec<[f64; 3]>) -> SampledResult<Self> {
        if points.len() < 4 {
            return Err(SampledError::InvalidArg {
                what: "convex hull needs at least four points",
            });
        }

        let mut min_bound = [f64::INFINITY; 3];
        let mut max_bound = [f64::NEG_INFINITY; 3];
        for p in &points {
            for axis in 0..3 {
                min_bound[axis] = min_bound[axis].min(p[axis]);
                max_bound[axis] = max_bound[axis].max(p[axis]);
            }
        }
        let scale = (0..3)
            .map(|axis| max_bound[axis] - min_bound[axis])
            .fold(0.0_f64, f64::max)
            .max(1e-12);
        let eps = 1e-9 * scale;

        // Initial tetrahedron from four affinely independent points.
        let (i0, i1, i2, i3) = initial_tetrahedron(&points, eps)?;
        let centroid = [
            (points[i0][0] + points[i1][0] + points[i2][0] + points[i3][0]) / 4.0,
            (points[i0][1] + points[i1][1] + points[i2][1] + points[i3][1]) / 4.0,
            (points[i0][2] + points[i1][2] + points[i2][2] + points[i3][2]) / 4.0,
        ];

        let mut facets = vec![
            make_facet(&points, i0, i1, i2, centroid),
            make_facet(&points, i0, i1, i3, centroid),
            make_facet(&points, i0, i2, i3, centroid),
            make_facet(&points, i1, i2, i3, centroid),
        ];

        for index in 0..points.len() {
            if index == i0 || index == i1 || index == i2 || index == i3 {
                continue;
            }
            let p = Vector3::new(points[index][0], points[index][1], points[index][2]);

            let visible: Vec<usize> = facets
                .iter()
                .enumerate()
                .filter(|(_, f)| {
                    Vector3::new(f.normal[0], f.normal[1], f.normal[2]).dot(&p) - f.offset > eps
                })
                .map(|(i, _)| i)
                .collect();
            if visible.is_empty() {
                continue;
            }

            // Horizon: edges of visible facets shared with exactly one
            // visible facet.
            let mut edge_count: Vec<((usize, usize), (usize, usize))> = Vec::new();
            for &fi in &visible {
                let [a, b, c] = facets[fi].vertices;
                for (u, v) in [(a, b), (b, c), (c, a)] {
                    let key = (u.min(v), u.max(v));
                    if let Some(entry) = edge_count.iter_mut().find(|(k, _)| *k == key) {
                        entry.1 .1 += 1;
                    } else {
                        edge_count.push((key, (u, 1)));
                    }
                }
            }
            let horizon: Vec<(usize, usize)> = edge_count
                .iter()
                .filter(|(_, (_, count))| *count == 1)
                .map(|((u, v), _)| (*u, *v))
                .collect();

            // Remove visible facets, add a fan from the horizon to the point.
            let mut keep: Vec<Facet> = facets
                .iter()
                .enumerate()
                .filter(|(i, _)| !visible.contains(i))
                .map(|(_, f)| *f)
                .collect();
            for (u, v) in horizon {
                keep.push(make_facet(&points, u, v, index, centroid));
            }
            facets = keep;
        }

        Ok(Self {
            points,
            facets,
            min_bound,
            max_bound,
        })
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn min_bound(&self) -> [f64; 3] {
        self.min_bound
    }

    pub fn max_bound(&self) -> [f64; 3] {
        self.max_bound
    }

    /// Facets whose outward normal points along (upper) or against (lower)
    /// the axis; near-vertical facets belong to neither side.
    pub fn half_hull(&self, axis: usize, side: HalfSide) -> HalfHull {
        let threshold = 1e-9;
        let facets: Vec<[usize; 3]> = self
            .facets
            .iter()
            .filter(|f| match side {
                HalfSide::Lower => f.normal[axis] < -threshold,
                HalfSide::Upper => f.normal[axis] > threshold,
            })
            .map(|f| f.vertices)
            .collect();
        HalfHull {
            point_indices: unique_vertices(&facets),
            facets,
        }
    }

    /// The monotonic part of the upper half hull along `axis`: facets whose
    /// surface value increases with `increasing_axis` and decreases with
    /// `decreasing_axis` (the physically consistent part of the envelope).
    pub fn monotonic_upper_half_hull(
        &self,
        axis: usize,
        increasing_axis: usize,
        decreasing_axis: usize,
    ) -> HalfHull {
        let threshold = 1e-9;
        let facets: Vec<[usize; 3]> = self
            .facets
            .iter()
            .filter(|f| {
                f.normal[axis] > threshold
                    && f.normal[increasing_axis] <= threshold
                    && f.normal[decreasing_axis] >= -threshold
            })
            .map(|f| f.vertices)
            .collect();
        HalfHull {
            point_indices: unique_vertices(&facets),
            facets,
        }
    }
}

fn unique_vertices(facets: &[[usize; 3]]) -> Vec<usize> {
    let mut indices: Vec<usize> = facets.iter().flatten().copied().collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

fn initial_tetrahedron(points: &[[f64; 3]], eps: f64) -> SampledResult<(usize, usize, usize, usize)> {
    let i0 = 0;
    let i1 = (1..points.len())
        .find(|&i| sub(points[i], points[i0]).norm() > eps)
        .ok_or(SampledError::Degenerate {
            what: "all points coincide",
        })?;
    let i2 = (1..points.len())
        .find(|&i| {
            i != i1
                && sub(points[i1], points[i0])
                    .cross(&sub(points[i], points[i0]))
                    .norm()
                    > eps * eps
        })
        .ok_or(SampledError::Degenerate {
            what: "all points are collinear",
        })?;
    let i3 = (1..points.len())
        .find(|&i| {
            i != i1 && i != i2 && {
                let m = Matrix3::from_columns(&[
                    sub(points[i1], points[i0]),
                    sub(points[i2], points[i0]),
                    sub(points[i], points[i0]),
                ]);
                m.determinant().abs() > eps * eps * eps
            }
        })
        .ok_or(SampledError::Degenerate {
            what: "all points are coplanar",
        })?;
    Ok((i0, i1, i2, i3))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> Vec<[f64; 3]> {
        let mut points = Vec::new();
        for x in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for z in [0.0, 1.0] {
                    points.push([x, y, z]);
                }
            }
        }
        // An interior point must not appear on the hull
        points.push([0.5, 0.5, 0.5]);
        points
    }

    #[test]
    fn cube_hull_has_twelve_facets() {
        let hull = ConvexHull3::new(unit_cube()).unwrap();
        assert_eq!(hull.facets().len(), 12);
        // No facet references the interior point (index 8)
        assert!(hull.facets().iter().all(|f| !f.vertices.contains(&8)));
    }

    #[test]
    fn outward_normals_are_unit_and_consistent() {
        let hull = ConvexHull3::new(unit_cube()).unwrap();
        for facet in hull.facets() {
            let n = facet.normal;
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-9);
            // The cube center is strictly inside every facet plane
            let center_side = n[0] * 0.5 + n[1] * 0.5 + n[2] * 0.5 - facet.offset;
            assert!(center_side < 0.0);
        }
    }

    #[test]
    fn half_hulls_split_cube_faces() {
        let hull = ConvexHull3::new(unit_cube()).unwrap();
        let lower = hull.half_hull(2, HalfSide::Lower);
        let upper = hull.half_hull(2, HalfSide::Upper);
        // Two triangles on the bottom face, two on the top
        assert_eq!(lower.facets.len(), 2);
        assert_eq!(upper.facets.len(), 2);
        // Lower half-hull points all have z = 0
        for &i in &lower.point_indices {
            assert_eq!(hull.points()[i][2], 0.0);
        }
        for &i in &upper.point_indices {
            assert_eq!(hull.points()[i][2], 1.0);
        }
    }

    #[test]
    fn degenerate_input_rejected() {
        let planar: Vec<[f64; 3]> = (0..6).map(|i| [i as f64, (i * i) as f64, 0.0]).collect();
        assert!(matches!(
            ConvexHull3::new(planar),
            Err(SampledError::Degenerate { .. })
        ));
    }
}
