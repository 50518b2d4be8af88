//! Incremental (Bowyer-Watson) 3-D Delaunay triangulation with barycentric
//! linear interpolation over the tetrahedra.

use crate::error::{SampledError, SampledResult};
use nalgebra::{Matrix3, Matrix4, Vector3};

#[derive(Debug, Clone)]
pub struct Delaunay3 {
    points: Vec<[f64; 3]>,
    tetrahedra: Vec<[usize; 4]>,
}

fn sub(a: [f64; 3], b: [f64; 3]) -> Vector3<f64> {
    Vector3::new(a[0] - b[0], a[1] - b[1], a[2] - b[2])
}

/// Signed volume orientation of the tetrahedron (a, b, c, d).
fn orient(points: &[[f64; 3]], t: [usize; 4]) -> f64 {
    Matrix3::from_columns(&[
        sub(points[t[1]], points[t[0]]),
        sub(points[t[2]], points[t[0]]),
        sub(points[t[3]], points[t[0]]),
    ])
    .determinant()
}

/// Positive when `p` lies inside the circumsphere of the positively oriented
/// tetrahedron `t`.
fn in_circumsphere(points: &[[f64; 3]], t: [usize; 4], p: [f64; 3]) -> f64 {
    let row = |i: usize| {
        let d = sub(points[t[i]], p);
        [d.x, d.y, d.z, d.norm_squared()]
    };
    let m = Matrix4::from_fn(|r, c| row(r)[c]);
    // With rows (x_i - p, |x_i - p|^2) and this crate's positive orientation,
    // the raw determinant is negative for interior points.
    -m.determinant()
}

impl Delaunay3 {
    pub fn new(points: Vec<[f64; 3]>) -> SampledResult<Self> {
        if points.len() < 4 {
            return Err(SampledError::InvalidArg {
                what: "triangulation needs at least four points",
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
        let span = (0..3)
            .map(|axis| max_bound[axis] - min_bound[axis])
            .fold(0.0_f64, f64::max)
            .max(1.0);
        let center = [
            0.5 * (min_bound[0] + max_bound[0]),
            0.5 * (min_bound[1] + max_bound[1]),
            0.5 * (min_bound[2] + max_bound[2]),
        ];

        // Super-tetrahedron comfortably enclosing all points.
        let m = 50.0 * span;
        let mut all_points = points.clone();
        let super_base = all_points.len();
        all_points.push([center[0] - m, center[1] - m, center[2] - m]);
        all_points.push([center[0] + m, center[1] - m, center[2] - m]);
        all_points.push([center[0], center[1] + m, center[2] - m]);
        all_points.push([center[0], center[1], center[2] + m]);

        let mut first = [super_base, super_base + 1, super_base + 2, super_base + 3];
        if orient(&all_points, first) < 0.0 {
            first.swap(0, 1);
        }
        let mut tetrahedra: Vec<[usize; 4]> = vec![first];

        for index in 0..points.len() {
            let p = all_points[index];

            // Cavity: tetrahedra whose circumsphere contains the point.
            let mut bad: Vec<usize> = Vec::new();
            for (ti, t) in tetrahedra.iter().enumerate() {
                if in_circumsphere(&all_points, *t, p) > 0.0 {
                    bad.push(ti);
                }
            }
            if bad.is_empty() {
                // Numerically on a boundary; claim the nearest tetrahedron.
                if let Some((ti, _)) = tetrahedra
                    .iter()
                    .enumerate()
                    .map(|(ti, t)| (ti, in_circumsphere(&all_points, *t, p)))
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                {
                    bad.push(ti);
                }
            }

            // Boundary faces of the cavity (faces not shared by two bad
            // tetrahedra).
            let mut faces: Vec<([usize; 3], usize)> = Vec::new();
            for &ti in &bad {
                let [a, b, c, d] = tetrahedra[ti];
                for face in [[a, b, c], [a, b, d], [a, c, d], [b, c, d]] {
                    let mut key = face;
                    key.sort_unstable();
                    if let Some(entry) = faces.iter_mut().find(|(k, _)| *k == key) {
                        entry.1 += 1;
                    } else {
                        faces.push((key, 1));
                    }
                }
            }

            let mut next: Vec<[usize; 4]> = tetrahedra
                .iter()
                .enumerate()
                .filter(|(ti, _)| !bad.contains(ti))
                .map(|(_, t)| *t)
                .collect();
            for (face, count) in faces {
                if count != 1 {
                    continue;
                }
                let mut t = [face[0], face[1], face[2], index];
                let volume = orient(&all_points, t);
                if volume.abs() < 1e-14 {
                    continue;
                }
                if volume < 0.0 {
                    t.swap(0, 1);
                }
                next.push(t);
            }
            tetrahedra = next;
        }

        // Drop everything touching the super-tetrahedron.
        tetrahedra.retain(|t| t.iter().all(|&v| v < super_base));
        if tetrahedra.is_empty() {
            return Err(SampledError::Degenerate {
                what: "triangulation collapsed (degenerate point set)",
            });
        }

        Ok(Self { points, tetrahedra })
    }

    pub fn tetrahedra(&self) -> &[[usize; 4]] {
        &self.tetrahedra
    }

    /// Barycentric coordinates of `p` in the tetrahedron containing it.
    pub fn find_containing(&self, p: [f64; 3]) -> Option<(usize, [f64; 4])> {
        let tolerance = -1e-9;
        for (ti, t) in self.tetrahedra.iter().enumerate() {
            let m = Matrix3::from_columns(&[
                sub(self.points[t[1]], self.points[t[0]]),
                sub(self.points[t[2]], self.points[t[0]]),
                sub(self.points[t[3]], self.points[t[0]]),
            ]);
            let Some(inverse) = m.try_inverse() else {
                continue;
            };
            let local = inverse * sub(p, self.points[t[0]]);
            let bary = [1.0 - local.x - local.y - local.z, local.x, local.y, local.z];
            if bary.iter().all(|&w| w >= tolerance) {
                return Some((ti, bary));
            }
        }
        None
    }

    /// Linear interpolation of per-point values; NaN outside the hull.
    pub fn interpolate(&self, values: &[f64], p: [f64; 3]) -> f64 {
        match self.find_containing(p) {
            Some((ti, bary)) => {
                let t = self.tetrahedra[ti];
                (0..4).map(|i| bary[i] * values[t[i]]).sum()
            }
            None => f64::NAN,
        }
    }
}
