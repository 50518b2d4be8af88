//! 2-D convex hull (monotone chain) and its lower/upper boundary chains.

use crate::error::{SampledError, SampledResult};

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

fn sorted_unique(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut sorted: Vec<[f64; 2]> = points.to_vec();
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    sorted.dedup_by(|a, b| a[0] == b[0] && a[1] == b[1]);
    sorted
}

/// The lower boundary of the convex hull as a piecewise-linear function
/// y(x): hull vertices with minimal y, sorted by ascending x. Vertical hull
/// edges collapse to the lower endpoint.
pub fn lower_chain(points: &[[f64; 2]]) -> SampledResult<(Vec<f64>, Vec<f64>)> {
    chain(points, ChainSide::Lower)
}

/// The upper boundary of the convex hull as a piecewise-linear function
/// y(x): hull vertices with maximal y, sorted by ascending x.
pub fn upper_chain(points: &[[f64; 2]]) -> SampledResult<(Vec<f64>, Vec<f64>)> {
    chain(points, ChainSide::Upper)
}

enum ChainSide {
    Lower,
    Upper,
}

fn chain(points: &[[f64; 2]], side: ChainSide) -> SampledResult<(Vec<f64>, Vec<f64>)> {
    let sorted = sorted_unique(points);
    if sorted.is_empty() {
        return Err(SampledError::InvalidArg {
            what: "chain needs at least one point",
        });
    }
    if sorted.len() == 1 {
        // A degenerate chain is a constant function.
        return Ok((
            vec![sorted[0][0], sorted[0][0] + 1.0],
            vec![sorted[0][1], sorted[0][1]],
        ));
    }

    let mut hull: Vec<[f64; 2]> = Vec::with_capacity(sorted.len());
    match side {
        ChainSide::Lower => {
            for &p in &sorted {
                while hull.len() >= 2
                    && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
                {
                    hull.pop();
                }
                hull.push(p);
            }
        }
        ChainSide::Upper => {
            for &p in &sorted {
                while hull.len() >= 2
                    && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) >= 0.0
                {
                    hull.pop();
                }
                hull.push(p);
            }
        }
    }

    // Collapse any remaining ties in x so the chain is a function of x.
    let mut xs: Vec<f64> = Vec::with_capacity(hull.len());
    let mut ys: Vec<f64> = Vec::with_capacity(hull.len());
    for p in hull {
        if let Some(last_x) = xs.last().copied() {
            if p[0] == last_x {
                let last_y = ys[ys.len() - 1];
                let len = ys.len();
                ys[len - 1] = match side {
                    ChainSide::Lower => last_y.min(p[1]),
                    ChainSide::Upper => last_y.max(p[1]),
                };
                continue;
            }
        }
        xs.push(p[0]);
        ys.push(p[1]);
    }
    if xs.len() == 1 {
        xs.push(xs[0] + 1.0);
        ys.push(ys[0]);
    }
    Ok((xs, ys))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_chains() {
        let points = [
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.5, 0.5],
        ];
        let (lx, ly) = lower_chain(&points).unwrap();
        assert_eq!(lx, vec![0.0, 1.0]);
        assert_eq!(ly, vec![0.0, 0.0]);
        let (ux, uy) = upper_chain(&points).unwrap();
        assert_eq!(ux, vec![0.0, 1.0]);
        assert_eq!(uy, vec![1.0, 1.0]);
    }

    #[test]
    fn slanted_lower_chain_skips_interior() {
        let points = [[0.0, 0.0], [1.0, -1.0], [2.0, 0.5], [1.0, 2.0]];
        let (lx, ly) = lower_chain(&points).unwrap();
        assert_eq!(lx, vec![0.0, 1.0, 2.0]);
        assert_eq!(ly, vec![0.0, -1.0, 0.5]);
    }

    #[test]
    fn single_point_is_constant() {
        let (xs, ys) = lower_chain(&[[2.0, 3.0]]).unwrap();
        assert_eq!(ys, vec![3.0, 3.0]);
        assert_eq!(xs.len(), 2);
    }
}
