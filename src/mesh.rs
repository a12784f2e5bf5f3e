//! Triangular meshes for filamentizing 2D current footprints.
use std::collections::{BTreeMap, BTreeSet};

use nalgebra::{DMatrix, Vector2};
use tracing::debug;

use crate::error::{check_finite, check_len, FieldError, FieldResult};

/// Barycentric coordinates below this are treated as outside the triangle.
const INSIDE_TOLERANCE: f64 = 1e-12;

type Edge = (usize, usize);

#[inline(always)]
fn edge(a: usize, b: usize) -> Edge {
    (a.min(b), a.max(b))
}

/// A 2D triangular mesh in the (r, z) plane.
#[derive(Clone, Debug, PartialEq)]
pub struct TriangularMesh {
    r: Vec<f64>,
    z: Vec<f64>,
    triangles: Vec<[usize; 3]>,
}

impl TriangularMesh {
    /// # Arguments
    ///
    /// * `r`:         (m) r-coord of each vertex, length `n`
    /// * `z`:         (m) z-coord of each vertex, length `n`
    /// * `triangles`: vertex indices of each triangle
    pub fn new(r: Vec<f64>, z: Vec<f64>, triangles: Vec<[usize; 3]>) -> FieldResult<Self> {
        check_len("mesh z-coords", &z, r.len())?;
        check_finite("mesh r-coords", &r)?;
        check_finite("mesh z-coords", &z)?;
        if triangles.is_empty() {
            return Err(FieldError::Empty("mesh triangles"));
        }
        for (t, tri) in triangles.iter().enumerate() {
            if let Some(&v) = tri.iter().find(|&&v| v >= r.len()) {
                return Err(FieldError::InvalidTriangle {
                    triangle: t,
                    vertex: v,
                    n_vertices: r.len(),
                });
            }
        }

        Ok(Self { r, z, triangles })
    }

    /// Regular hexagon of unit circumradius centred on the origin.
    ///
    /// Vertex 0 is the centre; vertices 1-6 run clockwise from `(0, 1)`.
    /// Each triangle is `[0, i, i % 6 + 1]`.
    pub fn unit_hexagon() -> Self {
        let a = 0.5 * 3.0_f64.sqrt();
        let r = vec![0.0, 0.0, a, a, 0.0, -a, -a];
        let z = vec![0.0, 1.0, 0.5, -0.5, -1.0, -0.5, 0.5];
        let triangles = (1..=6).map(|i| [0, i, i % 6 + 1]).collect();

        Self { r, z, triangles }
    }

    pub fn n_vertices(&self) -> usize {
        self.r.len()
    }

    pub fn n_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn r(&self) -> &[f64] {
        &self.r
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    #[inline]
    fn vertex(&self, i: usize) -> Vector2<f64> {
        Vector2::new(self.r[i], self.z[i])
    }

    /// (m) Centroid of each triangle, (r, z).
    pub fn centroids(&self) -> (Vec<f64>, Vec<f64>) {
        self.triangles
            .iter()
            .map(|[a, b, c]| {
                let p = (self.vertex(*a) + self.vertex(*b) + self.vertex(*c)) / 3.0;
                (p.x, p.y)
            })
            .unzip()
    }

    /// (m^2) Area of each triangle.
    pub fn triangle_areas(&self) -> Vec<f64> {
        self.triangles
            .iter()
            .map(|[a, b, c]| {
                let p0 = self.vertex(*a);
                0.5 * (self.vertex(*b) - p0).perp(&(self.vertex(*c) - p0)).abs()
            })
            .collect()
    }

    /// (m^2) Total mesh area.
    pub fn area(&self) -> f64 {
        self.triangle_areas().iter().sum()
    }

    /// Refine the triangles selected by `flags`.
    ///
    /// Flagged triangles are split into four at their edge midpoints. To keep the mesh
    /// conforming, an unflagged neighbour with exactly one split edge is bisected across
    /// that edge, and one with two or more split edges is refined like a flagged triangle.
    /// Midpoints are shared between the triangles on either side of an edge.
    pub fn refine(&self, flags: &[bool]) -> FieldResult<Self> {
        if flags.len() != self.n_triangles() {
            return Err(FieldError::LengthMismatch {
                what: "refinement flags",
                expected: self.n_triangles(),
                got: flags.len(),
            });
        }
        Ok(self.refine_flagged(flags))
    }

    /// Refine every triangle.
    pub fn refine_all(&self) -> Self {
        self.refine_flagged(&vec![true; self.n_triangles()])
    }

    /// Refinement with `flags.len() == self.n_triangles()` already checked.
    fn refine_flagged(&self, flags: &[bool]) -> Self {
        let edges_of = |[a, b, c]: [usize; 3]| [edge(a, b), edge(b, c), edge(c, a)];

        // Propagate full refinement until no triangle has more than one hanging edge
        let mut refine = flags.to_vec();
        let mut split: BTreeSet<Edge> = BTreeSet::new();
        loop {
            for (tri, _) in self.triangles.iter().zip(refine.iter()).filter(|(_, f)| **f) {
                split.extend(edges_of(*tri));
            }
            let mut changed = false;
            for (tri, f) in self.triangles.iter().zip(refine.iter_mut()) {
                if !*f && edges_of(*tri).iter().filter(|e| split.contains(*e)).count() >= 2 {
                    *f = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        // New vertices at split-edge midpoints, numbered in triangle order
        let mut r = self.r.clone();
        let mut z = self.z.clone();
        let mut midpoints: BTreeMap<Edge, usize> = BTreeMap::new();
        for tri in self.triangles.iter() {
            for e in edges_of(*tri) {
                if split.contains(&e) && !midpoints.contains_key(&e) {
                    let m = (self.vertex(e.0) + self.vertex(e.1)) * 0.5;
                    midpoints.insert(e, r.len());
                    r.push(m.x);
                    z.push(m.y);
                }
            }
        }

        let mut triangles = Vec::with_capacity(4 * self.n_triangles());
        for (&[a, b, c], &full) in self.triangles.iter().zip(refine.iter()) {
            let mab = midpoints.get(&edge(a, b)).copied();
            let mbc = midpoints.get(&edge(b, c)).copied();
            let mca = midpoints.get(&edge(c, a)).copied();

            match (full, mab, mbc, mca) {
                (true, Some(mab), Some(mbc), Some(mca)) => {
                    triangles.push([a, mab, mca]);
                    triangles.push([mab, b, mbc]);
                    triangles.push([mca, mbc, c]);
                    triangles.push([mab, mbc, mca]);
                }
                (false, Some(m), None, None) => {
                    triangles.push([a, m, c]);
                    triangles.push([m, b, c]);
                }
                (false, None, Some(m), None) => {
                    triangles.push([b, m, a]);
                    triangles.push([m, c, a]);
                }
                (false, None, None, Some(m)) => {
                    triangles.push([c, m, b]);
                    triangles.push([m, a, b]);
                }
                _ => triangles.push([a, b, c]),
            }
        }

        debug!(
            n_flagged = flags.iter().filter(|f| **f).count(),
            n_triangles_before = self.n_triangles(),
            n_triangles_after = triangles.len(),
            n_vertices_after = r.len(),
            "refined triangular mesh"
        );

        Self { r, z, triangles }
    }

    /// Piecewise-linear interpolation matrix from vertex values to query points.
    ///
    /// Returns shape `(n_points, n_vertices)`; row `i` holds the barycentric weights of
    /// point `i` within the first triangle that contains it. Rows for points outside
    /// the mesh are zero.
    pub fn interpolator_matrix(&self, r: &[f64], z: &[f64]) -> FieldResult<DMatrix<f64>> {
        check_len("query z-coords", z, r.len())?;
        let mut out = DMatrix::zeros(r.len(), self.n_vertices());

        for i in 0..r.len() {
            let p = Vector2::new(r[i], z[i]);
            for &[a, b, c] in self.triangles.iter() {
                let p0 = self.vertex(a);
                let v0 = self.vertex(b) - p0;
                let v1 = self.vertex(c) - p0;
                let v2 = p - p0;
                let d = v0.perp(&v1);
                if d == 0.0 {
                    continue; // Degenerate
                }
                let s = v2.perp(&v1) / d;
                let t = v0.perp(&v2) / d;
                let l0 = 1.0 - s - t;
                if l0 >= -INSIDE_TOLERANCE && s >= -INSIDE_TOLERANCE && t >= -INSIDE_TOLERANCE {
                    out[(i, a)] = l0;
                    out[(i, b)] = s;
                    out[(i, c)] = t;
                    break;
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_hexagon() {
        let mesh = TriangularMesh::unit_hexagon();
        assert_eq!(mesh.n_vertices(), 7);
        assert_eq!(mesh.n_triangles(), 6);
        assert_eq!(mesh.triangles()[5], [0, 6, 1]);
        assert_relative_eq!(mesh.area(), 1.5 * 3.0_f64.sqrt(), max_relative = 1e-14);
        for i in 1..7 {
            assert_relative_eq!(mesh.vertex(i).norm(), 1.0, max_relative = 1e-15);
        }
    }

    #[test]
    fn test_invalid_mesh() {
        assert!(matches!(
            TriangularMesh::new(vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0], vec![[0, 1, 3]]),
            Err(FieldError::InvalidTriangle { vertex: 3, .. })
        ));
        assert!(TriangularMesh::new(vec![0.0], vec![0.0], vec![]).is_err());
    }

    /// Uniform refinement quarters every triangle and shares midpoints
    #[test]
    fn test_refine_all() {
        let mut mesh = TriangularMesh::unit_hexagon();
        let area = mesh.area();
        for level in 1..=3 {
            mesh = mesh.refine_all();
            assert_eq!(mesh.n_triangles(), 6 * 4_usize.pow(level));
            assert_relative_eq!(mesh.area(), area, max_relative = 1e-13);

            // Every sub-triangle is congruent
            let areas = mesh.triangle_areas();
            for a in areas.iter() {
                assert_relative_eq!(*a, areas[0], max_relative = 1e-10);
            }
        }
        // Vertex count of a hexagon refined to 3 levels: 1 + 3 n (n + 1) with n = 8
        assert_eq!(mesh.n_vertices(), 217);
    }

    /// Refining one triangle bisects its two neighbours and leaves the rest alone
    #[test]
    fn test_refine_partial() {
        let mesh = TriangularMesh::unit_hexagon();
        let mut flags = vec![false; 6];
        flags[0] = true;
        let refined = mesh.refine(&flags).unwrap();
        assert_eq!(refined.n_triangles(), 4 + 2 + 2 + 3);
        assert_eq!(refined.n_vertices(), 7 + 3);
        assert_relative_eq!(refined.area(), mesh.area(), max_relative = 1e-14);

        assert!(matches!(
            mesh.refine(&[true]),
            Err(FieldError::LengthMismatch { .. })
        ));
    }

    /// Two split edges on an unflagged triangle force full refinement
    #[test]
    fn test_refine_propagation() {
        let mesh = TriangularMesh::unit_hexagon();
        let flags = [true, false, true, false, false, false];
        let refined = mesh.refine(&flags).unwrap();
        // Triangles 0, 1, 2 are quartered; 3 and 5 are bisected; 4 is untouched
        assert_eq!(refined.n_triangles(), 3 * 4 + 2 * 2 + 1);
        assert_relative_eq!(refined.area(), mesh.area(), max_relative = 1e-14);
    }

    #[test]
    fn test_interpolator_matrix() {
        let mesh = TriangularMesh::unit_hexagon();
        let r = [0.0, 0.0, 0.2, 0.1, 3.0];
        let z = [0.0, 1.0, 0.1, -0.3, 0.0];
        let m = mesh.interpolator_matrix(&r, &z).unwrap();
        assert_eq!(m.shape(), (5, 7));

        // Vertices interpolate to themselves
        assert_relative_eq!(m[(0, 0)], 1.0, epsilon = 1e-15);
        assert_relative_eq!(m[(1, 1)], 1.0, epsilon = 1e-15);

        // Interior rows are a partition of unity and reproduce linear functions
        for i in 0..4 {
            assert_relative_eq!(m.row(i).sum(), 1.0, epsilon = 1e-14);
            let rr: f64 = (0..7).map(|j| m[(i, j)] * mesh.r()[j]).sum();
            let zz: f64 = (0..7).map(|j| m[(i, j)] * mesh.z()[j]).sum();
            assert_relative_eq!(rr, r[i], epsilon = 1e-14);
            assert_relative_eq!(zz, z[i], epsilon = 1e-14);
        }

        // Outside the mesh
        assert_eq!(m.row(4).sum(), 0.0);
    }
}
