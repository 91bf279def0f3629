use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

// Ideal backbone geometry (Engh-Huber).
pub const BOND_N_CA: f64 = 1.458;
pub const BOND_CA_C: f64 = 1.525;
pub const BOND_C_N: f64 = 1.329;
pub const ANGLE_N_CA_C: f64 = 111.2;
pub const ANGLE_CA_C_N: f64 = 116.2;
pub const ANGLE_C_N_CA: f64 = 121.7;

/// Backbone heavy-atom positions of one residue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackboneTriad {
    pub n: Point3<f64>,
    pub ca: Point3<f64>,
    pub c: Point3<f64>,
}

impl BackboneTriad {
    /// The canonical local placement: N at the origin, CA on +x, C in the
    /// xy-plane at the ideal N-CA-C angle.
    pub fn local() -> Self {
        let theta = ANGLE_N_CA_C.to_radians();
        let n = Point3::origin();
        let ca = Point3::new(BOND_N_CA, 0.0, 0.0);
        let c = ca + Vector3::new(-theta.cos(), theta.sin(), 0.0) * BOND_CA_C;
        Self { n, ca, c }
    }

    pub fn points(&self) -> [Point3<f64>; 3] {
        [self.n, self.ca, self.c]
    }

    /// The rigid transform that carries the canonical local triad onto this
    /// one. Segment frames in the kinematic tree are exactly these.
    pub fn frame(&self) -> Isometry3<f64> {
        let (rotation, translation) =
            superposition_transform(&BackboneTriad::local().points(), &self.points());
        Isometry3::from_parts(
            Translation3::from(translation),
            UnitQuaternion::from_rotation_matrix(&rotation),
        )
    }

    pub fn transformed(&self, iso: &Isometry3<f64>) -> Self {
        Self {
            n: iso * self.n,
            ca: iso * self.ca,
            c: iso * self.c,
        }
    }
}

/// Places the next atom `d` of a chain given the three preceding atoms, the
/// `c`-`d` bond length, the `b`-`c`-`d` bond angle (degrees) and the
/// `a`-`b`-`c`-`d` dihedral (degrees). Standard natural-extension placement.
pub fn extend_chain_atom(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    bond_length: f64,
    bond_angle_deg: f64,
    dihedral_deg: f64,
) -> Point3<f64> {
    let theta = bond_angle_deg.to_radians();
    let chi = dihedral_deg.to_radians();

    let bc = (c - b).normalize();
    let ab = b - a;
    let normal = ab.cross(&bc).normalize();
    let in_plane = normal.cross(&bc);

    let local = Vector3::new(
        -bond_length * theta.cos(),
        bond_length * theta.sin() * chi.cos(),
        -bond_length * theta.sin() * chi.sin(),
    );

    c + bc * local.x + in_plane * local.y + normal * local.z
}

/// Least-squares rigid superposition (Kabsch via SVD) carrying `from_points`
/// onto `to_points`. Both slices must have equal, nonzero length.
pub fn superposition_transform(
    from_points: &[Point3<f64>],
    to_points: &[Point3<f64>],
) -> (Rotation3<f64>, Vector3<f64>) {
    debug_assert_eq!(from_points.len(), to_points.len());
    debug_assert!(!from_points.is_empty());

    let from_centroid_sum: Vector3<f64> = from_points.iter().map(|p| p.coords).sum();
    let from_centroid = Point3::from(from_centroid_sum / from_points.len() as f64);
    let to_centroid_sum: Vector3<f64> = to_points.iter().map(|p| p.coords).sum();
    let to_centroid = Point3::from(to_centroid_sum / to_points.len() as f64);

    let centered_from: Vec<_> = from_points.iter().map(|p| p - from_centroid).collect();
    let centered_to: Vec<_> = to_points.iter().map(|p| p - to_centroid).collect();

    let h = centered_from
        .iter()
        .zip(centered_to.iter())
        .fold(Matrix3::zeros(), |acc, (f, t)| acc + t * f.transpose());

    let svd = h.svd(true, true);
    let u = svd.u.unwrap();
    let v_t = svd.v_t.unwrap();

    let d = (u * v_t.transpose()).determinant();
    let mut correction = Matrix3::identity();
    if d < 0.0 {
        correction[(2, 2)] = -1.0;
    }

    let rotation_matrix = u * correction * v_t;
    let rotation = Rotation3::from_matrix(&rotation_matrix);
    let translation = to_centroid.coords - rotation * from_centroid.coords;

    (rotation, translation)
}

/// Root-mean-square deviation between two equal-length point sets, without
/// superposition.
pub fn rmsd(a: &[Point3<f64>], b: &[Point3<f64>]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    if a.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| (p - q).norm_squared())
        .sum();
    (sum_sq / a.len() as f64).sqrt()
}

/// RMSD after optimal rigid superposition of `a` onto `b`.
pub fn superimposed_rmsd(a: &[Point3<f64>], b: &[Point3<f64>]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let (rotation, translation) = superposition_transform(a, b);
    let moved: Vec<_> = a
        .iter()
        .map(|p| Point3::from(rotation * p.coords + translation))
        .collect();
    rmsd(&moved, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dihedral(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
        let b1 = b - a;
        let b2 = c - b;
        let b3 = d - c;
        let n1 = b1.cross(&b2);
        let n2 = b2.cross(&b3);
        let m1 = n1.cross(&b2.normalize());
        let x = n1.dot(&n2);
        let y = m1.dot(&n2);
        y.atan2(x).to_degrees()
    }

    #[test]
    fn extend_chain_atom_reproduces_bond_length_angle_and_dihedral() {
        let a = Point3::new(0.0, 1.4, 0.0);
        let b = Point3::new(0.0, 0.0, 0.0);
        let c = Point3::new(1.5, 0.0, 0.0);

        let d = extend_chain_atom(&a, &b, &c, 1.329, 116.2, -65.0);

        assert!(((d - c).norm() - 1.329).abs() < 1e-9);
        let cb = (b - c).normalize();
        let cd = (d - c).normalize();
        let angle = cb.dot(&cd).acos().to_degrees();
        assert!((angle - 116.2).abs() < 1e-6);
        assert!((dihedral(&a, &b, &c, &d) - (-65.0)).abs() < 1e-6);
    }

    #[test]
    fn local_triad_has_ideal_internal_geometry() {
        let t = BackboneTriad::local();
        assert!(((t.ca - t.n).norm() - BOND_N_CA).abs() < 1e-12);
        assert!(((t.c - t.ca).norm() - BOND_CA_C).abs() < 1e-12);
        let v1 = (t.n - t.ca).normalize();
        let v2 = (t.c - t.ca).normalize();
        let angle = v1.dot(&v2).acos().to_degrees();
        assert!((angle - ANGLE_N_CA_C).abs() < 1e-9);
    }

    #[test]
    fn triad_frame_round_trips_through_local() {
        let iso = Isometry3::new(Vector3::new(3.0, -2.0, 7.5), Vector3::new(0.3, 1.1, -0.4));
        let placed = BackboneTriad::local().transformed(&iso);
        let recovered = BackboneTriad::local().transformed(&placed.frame());
        assert!((recovered.n - placed.n).norm() < 1e-9);
        assert!((recovered.ca - placed.ca).norm() < 1e-9);
        assert!((recovered.c - placed.c).norm() < 1e-9);
    }

    #[test]
    fn superposition_transform_pure_translation() {
        let from = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let to = vec![
            Point3::new(10.0, 20.0, 30.0),
            Point3::new(11.0, 20.0, 30.0),
            Point3::new(10.0, 21.0, 30.0),
        ];

        let (rot, trans) = superposition_transform(&from, &to);

        assert!(
            rot.angle().abs() < 1e-9,
            "Rotation should be near zero for pure translation"
        );
        assert!(
            (trans - Vector3::new(10.0, 20.0, 30.0)).norm() < 1e-9,
            "Translation vector is incorrect"
        );
    }

    #[test]
    fn superimposed_rmsd_is_zero_for_rigidly_moved_copies() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.8, 0.0, 0.0),
            Point3::new(5.0, 3.0, 1.0),
            Point3::new(2.0, 5.0, -2.0),
        ];
        let iso = Isometry3::new(Vector3::new(-4.0, 2.0, 9.0), Vector3::new(1.0, 0.2, 0.5));
        let moved: Vec<_> = points.iter().map(|p| iso * p).collect();
        assert!(superimposed_rmsd(&points, &moved) < 1e-9);
    }

    #[test]
    fn rmsd_of_empty_sets_is_zero() {
        assert_eq!(rmsd(&[], &[]), 0.0);
    }
}
