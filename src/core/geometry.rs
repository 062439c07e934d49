//! Almost all nontrivial graphics programs are built on a foundation
//! of geometric classes. These classes represent mathematical
//! constructs like points, vectors, rays, and axis-aligned boxes.
//!
//! # Points, Vectors and Normals
//!
//! A **point** is a zero-dimensional location in 3D space, a
//! **vector** represents a direction, and a **normal** is a vector
//! perpendicular to a surface at a particular position.
//!
//! ```rust
//! use rs_sbvh::core::geometry::{Point3f, Vector3f};
//!
//!     let origin = Point3f {
//!         x: 0.0,
//!         y: 0.0,
//!         z: 0.0,
//!     };
//!     let up = Vector3f {
//!         x: 0.0,
//!         y: 1.0,
//!         z: 0.0,
//!     };
//!
//!     println!("{:?}", origin + up);
//! ```
//!
//! # Bounding Boxes
//!
//! The acceleration structure stores **axis-aligned bounding boxes**
//! (AABBs) for every node. The default box is *empty*: its minimum
//! corner is at positive infinity and its maximum corner at negative
//! infinity, so that the union with any point yields a valid box.
//!
//! ```rust
//! use rs_sbvh::core::geometry::{bnd3_union_pnt3f, Bounds3f, Point3f};
//!
//!     let empty = Bounds3f::default();
//!     assert_eq!(empty.surface_area(), 0.0);
//!     let b = bnd3_union_pnt3f(&empty, &Point3f { x: 1.0, y: 2.0, z: 3.0 });
//!     assert!(b.is_valid());
//! ```
//!
//! # Rays
//!
//! A **ray** is a semi-infinite line specified by its origin and
//! direction, limited to the parametric segment `[t_min, t_max]`. The
//! upper limit lives in a `Cell` so a closest-hit query can shrink it
//! through a shared reference.

// std
use std::cell::Cell;
use std::ops;
use std::ops::{Index, IndexMut};
// others
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
// pbrt
use crate::core::pbrt::{gamma, nonzero_or_tiny, Float};

#[derive(EnumIter, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum MinMaxEnum {
    Min = 0,
    Max = 1,
}

#[derive(EnumIter, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum XYZEnum {
    X = 0,
    Y = 1,
    Z = 2,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point2f {
    pub x: Float,
    pub y: Float,
}

impl_op_ex!(+|a: &Point2f, b: &Point2f| -> Point2f {
    Point2f {
        x: a.x + b.x,
        y: a.y + b.y,
    }
});

impl_op_ex!(*|a: &Point2f, b: Float| -> Point2f {
    Point2f {
        x: a.x * b,
        y: a.y * b,
    }
});

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Vector3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Vector3f {
    pub fn abs(&self) -> Vector3f {
        Vector3f {
            x: self.x.abs(),
            y: self.y.abs(),
            z: self.z.abs(),
        }
    }
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    /// Compute a new vector pointing in the same direction but with unit
    /// length.
    pub fn normalize(&self) -> Vector3f {
        *self / self.length()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Point3f {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Normal3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Normal3f {
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    /// Compute a new normal pointing in the same direction but with unit
    /// length.
    pub fn normalize(&self) -> Normal3f {
        *self / self.length()
    }
}

impl_op!(-|a: Vector3f| -> Vector3f {
    Vector3f {
        x: -a.x,
        y: -a.y,
        z: -a.z,
    }
});

impl_op!(-|a: Normal3f| -> Normal3f {
    Normal3f {
        x: -a.x,
        y: -a.y,
        z: -a.z,
    }
});

impl_op_ex!(+|a: &Point3f, b: &Point3f| -> Point3f {
    Point3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(+|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(+|a: &Normal3f, b: &Normal3f| -> Normal3f {
    Normal3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(+|a: &Point3f, b: &Vector3f| -> Point3f {
    Point3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Point3f, b: &Point3f| -> Vector3f {
    Vector3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(-|a: &Point3f, b: &Vector3f| -> Point3f {
    Point3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(*|a: &Point3f, b: Float| -> Point3f {
    Point3f {
        x: a.x * b,
        y: a.y * b,
        z: a.z * b,
    }
});

impl_op_ex!(*|a: &Vector3f, b: Float| -> Vector3f {
    Vector3f {
        x: a.x * b,
        y: a.y * b,
        z: a.z * b,
    }
});

impl_op_ex!(*|a: &Normal3f, b: Float| -> Normal3f {
    Normal3f {
        x: a.x * b,
        y: a.y * b,
        z: a.z * b,
    }
});

impl_op_ex!(/|a: &Vector3f, b: Float| -> Vector3f {
    assert_ne!(b, 0.0 as Float);
    let inv: Float = 1.0 as Float / b;
    Vector3f {
        x: a.x * inv,
        y: a.y * inv,
        z: a.z * inv,
    }
});

impl_op_ex!(/|a: &Normal3f, b: Float| -> Normal3f {
    assert_ne!(b, 0.0 as Float);
    let inv: Float = 1.0 as Float / b;
    Normal3f {
        x: a.x * inv,
        y: a.y * inv,
        z: a.z * inv,
    }
});

impl Index<XYZEnum> for Vector3f {
    type Output = Float;
    fn index(&self, index: XYZEnum) -> &Float {
        match index {
            XYZEnum::X => &self.x,
            XYZEnum::Y => &self.y,
            _ => &self.z,
        }
    }
}

impl Index<XYZEnum> for Point3f {
    type Output = Float;
    fn index(&self, index: XYZEnum) -> &Float {
        match index {
            XYZEnum::X => &self.x,
            XYZEnum::Y => &self.y,
            _ => &self.z,
        }
    }
}

impl IndexMut<XYZEnum> for Point3f {
    fn index_mut(&mut self, index: XYZEnum) -> &mut Float {
        match index {
            XYZEnum::X => &mut self.x,
            XYZEnum::Y => &mut self.y,
            _ => &mut self.z,
        }
    }
}

impl From<Point3f> for Vector3f {
    fn from(p: Point3f) -> Self {
        Vector3f {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

impl From<Normal3f> for Vector3f {
    fn from(n: Normal3f) -> Self {
        Vector3f {
            x: n.x,
            y: n.y,
            z: n.z,
        }
    }
}

impl From<Vector3f> for Normal3f {
    fn from(v: Vector3f) -> Self {
        Normal3f {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// Product of the Euclidean magnitudes of the two vectors and the
/// cosine of the angle between them.
pub fn vec3_dot_vec3f(v1: &Vector3f, v2: &Vector3f) -> Float {
    v1.x * v2.x + v1.y * v2.y + v1.z * v2.z
}

/// Given two vectors in 3D, the cross product is a vector that is
/// perpendicular to both of them.
pub fn vec3_cross_vec3(v1: &Vector3f, v2: &Vector3f) -> Vector3f {
    let v1x: f64 = v1.x as f64;
    let v1y: f64 = v1.y as f64;
    let v1z: f64 = v1.z as f64;
    let v2x: f64 = v2.x as f64;
    let v2y: f64 = v2.y as f64;
    let v2z: f64 = v2.z as f64;
    Vector3f {
        x: ((v1y * v2z) - (v1z * v2y)) as Float,
        y: ((v1z * v2x) - (v1x * v2z)) as Float,
        z: ((v1x * v2y) - (v1y * v2x)) as Float,
    }
}

/// Return the largest coordinate value.
pub fn vec3_max_componentf(v: &Vector3f) -> Float {
    v.x.max(v.y.max(v.z))
}

/// Return the index of the component with the largest value.
pub fn vec3_max_dimensionf(v: &Vector3f) -> usize {
    if v.x > v.y {
        if v.x > v.z {
            0_usize
        } else {
            2_usize
        }
    } else if v.y > v.z {
        1_usize
    } else {
        2_usize
    }
}

/// Permute the coordinate values according to the provided
/// permutation.
pub fn vec3_permutef(v: &Vector3f, x: usize, y: usize, z: usize) -> Vector3f {
    let v3: Vec<Float> = vec![v.x, v.y, v.z];
    Vector3f {
        x: v3[x],
        y: v3[y],
        z: v3[z],
    }
}

/// Permute the coordinate values according to the provided
/// permutation.
pub fn pnt3_permutef(p: &Point3f, x: usize, y: usize, z: usize) -> Point3f {
    let p3: Vec<Float> = vec![p.x, p.y, p.z];
    Point3f {
        x: p3[x],
        y: p3[y],
        z: p3[z],
    }
}

pub fn nrm_dot_nrmf(n1: &Normal3f, n2: &Normal3f) -> Float {
    n1.x * n2.x + n1.y * n2.y + n1.z * n2.z
}

/// Flip a normal so that it lies in the same hemisphere as a second
/// normal.
pub fn nrm_faceforward_nrm(n: &Normal3f, n2: &Normal3f) -> Normal3f {
    if nrm_dot_nrmf(n, n2) < 0.0 as Float {
        -(*n)
    } else {
        *n
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds3f {
    pub p_min: Point3f,
    pub p_max: Point3f,
}

impl Default for Bounds3f {
    fn default() -> Bounds3f {
        let inf: Float = std::f32::INFINITY;
        Bounds3f {
            p_min: Point3f {
                x: inf,
                y: inf,
                z: inf,
            },
            p_max: Point3f {
                x: -inf,
                y: -inf,
                z: -inf,
            },
        }
    }
}

impl Bounds3f {
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        let p_min: Point3f = Point3f {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            z: p1.z.min(p2.z),
        };
        let p_max: Point3f = Point3f {
            x: p1.x.max(p2.x),
            y: p1.y.max(p2.y),
            z: p1.z.max(p2.z),
        };
        Bounds3f { p_min, p_max }
    }
    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }
    pub fn centroid(&self) -> Point3f {
        self.p_min * 0.5 + self.p_max * 0.5
    }
    /// Surface area of the box; axes with a negative extent (empty
    /// boxes) count as zero.
    pub fn surface_area(&self) -> Float {
        let d: Vector3f = self.diagonal();
        let dx: Float = d.x.max(0.0 as Float);
        let dy: Float = d.y.max(0.0 as Float);
        let dz: Float = d.z.max(0.0 as Float);
        // 2 * (d.x * d.y + d.x * d.z + d.y * d.z)
        let r: Float = dx * dy + dx * dz + dy * dz;
        r + r // avoid '2 *'
    }
    pub fn maximum_extent(&self) -> XYZEnum {
        let d: Vector3f = self.diagonal();
        if d.x > d.y && d.x > d.z {
            XYZEnum::X
        } else if d.y > d.z {
            XYZEnum::Y
        } else {
            XYZEnum::Z
        }
    }
    pub fn offset(&self, p: &Point3f) -> Vector3f {
        let mut o: Vector3f = p - self.p_min;
        if self.p_max.x > self.p_min.x {
            o.x /= self.p_max.x - self.p_min.x;
        }
        if self.p_max.y > self.p_min.y {
            o.y /= self.p_max.y - self.p_min.y;
        }
        if self.p_max.z > self.p_min.z {
            o.z /= self.p_max.z - self.p_min.z;
        }
        o
    }
    /// Finite corners with `p_max >= p_min` on every axis.
    pub fn is_valid(&self) -> bool {
        self.p_min.is_finite()
            && self.p_max.is_finite()
            && self.p_max.x >= self.p_min.x
            && self.p_max.y >= self.p_min.y
            && self.p_max.z >= self.p_min.z
    }
    /// Widen an invalid or zero-area box by *epsilon* on both bounds.
    /// Non-finite coordinates are replaced by the finite opposite
    /// corner first; a box without any finite coordinate collapses to
    /// the origin.
    pub fn fix_degenerate(&self, epsilon: Float) -> Bounds3f {
        if self.is_valid() && self.surface_area() > 0.0 as Float {
            return *self;
        }
        let mut b: Bounds3f = *self;
        for axis in XYZEnum::iter() {
            let lo: Float = b.p_min[axis];
            let hi: Float = b.p_max[axis];
            let (lo, hi) = match (lo.is_finite(), hi.is_finite()) {
                (true, true) => (lo.min(hi), lo.max(hi)),
                (true, false) => (lo, lo),
                (false, true) => (hi, hi),
                (false, false) => (0.0 as Float, 0.0 as Float),
            };
            b.p_min[axis] = lo - epsilon;
            b.p_max[axis] = hi + epsilon;
        }
        b
    }
    /// Slab test against the segment `[t_min, t_max]` using the
    /// precomputed reciprocal direction. Returns the entry distance.
    pub fn intersect_p(&self, inv: &RayInverse, t_min: Float, t_max: Float) -> Option<Float> {
        let (tx_min, tx_max) = self.slab(inv, XYZEnum::X);
        let (ty_min, ty_max) = self.slab(inv, XYZEnum::Y);
        let (tz_min, tz_max) = self.slab(inv, XYZEnum::Z);
        let t_near: Float = tx_min.max(ty_min).max(tz_min).max(t_min);
        let t_far: Float = tx_max.min(ty_max).min(tz_max).min(t_max);
        if t_near <= t_far {
            Some(t_near)
        } else {
            None
        }
    }
    /// Same as `intersect_p()`, but the upper limit is read from the
    /// ray's current `t_max`.
    pub fn intersect_p_ray(&self, inv: &RayInverse, ray: &Ray) -> Option<Float> {
        self.intersect_p(inv, ray.t_min, ray.t_max.get())
    }
    fn slab(&self, inv: &RayInverse, axis: XYZEnum) -> (Float, Float) {
        let a: usize = axis as usize;
        let near: MinMaxEnum = if inv.dir_is_neg[a] == 0 {
            MinMaxEnum::Min
        } else {
            MinMaxEnum::Max
        };
        let far: MinMaxEnum = if inv.dir_is_neg[a] == 0 {
            MinMaxEnum::Max
        } else {
            MinMaxEnum::Min
        };
        let near_scaled: Float = self[near][axis] * inv.inv_dir[axis];
        let far_scaled: Float = self[far][axis] * inv.inv_dir[axis];
        let t0: Float = near_scaled + inv.neg_org_inv_dir[axis];
        let t1: Float = far_scaled + inv.neg_org_inv_dir[axis];
        // conservative rounding error of the fused form
        let err: Float = gamma(3_i32)
            * (near_scaled.abs().max(far_scaled.abs()) + inv.neg_org_inv_dir[axis].abs());
        (t0 - err, t1 + err)
    }
}

impl Index<MinMaxEnum> for Bounds3f {
    type Output = Point3f;
    fn index(&self, i: MinMaxEnum) -> &Point3f {
        match i {
            MinMaxEnum::Min => &self.p_min,
            _ => &self.p_max,
        }
    }
}

/// Given a bounding box and a point, the **bnd3_union_pnt3f()**
/// function returns a new bounding box that encompasses that point as
/// well as the original box.
pub fn bnd3_union_pnt3f(b: &Bounds3f, p: &Point3f) -> Bounds3f {
    let p_min: Point3f = Point3f {
        x: b.p_min.x.min(p.x),
        y: b.p_min.y.min(p.y),
        z: b.p_min.z.min(p.z),
    };
    let p_max: Point3f = Point3f {
        x: b.p_max.x.max(p.x),
        y: b.p_max.y.max(p.y),
        z: b.p_max.z.max(p.z),
    };
    Bounds3f { p_min, p_max }
}

/// Construct a new box that bounds the space encompassed by two other
/// bounding boxes.
pub fn bnd3_union_bnd3f(b1: &Bounds3f, b2: &Bounds3f) -> Bounds3f {
    let p_min: Point3f = Point3f {
        x: b1.p_min.x.min(b2.p_min.x),
        y: b1.p_min.y.min(b2.p_min.y),
        z: b1.p_min.z.min(b2.p_min.z),
    };
    let p_max: Point3f = Point3f {
        x: b1.p_max.x.max(b2.p_max.x),
        y: b1.p_max.y.max(b2.p_max.y),
        z: b1.p_max.z.max(b2.p_max.z),
    };
    Bounds3f { p_min, p_max }
}

/// The overlap of two boxes. Disjoint boxes give an invalid box, with
/// `p_max < p_min` on at least one axis.
pub fn bnd3_intersect_bnd3f(b1: &Bounds3f, b2: &Bounds3f) -> Bounds3f {
    Bounds3f {
        p_min: Point3f {
            x: b1.p_min.x.max(b2.p_min.x),
            y: b1.p_min.y.max(b2.p_min.y),
            z: b1.p_min.z.max(b2.p_min.z),
        },
        p_max: Point3f {
            x: b1.p_max.x.min(b2.p_max.x),
            y: b1.p_max.y.min(b2.p_max.y),
            z: b1.p_max.z.min(b2.p_max.z),
        },
    }
}

/// Surface area of the overlap of two boxes, zero unless they
/// overlap on all three axes.
pub fn bnd3_overlap_area(b1: &Bounds3f, b2: &Bounds3f) -> Float {
    let overlap: Bounds3f = bnd3_intersect_bnd3f(b1, b2);
    if overlap.p_max.x < overlap.p_min.x
        || overlap.p_max.y < overlap.p_min.y
        || overlap.p_max.z < overlap.p_min.z
    {
        0.0 as Float
    } else {
        overlap.surface_area()
    }
}

/// Determine if a given point is inside the bounding box.
pub fn pnt3_inside_bnd3(p: &Point3f, b: &Bounds3f) -> bool {
    p.x >= b.p_min.x
        && p.x <= b.p_max.x
        && p.y >= b.p_min.y
        && p.y <= b.p_max.y
        && p.z >= b.p_min.z
        && p.z <= b.p_max.z
}

/// Is the box *inner* completely contained in *outer*?
pub fn bnd3_inside_bnd3(inner: &Bounds3f, outer: &Bounds3f) -> bool {
    pnt3_inside_bnd3(&inner.p_min, outer) && pnt3_inside_bnd3(&inner.p_max, outer)
}

/// Pads the bounding box by a constant factor in all dimensions.
pub fn bnd3_expand(b: &Bounds3f, delta: Float) -> Bounds3f {
    Bounds3f::new(
        b.p_min
            - Vector3f {
                x: delta,
                y: delta,
                z: delta,
            },
        b.p_max
            + Vector3f {
                x: delta,
                y: delta,
                z: delta,
            },
    )
}

#[derive(Debug, Default, Clone)]
pub struct Ray {
    /// origin
    pub o: Point3f,
    /// direction
    pub d: Vector3f,
    /// lower limit of the segment along the ray
    pub t_min: Float,
    /// upper limit, shrinks while searching for the closest hit
    pub t_max: Cell<Float>,
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f, t_min: Float, t_max: Float) -> Self {
        Ray {
            o,
            d,
            t_min,
            t_max: Cell::new(t_max),
        }
    }
    // Point3f operator()(Float t) const { return o + d * t; }
    pub fn position(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }
}

/// Per-ray constants of the slab test: the reciprocal direction, the
/// origin scaled by it, and which bound of each axis is hit first.
#[derive(Debug, Default, Copy, Clone)]
pub struct RayInverse {
    pub inv_dir: Vector3f,
    pub neg_org_inv_dir: Vector3f,
    pub dir_is_neg: [u8; 3],
}

impl RayInverse {
    pub fn new(ray: &Ray) -> Self {
        let inv_dir: Vector3f = Vector3f {
            x: 1.0 as Float / nonzero_or_tiny(ray.d.x),
            y: 1.0 as Float / nonzero_or_tiny(ray.d.y),
            z: 1.0 as Float / nonzero_or_tiny(ray.d.z),
        };
        let neg_org_inv_dir: Vector3f = Vector3f {
            x: -ray.o.x * inv_dir.x,
            y: -ray.o.y * inv_dir.y,
            z: -ray.o.z * inv_dir.z,
        };
        let dir_is_neg: [u8; 3] = [
            (inv_dir.x < 0.0) as u8,
            (inv_dir.y < 0.0) as u8,
            (inv_dir.z < 0.0) as u8,
        ];
        RayInverse {
            inv_dir,
            neg_org_inv_dir,
            dir_is_neg,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Bounds3f {
        Bounds3f::new(
            Point3f {
                x: -1.0,
                y: -1.0,
                z: -1.0,
            },
            Point3f {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            },
        )
    }

    #[test]
    fn empty_box_unions() {
        let empty = Bounds3f::default();
        assert!(!empty.is_valid());
        assert_eq!(empty.surface_area(), 0.0);
        let b = bnd3_union_bnd3f(&empty, &unit_box());
        assert_eq!(b, unit_box());
        // idempotent
        assert_eq!(bnd3_union_bnd3f(&b, &unit_box()), b);
    }

    #[test]
    fn surface_area_and_extent() {
        let b = Bounds3f::new(
            Point3f::default(),
            Point3f {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            },
        );
        assert_relative_eq!(b.surface_area(), 22.0);
        assert_eq!(b.maximum_extent(), XYZEnum::Z);
        let o = b.offset(&Point3f {
            x: 0.5,
            y: 1.0,
            z: 3.0,
        });
        assert_relative_eq!(o.x, 0.5);
        assert_relative_eq!(o.y, 0.5);
        assert_relative_eq!(o.z, 1.0);
    }

    #[test]
    fn disjoint_intersection_has_no_area() {
        let a = unit_box();
        let b = bnd3_expand(
            &Bounds3f::new(
                Point3f {
                    x: 3.0,
                    y: 3.0,
                    z: 3.0,
                },
                Point3f {
                    x: 4.0,
                    y: 4.0,
                    z: 4.0,
                },
            ),
            0.0,
        );
        assert_eq!(bnd3_overlap_area(&a, &b), 0.0);
        assert_relative_eq!(bnd3_overlap_area(&a, &a), 24.0);
        // apart along x only, the y and z extents still overlap fully
        let shifted = Bounds3f::new(
            Point3f {
                x: 9.0,
                y: -1.0,
                z: -1.0,
            },
            Point3f {
                x: 11.0,
                y: 1.0,
                z: 1.0,
            },
        );
        assert!(!bnd3_intersect_bnd3f(&a, &shifted).is_valid());
        assert_eq!(bnd3_overlap_area(&a, &shifted), 0.0);
        // touching faces overlap in a flat box
        let touching = Bounds3f::new(
            Point3f {
                x: 1.0,
                y: -1.0,
                z: -1.0,
            },
            Point3f {
                x: 3.0,
                y: 1.0,
                z: 1.0,
            },
        );
        assert_relative_eq!(bnd3_overlap_area(&a, &touching), 8.0);
    }

    #[test]
    fn degenerate_boxes_get_widened() {
        let p = Point3f {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        };
        let point_box = Bounds3f::new(p, p);
        let fixed = point_box.fix_degenerate(1e-3);
        assert!(fixed.is_valid());
        assert!(fixed.surface_area() > 0.0);
        assert!(pnt3_inside_bnd3(&p, &fixed));
        let broken = Bounds3f {
            p_min: Point3f {
                x: std::f32::NAN,
                y: 0.0,
                z: 0.0,
            },
            p_max: Point3f {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            },
        };
        assert!(broken.fix_degenerate(1e-3).is_valid());
    }

    #[test]
    fn slab_test_hits_and_misses() {
        let b = unit_box();
        let ray = Ray::new(
            Point3f {
                x: 0.0,
                y: 0.0,
                z: -5.0,
            },
            Vector3f {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            },
            0.0,
            std::f32::INFINITY,
        );
        let inv = RayInverse::new(&ray);
        let t = b.intersect_p_ray(&inv, &ray);
        assert!(t.is_some());
        assert_relative_eq!(t.unwrap_or(0.0), 4.0, epsilon = 1e-4);
        // box behind the tightened segment
        assert!(b.intersect_p(&inv, 0.0, 3.0).is_none());
        ray.t_max.set(3.5);
        assert!(b.intersect_p_ray(&inv, &ray).is_none());
        let sideways = Ray::new(
            ray.o,
            Vector3f {
                x: 1.0,
                y: 0.0,
                z: 0.0,
            },
            0.0,
            std::f32::INFINITY,
        );
        let inv = RayInverse::new(&sideways);
        assert!(b.intersect_p_ray(&inv, &sideways).is_none());
    }

    #[test]
    fn slab_test_accepts_flat_boxes() {
        // a box with zero thickness along z, hit head-on
        let flat = Bounds3f::new(
            Point3f {
                x: -1.0,
                y: -1.0,
                z: 0.3,
            },
            Point3f {
                x: 1.0,
                y: 1.0,
                z: 0.3,
            },
        );
        let ray = Ray::new(
            Point3f {
                x: 0.1,
                y: 0.2,
                z: -7.0,
            },
            Vector3f {
                x: 0.01,
                y: 0.02,
                z: 1.0,
            }
            .normalize(),
            0.0,
            std::f32::INFINITY,
        );
        let inv = RayInverse::new(&ray);
        assert!(flat.intersect_p_ray(&inv, &ray).is_some());
    }
}
