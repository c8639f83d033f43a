//! Elementwise numeric kernels over strided box regions.
//!
//! Each kernel iterates an explicit region (in destination index space) and
//! addresses every operand through the full box it is allocated on. Source
//! operands carry their own region low corner (`src_lo`), so source and
//! destination may sit at different positions of index space, as they do for
//! periodic images. Slices start at the first component to process; component
//! `c` of an operand begins `c * volume` elements further on.
//!
//! None of these know anything about ownership or distribution.

use crate::geometry::index_box::IndexBox;
use crate::geometry::int_vect::IntVect;
use num_traits::Float;

/// Read-only operand: data plus the box it is allocated on.
#[derive(Copy, Clone)]
pub struct FabRef<'a, T, const D: usize> {
    pub data: &'a [T],
    pub bx: &'a IndexBox<D>,
}

/// Mutable operand: data plus the box it is allocated on.
pub struct FabMut<'a, T, const D: usize> {
    pub data: &'a mut [T],
    pub bx: &'a IndexBox<D>,
}

/// Visit `(dst_offset, src_offset)` for every cell of `region` and every component.
#[inline]
fn zip_offsets<const D: usize>(
    region: &IndexBox<D>,
    dbox: &IndexBox<D>,
    sbox: &IndexBox<D>,
    src_lo: IntVect<D>,
    ncomp: usize,
    mut f: impl FnMut(usize, usize),
) {
    let shift = src_lo - region.lo();
    let (dvol, svol) = (dbox.volume(), sbox.volume());
    for c in 0..ncomp {
        for iv in region.cells() {
            f(c * dvol + dbox.offset(&iv), c * svol + sbox.offset(&(iv + shift)));
        }
    }
}

#[inline]
fn each_offset<const D: usize>(
    region: &IndexBox<D>,
    bx: &IndexBox<D>,
    ncomp: usize,
    mut f: impl FnMut(usize),
) {
    let vol = bx.volume();
    for c in 0..ncomp {
        for iv in region.cells() {
            f(c * vol + bx.offset(&iv));
        }
    }
}

/// `dst = src`
pub fn copy<T: Float, const D: usize>(
    region: &IndexBox<D>,
    dst: FabMut<'_, T, D>,
    src: FabRef<'_, T, D>,
    src_lo: IntVect<D>,
    ncomp: usize,
) {
    zip_offsets(region, dst.bx, src.bx, src_lo, ncomp, |d, s| dst.data[d] = src.data[s]);
}

/// `dst += src`
pub fn plus<T: Float, const D: usize>(
    region: &IndexBox<D>,
    dst: FabMut<'_, T, D>,
    src: FabRef<'_, T, D>,
    src_lo: IntVect<D>,
    ncomp: usize,
) {
    zip_offsets(region, dst.bx, src.bx, src_lo, ncomp, |d, s| {
        dst.data[d] = dst.data[d] + src.data[s]
    });
}

/// `dst -= src`
pub fn minus<T: Float, const D: usize>(
    region: &IndexBox<D>,
    dst: FabMut<'_, T, D>,
    src: FabRef<'_, T, D>,
    src_lo: IntVect<D>,
    ncomp: usize,
) {
    zip_offsets(region, dst.bx, src.bx, src_lo, ncomp, |d, s| {
        dst.data[d] = dst.data[d] - src.data[s]
    });
}

/// `dst *= src`
pub fn mult<T: Float, const D: usize>(
    region: &IndexBox<D>,
    dst: FabMut<'_, T, D>,
    src: FabRef<'_, T, D>,
    src_lo: IntVect<D>,
    ncomp: usize,
) {
    zip_offsets(region, dst.bx, src.bx, src_lo, ncomp, |d, s| {
        dst.data[d] = dst.data[d] * src.data[s]
    });
}

/// `dst /= src`
pub fn divide<T: Float, const D: usize>(
    region: &IndexBox<D>,
    dst: FabMut<'_, T, D>,
    src: FabRef<'_, T, D>,
    src_lo: IntVect<D>,
    ncomp: usize,
) {
    zip_offsets(region, dst.bx, src.bx, src_lo, ncomp, |d, s| {
        dst.data[d] = dst.data[d] / src.data[s]
    });
}

/// `dst /= src` where `src != 0`; cells with a zero divisor keep their value.
pub fn protected_divide<T: Float, const D: usize>(
    region: &IndexBox<D>,
    dst: FabMut<'_, T, D>,
    src: FabRef<'_, T, D>,
    src_lo: IntVect<D>,
    ncomp: usize,
) {
    zip_offsets(region, dst.bx, src.bx, src_lo, ncomp, |d, s| {
        if src.data[s] != T::zero() {
            dst.data[d] = dst.data[d] / src.data[s];
        }
    });
}

/// `dst = a / dst`
pub fn invert<T: Float, const D: usize>(region: &IndexBox<D>, dst: FabMut<'_, T, D>, a: T, ncomp: usize) {
    each_offset(region, dst.bx, ncomp, |d| dst.data[d] = a / dst.data[d]);
}

/// `dst += a * src`
pub fn saxpy<T: Float, const D: usize>(
    region: &IndexBox<D>,
    dst: FabMut<'_, T, D>,
    a: T,
    src: FabRef<'_, T, D>,
    src_lo: IntVect<D>,
    ncomp: usize,
) {
    zip_offsets(region, dst.bx, src.bx, src_lo, ncomp, |d, s| {
        dst.data[d] = dst.data[d] + a * src.data[s]
    });
}

/// `dst = src + a * dst`
pub fn xpay<T: Float, const D: usize>(
    region: &IndexBox<D>,
    dst: FabMut<'_, T, D>,
    a: T,
    src: FabRef<'_, T, D>,
    src_lo: IntVect<D>,
    ncomp: usize,
) {
    zip_offsets(region, dst.bx, src.bx, src_lo, ncomp, |d, s| {
        dst.data[d] = src.data[s] + a * dst.data[d]
    });
}

/// `dst = a * x + b * y`
#[allow(clippy::too_many_arguments)]
pub fn lincomb<T: Float, const D: usize>(
    region: &IndexBox<D>,
    dst: FabMut<'_, T, D>,
    a: T,
    x: FabRef<'_, T, D>,
    x_lo: IntVect<D>,
    b: T,
    y: FabRef<'_, T, D>,
    y_lo: IntVect<D>,
    ncomp: usize,
) {
    let x_shift = x_lo - region.lo();
    let y_shift = y_lo - region.lo();
    let (dvol, xvol, yvol) = (dst.bx.volume(), x.bx.volume(), y.bx.volume());
    for c in 0..ncomp {
        for iv in region.cells() {
            let xv = x.data[c * xvol + x.bx.offset(&(iv + x_shift))];
            let yv = y.data[c * yvol + y.bx.offset(&(iv + y_shift))];
            dst.data[c * dvol + dst.bx.offset(&iv)] = a * xv + b * yv;
        }
    }
}

/// `dst += x * y`, with `x` and `y` sharing the destination's region.
pub fn add_product<T: Float, const D: usize>(
    region: &IndexBox<D>,
    dst: FabMut<'_, T, D>,
    x: FabRef<'_, T, D>,
    y: FabRef<'_, T, D>,
    ncomp: usize,
) {
    let (dvol, xvol, yvol) = (dst.bx.volume(), x.bx.volume(), y.bx.volume());
    for c in 0..ncomp {
        for iv in region.cells() {
            let p = x.data[c * xvol + x.bx.offset(&iv)] * y.data[c * yvol + y.bx.offset(&iv)];
            let d = c * dvol + dst.bx.offset(&iv);
            dst.data[d] = dst.data[d] + p;
        }
    }
}

/// `dst = v`
pub fn set_val<T: Float, const D: usize>(region: &IndexBox<D>, dst: FabMut<'_, T, D>, v: T, ncomp: usize) {
    each_offset(region, dst.bx, ncomp, |d| dst.data[d] = v);
}

/// `p = 0`: max-norm; `p >= 1`: sum of `|x|^p`, no root taken.
pub fn norm<T: Float, const D: usize>(region: &IndexBox<D>, src: FabRef<'_, T, D>, p: u32, ncomp: usize) -> T {
    let mut acc = T::zero();
    each_offset(region, src.bx, ncomp, |s| {
        let v = src.data[s].abs();
        acc = if p == 0 {
            acc.max(v)
        } else {
            acc + v.powi(p as i32)
        };
    });
    acc
}

pub fn sum<T: Float, const D: usize>(region: &IndexBox<D>, src: FabRef<'_, T, D>, ncomp: usize) -> T {
    let mut acc = T::zero();
    each_offset(region, src.bx, ncomp, |s| acc = acc + src.data[s]);
    acc
}

/// `sum(x * y)` over the region, `y` addressed from `y_lo`.
pub fn dot<T: Float, const D: usize>(
    region: &IndexBox<D>,
    x: FabRef<'_, T, D>,
    y: FabRef<'_, T, D>,
    y_lo: IntVect<D>,
    ncomp: usize,
) -> T {
    let mut acc = T::zero();
    zip_offsets(region, x.bx, y.bx, y_lo, ncomp, |a, b| acc = acc + x.data[a] * y.data[b]);
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b1(lo: i64, hi: i64) -> IndexBox<1> {
        IndexBox::new([lo], [hi])
    }

    #[test]
    fn copy_with_shifted_source() {
        let dbox = b1(0, 3);
        let sbox = b1(10, 13);
        let mut d = vec![0.0; 4];
        let s = vec![1.0, 2.0, 3.0, 4.0];
        copy(
            &b1(0, 1),
            FabMut { data: &mut d, bx: &dbox },
            FabRef { data: &s, bx: &sbox },
            IntVect([12]),
            1,
        );
        assert_eq!(d, vec![3.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn second_component_uses_volume_stride() {
        let bx = b1(0, 1);
        let mut d = vec![0.0; 4];
        let s = vec![1.0, 2.0, 3.0, 4.0];
        plus(&bx, FabMut { data: &mut d, bx: &bx }, FabRef { data: &s, bx: &bx }, bx.lo(), 2);
        assert_eq!(d, s);
        // only the second component
        plus(
            &bx,
            FabMut { data: &mut d[2..], bx: &bx },
            FabRef { data: &s[2..], bx: &bx },
            bx.lo(),
            1,
        );
        assert_eq!(d, vec![1.0, 2.0, 6.0, 8.0]);
    }

    #[test]
    fn protected_divide_skips_zero() {
        let bx = b1(0, 2);
        let mut d = vec![6.0, 6.0, 6.0];
        let s = vec![2.0, 0.0, 3.0];
        protected_divide(&bx, FabMut { data: &mut d, bx: &bx }, FabRef { data: &s, bx: &bx }, bx.lo(), 1);
        assert_eq!(d, vec![3.0, 6.0, 2.0]);
    }

    #[test]
    fn lincomb_norm_dot_sum() {
        let bx = b1(0, 2);
        let x = vec![1.0, 2.0, 3.0];
        let y = vec![-1.0, 0.5, 2.0];
        let mut d = vec![0.0; 3];
        lincomb(
            &bx,
            FabMut { data: &mut d, bx: &bx },
            2.0,
            FabRef { data: &x, bx: &bx },
            bx.lo(),
            -1.0,
            FabRef { data: &y, bx: &bx },
            bx.lo(),
            1,
        );
        assert_eq!(d, vec![3.0, 3.5, 4.0]);
        let r = FabRef { data: &y, bx: &bx };
        assert_eq!(norm(&bx, r, 0, 1), 2.0);
        assert_eq!(norm(&bx, r, 1, 1), 3.5);
        assert_eq!(sum(&bx, r, 1), 1.5);
        assert_eq!(dot(&bx, FabRef { data: &x, bx: &bx }, r, bx.lo(), 1), 6.0);
    }

    #[test]
    fn invert_saxpy_xpay_add_product() {
        let bx = b1(0, 1);
        let mut d = vec![2.0, 4.0];
        invert(&bx, FabMut { data: &mut d, bx: &bx }, 1.0, 1);
        assert_eq!(d, vec![0.5, 0.25]);
        let s = vec![1.0, 1.0];
        saxpy(&bx, FabMut { data: &mut d, bx: &bx }, 2.0, FabRef { data: &s, bx: &bx }, bx.lo(), 1);
        assert_eq!(d, vec![2.5, 2.25]);
        xpay(&bx, FabMut { data: &mut d, bx: &bx }, 2.0, FabRef { data: &s, bx: &bx }, bx.lo(), 1);
        assert_eq!(d, vec![6.0, 5.5]);
        add_product(
            &bx,
            FabMut { data: &mut d, bx: &bx },
            FabRef { data: &s, bx: &bx },
            FabRef { data: &[3.0, 4.0], bx: &bx },
            1,
        );
        assert_eq!(d, vec![9.0, 9.5]);
    }
}
