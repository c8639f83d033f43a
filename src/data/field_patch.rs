//! FieldPatch: a dense multi-component array over one box.
//!
//! Storage is component-major (all cells of component 0, then component 1, ...)
//! with axis 0 fastest inside a component. A patch is owned by exactly one
//! process and is never resized once built: its box is tied to an entry of the
//! shared geometry.
//!
//! Every sub-box argument must lie inside the patch's box (`OutOfBounds`) and
//! every component range inside `[0, ncomp)` (`ComponentRange`).

use crate::data::kernels::{self, FabMut, FabRef};
use crate::geometry::index_box::IndexBox;
use crate::geometry::int_vect::IntVect;
use crate::overlap::delta::{LinCombDelta, ValueDelta};
use crate::patch_error::PatchSieveError;
use crate::Real;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch<const D: usize> {
    bx: IndexBox<D>,
    ncomp: usize,
    data: Vec<Real>,
}

impl<const D: usize> FieldPatch<D> {
    /// Zero-filled patch over `bx` with `ncomp` components.
    pub fn new(bx: IndexBox<D>, ncomp: usize) -> Self {
        Self {
            bx,
            ncomp,
            data: vec![0.0; bx.volume() * ncomp],
        }
    }

    /// Wrap existing component-major data.
    pub fn from_data(bx: IndexBox<D>, ncomp: usize, data: Vec<Real>) -> Result<Self, PatchSieveError> {
        if data.len() != bx.volume() * ncomp {
            return Err(PatchSieveError::Configuration(format!(
                "patch {bx} with {ncomp} components needs {} values, got {}",
                bx.volume() * ncomp,
                data.len()
            )));
        }
        Ok(Self { bx, ncomp, data })
    }

    #[inline]
    pub fn bx(&self) -> &IndexBox<D> {
        &self.bx
    }

    #[inline]
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Raw component-major values.
    pub fn data(&self) -> &[Real] {
        &self.data
    }

    pub fn check_region(&self, region: &IndexBox<D>) -> Result<(), PatchSieveError> {
        if self.bx.contains_box(region) {
            Ok(())
        } else {
            Err(PatchSieveError::OutOfBounds {
                region: region.to_string(),
                patch: self.bx.to_string(),
            })
        }
    }

    pub fn check_comps(&self, comp: usize, n: usize) -> Result<(), PatchSieveError> {
        match comp.checked_add(n) {
            Some(end) if end <= self.ncomp => Ok(()),
            _ => Err(PatchSieveError::ComponentRange {
                comp,
                ncomp: n,
                available: self.ncomp,
            }),
        }
    }

    #[inline]
    fn comp_start(&self, comp: usize) -> usize {
        comp * self.bx.volume()
    }

    fn view(&self, comp: usize) -> FabRef<'_, Real, D> {
        FabRef {
            data: &self.data[self.comp_start(comp)..],
            bx: &self.bx,
        }
    }

    fn view_mut(&mut self, comp: usize) -> FabMut<'_, Real, D> {
        let start = self.comp_start(comp);
        FabMut {
            data: &mut self.data[start..],
            bx: &self.bx,
        }
    }

    /// Value of component `comp` at cell `iv`.
    pub fn get(&self, iv: &IntVect<D>, comp: usize) -> Result<Real, PatchSieveError> {
        self.check_comps(comp, 1)?;
        self.check_region(&IndexBox::new(*iv, *iv))?;
        Ok(self.data[self.comp_start(comp) + self.bx.offset(iv)])
    }

    pub fn set(&mut self, iv: &IntVect<D>, comp: usize, v: Real) -> Result<(), PatchSieveError> {
        self.check_comps(comp, 1)?;
        self.check_region(&IndexBox::new(*iv, *iv))?;
        let k = self.comp_start(comp) + self.bx.offset(iv);
        self.data[k] = v;
        Ok(())
    }

    /// Fill components `[comp, comp+n)` of the whole patch.
    pub fn fill(&mut self, v: Real, comp: usize, n: usize) -> Result<(), PatchSieveError> {
        let region = self.bx;
        self.fill_region(&region, v, comp, n)
    }

    pub fn fill_region(&mut self, region: &IndexBox<D>, v: Real, comp: usize, n: usize) -> Result<(), PatchSieveError> {
        self.check_region(region)?;
        self.check_comps(comp, n)?;
        kernels::set_val(region, self.view_mut(comp), v, n);
        Ok(())
    }

    fn check_pair(
        &self,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.check_region(dst_region)?;
        src.check_region(src_region)?;
        self.check_comps(dcomp, n)?;
        src.check_comps(scomp, n)?;
        if dst_region.volume() != src_region.volume()
            || (0..D).any(|d| dst_region.length(d) != src_region.length(d))
        {
            return Err(PatchSieveError::Configuration(format!(
                "region shapes differ: {dst_region} vs {src_region}"
            )));
        }
        Ok(())
    }

    /// Overwrite `dst_region` of components `[dcomp, dcomp+n)` from `src`.
    pub fn overwrite(
        &mut self,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.check_pair(dst_region, dcomp, src, src_region, scomp, n)?;
        kernels::copy(dst_region, self.view_mut(dcomp), src.view(scomp), src_region.lo(), n);
        Ok(())
    }

    /// Elementwise add of `src` into `dst_region`.
    pub fn accumulate(
        &mut self,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.check_pair(dst_region, dcomp, src, src_region, scomp, n)?;
        kernels::plus(dst_region, self.view_mut(dcomp), src.view(scomp), src_region.lo(), n);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn binary(
        &mut self,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
        kernel: fn(&IndexBox<D>, FabMut<'_, Real, D>, FabRef<'_, Real, D>, IntVect<D>, usize),
    ) -> Result<(), PatchSieveError> {
        self.check_pair(dst_region, dcomp, src, src_region, scomp, n)?;
        kernel(dst_region, self.view_mut(dcomp), src.view(scomp), src_region.lo(), n);
        Ok(())
    }

    /// Elementwise subtract of `src` from `dst_region`.
    pub fn subtract(
        &mut self,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.binary(dst_region, dcomp, src, src_region, scomp, n, kernels::minus)
    }

    /// Elementwise product with `src`.
    pub fn mult(
        &mut self,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.binary(dst_region, dcomp, src, src_region, scomp, n, kernels::mult)
    }

    /// Elementwise quotient by `src`.
    pub fn divide(
        &mut self,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.binary(dst_region, dcomp, src, src_region, scomp, n, kernels::divide)
    }

    /// Like [`divide`](Self::divide), but cells with a zero divisor keep their value.
    pub fn protected_divide(
        &mut self,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.binary(dst_region, dcomp, src, src_region, scomp, n, kernels::protected_divide)
    }

    /// `dst = a / dst` over the region.
    pub fn invert(&mut self, a: Real, region: &IndexBox<D>, comp: usize, n: usize) -> Result<(), PatchSieveError> {
        self.check_region(region)?;
        self.check_comps(comp, n)?;
        kernels::invert(region, self.view_mut(comp), a, n);
        Ok(())
    }

    /// `dst += a * src`
    #[allow(clippy::too_many_arguments)]
    pub fn saxpy(
        &mut self,
        a: Real,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.check_pair(dst_region, dcomp, src, src_region, scomp, n)?;
        kernels::saxpy(dst_region, self.view_mut(dcomp), a, src.view(scomp), src_region.lo(), n);
        Ok(())
    }

    /// `dst = src + a * dst`
    #[allow(clippy::too_many_arguments)]
    pub fn xpay(
        &mut self,
        a: Real,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.check_pair(dst_region, dcomp, src, src_region, scomp, n)?;
        kernels::xpay(dst_region, self.view_mut(dcomp), a, src.view(scomp), src_region.lo(), n);
        Ok(())
    }

    /// `dst += x * y`, all three over the same region.
    #[allow(clippy::too_many_arguments)]
    pub fn add_product(
        &mut self,
        region: &IndexBox<D>,
        dcomp: usize,
        x: &Self,
        xcomp: usize,
        y: &Self,
        ycomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.check_pair(region, dcomp, x, region, xcomp, n)?;
        y.check_region(region)?;
        y.check_comps(ycomp, n)?;
        kernels::add_product(region, self.view_mut(dcomp), x.view(xcomp), y.view(ycomp), n);
        Ok(())
    }

    /// `dst = a * dst + b * src` over the region.
    #[allow(clippy::too_many_arguments)]
    pub fn lin_comb(
        &mut self,
        a: Real,
        b: Real,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.apply_from(dst_region, dcomp, src, src_region, scomp, n, &LinCombDelta::new(a, b))
    }

    /// `dst = a * x + b * y` with `x`, `y` over the same region as `dst`.
    #[allow(clippy::too_many_arguments)]
    pub fn lin_comb_from(
        &mut self,
        region: &IndexBox<D>,
        dcomp: usize,
        a: Real,
        x: &Self,
        xcomp: usize,
        b: Real,
        y: &Self,
        ycomp: usize,
        n: usize,
    ) -> Result<(), PatchSieveError> {
        self.check_pair(region, dcomp, x, region, xcomp, n)?;
        y.check_region(region)?;
        y.check_comps(ycomp, n)?;
        kernels::lincomb(
            region,
            self.view_mut(dcomp),
            a,
            x.view(xcomp),
            region.lo(),
            b,
            y.view(ycomp),
            region.lo(),
            n,
        );
        Ok(())
    }

    /// Flatten `region` × `[comp, comp+n)` into a contiguous buffer (component-major).
    pub fn pack(&self, region: &IndexBox<D>, comp: usize, n: usize) -> Result<Vec<Real>, PatchSieveError> {
        self.check_region(region)?;
        self.check_comps(comp, n)?;
        let vol = self.bx.volume();
        let start = self.comp_start(comp);
        let mut out = Vec::with_capacity(region.volume() * n);
        for c in 0..n {
            out.extend(region.cells().map(|iv| self.data[start + c * vol + self.bx.offset(&iv)]));
        }
        Ok(out)
    }

    /// Fuse a buffer produced by [`pack`](Self::pack) into `region` × `[comp, comp+n)`.
    pub fn unpack_with<F: ValueDelta + ?Sized>(
        &mut self,
        region: &IndexBox<D>,
        comp: usize,
        n: usize,
        buf: &[Real],
        delta: &F,
    ) -> Result<(), PatchSieveError> {
        self.check_region(region)?;
        self.check_comps(comp, n)?;
        if buf.len() != region.volume() * n {
            return Err(PatchSieveError::Configuration(format!(
                "buffer holds {} values, region {region} × {n} needs {}",
                buf.len(),
                region.volume() * n
            )));
        }
        let vol = self.bx.volume();
        let start = self.comp_start(comp);
        let mut it = buf.iter();
        for c in 0..n {
            for iv in region.cells() {
                if let Some(&v) = it.next() {
                    let k = start + c * vol + self.bx.offset(&iv);
                    delta.fuse(&mut self.data[k], v);
                }
            }
        }
        Ok(())
    }

    /// Fuse `src_region` of `src` into `dst_region` of `self` with `delta`.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_from<F: ValueDelta + ?Sized>(
        &mut self,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &Self,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
        delta: &F,
    ) -> Result<(), PatchSieveError> {
        self.check_pair(dst_region, dcomp, src, src_region, scomp, n)?;
        let shift = src_region.lo() - dst_region.lo();
        let (dvol, svol) = (self.bx.volume(), src.bx.volume());
        let (dstart, sstart) = (self.comp_start(dcomp), src.comp_start(scomp));
        for c in 0..n {
            for iv in dst_region.cells() {
                let s = src.data[sstart + c * svol + src.bx.offset(&(iv + shift))];
                let k = dstart + c * dvol + self.bx.offset(&iv);
                delta.fuse(&mut self.data[k], s);
            }
        }
        Ok(())
    }

    /// Norm of components `[comp, comp+n)` over `region`; see [`kernels::norm`].
    pub fn norm(&self, region: &IndexBox<D>, p: u32, comp: usize, n: usize) -> Result<Real, PatchSieveError> {
        self.check_region(region)?;
        self.check_comps(comp, n)?;
        Ok(kernels::norm(region, self.view(comp), p, n))
    }

    pub fn sum(&self, region: &IndexBox<D>, comp: usize, n: usize) -> Result<Real, PatchSieveError> {
        self.check_region(region)?;
        self.check_comps(comp, n)?;
        Ok(kernels::sum(region, self.view(comp), n))
    }

    /// `sum(self * other)` over `region` of `self` and `other_region` of `other`.
    pub fn dot(
        &self,
        region: &IndexBox<D>,
        comp: usize,
        other: &Self,
        other_region: &IndexBox<D>,
        ocomp: usize,
        n: usize,
    ) -> Result<Real, PatchSieveError> {
        self.check_pair(region, comp, other, other_region, ocomp, n)?;
        Ok(kernels::dot(region, self.view(comp), other.view(ocomp), other_region.lo(), n))
    }
}

/// Mutable access to a patch held by a collection.
///
/// Values may change through it; the box and component count may not. Reads go
/// through `Deref` to the underlying [`FieldPatch`].
///
/// ```compile_fail
/// use patch_sieve::prelude::*;
///
/// let mut pc = PatchCollection::<1>::new(
///     BoxArray::from(vec![IndexBox::new([0], [3])]),
///     DistributionMap::new(vec![0]),
///     1,
///     0,
///     0,
/// )
/// .unwrap();
/// *pc.patch_mut(0).unwrap() = FieldPatch::new(IndexBox::new([0], [1]), 7);
/// ```
#[derive(Debug)]
pub struct PatchMut<'a, const D: usize> {
    inner: &'a mut FieldPatch<D>,
}

macro_rules! forward_mut {
    ($($(#[$attr:meta])* fn $name:ident(&mut self $(, $arg:ident: $ty:ty)*) -> $ret:ty;)*) => {
        $(
            $(#[$attr])*
            #[inline]
            pub fn $name(&mut self $(, $arg: $ty)*) -> $ret {
                self.inner.$name($($arg),*)
            }
        )*
    };
}

impl<'a, const D: usize> PatchMut<'a, D> {
    pub(crate) fn new(inner: &'a mut FieldPatch<D>) -> Self {
        Self { inner }
    }

    forward_mut! {
        fn set(&mut self, iv: &IntVect<D>, comp: usize, v: Real) -> Result<(), PatchSieveError>;
        fn fill(&mut self, v: Real, comp: usize, n: usize) -> Result<(), PatchSieveError>;
        fn fill_region(&mut self, region: &IndexBox<D>, v: Real, comp: usize, n: usize) -> Result<(), PatchSieveError>;
        fn overwrite(&mut self, dst_region: &IndexBox<D>, dcomp: usize, src: &FieldPatch<D>, src_region: &IndexBox<D>, scomp: usize, n: usize) -> Result<(), PatchSieveError>;
        fn accumulate(&mut self, dst_region: &IndexBox<D>, dcomp: usize, src: &FieldPatch<D>, src_region: &IndexBox<D>, scomp: usize, n: usize) -> Result<(), PatchSieveError>;
        fn subtract(&mut self, dst_region: &IndexBox<D>, dcomp: usize, src: &FieldPatch<D>, src_region: &IndexBox<D>, scomp: usize, n: usize) -> Result<(), PatchSieveError>;
        fn mult(&mut self, dst_region: &IndexBox<D>, dcomp: usize, src: &FieldPatch<D>, src_region: &IndexBox<D>, scomp: usize, n: usize) -> Result<(), PatchSieveError>;
        fn divide(&mut self, dst_region: &IndexBox<D>, dcomp: usize, src: &FieldPatch<D>, src_region: &IndexBox<D>, scomp: usize, n: usize) -> Result<(), PatchSieveError>;
        fn protected_divide(&mut self, dst_region: &IndexBox<D>, dcomp: usize, src: &FieldPatch<D>, src_region: &IndexBox<D>, scomp: usize, n: usize) -> Result<(), PatchSieveError>;
        fn invert(&mut self, a: Real, region: &IndexBox<D>, comp: usize, n: usize) -> Result<(), PatchSieveError>;
        #[allow(clippy::too_many_arguments)]
        fn saxpy(&mut self, a: Real, dst_region: &IndexBox<D>, dcomp: usize, src: &FieldPatch<D>, src_region: &IndexBox<D>, scomp: usize, n: usize) -> Result<(), PatchSieveError>;
        #[allow(clippy::too_many_arguments)]
        fn xpay(&mut self, a: Real, dst_region: &IndexBox<D>, dcomp: usize, src: &FieldPatch<D>, src_region: &IndexBox<D>, scomp: usize, n: usize) -> Result<(), PatchSieveError>;
        #[allow(clippy::too_many_arguments)]
        fn add_product(&mut self, region: &IndexBox<D>, dcomp: usize, x: &FieldPatch<D>, xcomp: usize, y: &FieldPatch<D>, ycomp: usize, n: usize) -> Result<(), PatchSieveError>;
        #[allow(clippy::too_many_arguments)]
        fn lin_comb(&mut self, a: Real, b: Real, dst_region: &IndexBox<D>, dcomp: usize, src: &FieldPatch<D>, src_region: &IndexBox<D>, scomp: usize, n: usize) -> Result<(), PatchSieveError>;
        #[allow(clippy::too_many_arguments)]
        fn lin_comb_from(&mut self, region: &IndexBox<D>, dcomp: usize, a: Real, x: &FieldPatch<D>, xcomp: usize, b: Real, y: &FieldPatch<D>, ycomp: usize, n: usize) -> Result<(), PatchSieveError>;
    }

    pub fn unpack_with<F: ValueDelta + ?Sized>(
        &mut self,
        region: &IndexBox<D>,
        comp: usize,
        n: usize,
        buf: &[Real],
        delta: &F,
    ) -> Result<(), PatchSieveError> {
        self.inner.unpack_with(region, comp, n, buf, delta)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn apply_from<F: ValueDelta + ?Sized>(
        &mut self,
        dst_region: &IndexBox<D>,
        dcomp: usize,
        src: &FieldPatch<D>,
        src_region: &IndexBox<D>,
        scomp: usize,
        n: usize,
        delta: &F,
    ) -> Result<(), PatchSieveError> {
        self.inner.apply_from(dst_region, dcomp, src, src_region, scomp, n, delta)
    }
}

impl<const D: usize> Deref for PatchMut<'_, D> {
    type Target = FieldPatch<D>;

    fn deref(&self) -> &FieldPatch<D> {
        &*self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::delta::{AddDelta, CopyDelta};

    fn patch(lo: i64, hi: i64, ncomp: usize) -> FieldPatch<1> {
        FieldPatch::new(IndexBox::new([lo], [hi]), ncomp)
    }

    fn b1(lo: i64, hi: i64) -> IndexBox<1> {
        IndexBox::new([lo], [hi])
    }

    #[test]
    fn out_of_bounds_and_component_range() {
        let mut p = patch(0, 3, 2);
        assert!(matches!(
            p.fill_region(&b1(2, 5), 1.0, 0, 1),
            Err(PatchSieveError::OutOfBounds { .. })
        ));
        assert!(matches!(
            p.fill(1.0, 1, 2),
            Err(PatchSieveError::ComponentRange { comp: 1, ncomp: 2, available: 2 })
        ));
    }

    #[test]
    fn overwrite_between_offset_boxes_and_components() {
        let mut src = patch(10, 13, 2);
        for (k, iv) in b1(10, 13).cells().enumerate() {
            src.set(&iv, 1, k as Real).unwrap();
        }
        let mut dst = patch(0, 3, 1);
        dst.overwrite(&b1(0, 1), 0, &src, &b1(12, 13), 1, 1).unwrap();
        assert_eq!(dst.data(), &[2.0, 3.0, 0.0, 0.0]);
        dst.accumulate(&b1(0, 1), 0, &src, &b1(12, 13), 1, 1).unwrap();
        assert_eq!(dst.data(), &[4.0, 6.0, 0.0, 0.0]);
    }

    #[test]
    fn lin_comb_scales_destination_then_adds() {
        let mut dst = patch(0, 1, 1);
        dst.fill(2.0, 0, 1).unwrap();
        let mut src = patch(0, 1, 1);
        src.fill(5.0, 0, 1).unwrap();
        dst.lin_comb(3.0, 0.5, &b1(0, 0), 0, &src, &b1(0, 0), 0, 1).unwrap();
        assert_eq!(dst.data(), &[8.5, 2.0]);
    }

    #[test]
    fn pack_unpack_through_deltas() {
        let mut src = patch(0, 2, 2);
        src.fill(1.0, 0, 1).unwrap();
        src.fill(7.0, 1, 1).unwrap();
        let buf = src.pack(&b1(1, 2), 1, 1).unwrap();
        assert_eq!(buf, vec![7.0, 7.0]);
        let mut dst = patch(5, 6, 1);
        dst.unpack_with(&b1(5, 6), 0, 1, &buf, &CopyDelta).unwrap();
        dst.unpack_with(&b1(5, 6), 0, 1, &buf, &AddDelta).unwrap();
        assert_eq!(dst.data(), &[14.0, 14.0]);
        assert!(dst.unpack_with(&b1(5, 5), 0, 1, &buf, &CopyDelta).is_err());
    }

    #[test]
    fn lin_comb_from_two_sources() {
        let mut x = patch(0, 1, 1);
        x.fill(1.0, 0, 1).unwrap();
        let mut y = patch(0, 1, 1);
        y.fill(10.0, 0, 1).unwrap();
        let mut d = patch(0, 1, 2);
        d.lin_comb_from(&b1(0, 1), 1, 2.0, &x, 0, 0.5, &y, 0, 1).unwrap();
        assert_eq!(d.data(), &[0.0, 0.0, 7.0, 7.0]);
        assert_eq!(d.sum(&b1(0, 1), 0, 2).unwrap(), 14.0);
        assert_eq!(d.norm(&b1(0, 1), 0, 1, 1).unwrap(), 7.0);
    }

    #[test]
    fn arithmetic_between_offset_patches() {
        let mut src = patch(10, 12, 1);
        for (k, iv) in b1(10, 12).cells().enumerate() {
            src.set(&iv, 0, [2.0, 0.0, 4.0][k]).unwrap();
        }
        let mut d = patch(0, 2, 1);
        d.fill(8.0, 0, 1).unwrap();
        d.subtract(&b1(0, 2), 0, &src, &b1(10, 12), 0, 1).unwrap();
        assert_eq!(d.data(), &[6.0, 8.0, 4.0]);
        d.mult(&b1(0, 0), 0, &src, &b1(10, 10), 0, 1).unwrap();
        assert_eq!(d.data(), &[12.0, 8.0, 4.0]);
        d.protected_divide(&b1(0, 2), 0, &src, &b1(10, 12), 0, 1).unwrap();
        assert_eq!(d.data(), &[6.0, 8.0, 1.0]);
        d.divide(&b1(2, 2), 0, &src, &b1(12, 12), 0, 1).unwrap();
        assert_eq!(d.data(), &[6.0, 8.0, 0.25]);
        d.invert(1.0, &b1(2, 2), 0, 1).unwrap();
        assert_eq!(d.data(), &[6.0, 8.0, 4.0]);
        assert_eq!(d.dot(&b1(0, 2), 0, &src, &b1(10, 12), 0, 1).unwrap(), 28.0);
    }

    #[test]
    fn axpy_family_and_product() {
        let mut s = patch(0, 1, 2);
        s.fill(1.0, 0, 1).unwrap();
        s.fill(3.0, 1, 1).unwrap();
        let mut d = patch(0, 1, 1);
        d.fill(2.0, 0, 1).unwrap();
        d.saxpy(0.5, &b1(0, 1), 0, &s, &b1(0, 1), 1, 1).unwrap();
        assert_eq!(d.data(), &[3.5, 3.5]);
        d.xpay(2.0, &b1(0, 0), 0, &s, &b1(0, 0), 0, 1).unwrap();
        assert_eq!(d.data(), &[8.0, 3.5]);
        d.add_product(&b1(1, 1), 0, &s, 0, &s, 1, 1).unwrap();
        assert_eq!(d.data(), &[8.0, 6.5]);
    }

    #[test]
    fn arithmetic_is_bounds_and_component_checked() {
        let s = patch(0, 3, 1);
        let mut d = patch(0, 3, 2);
        assert!(matches!(
            d.subtract(&b1(0, 3), 0, &s, &b1(1, 4), 0, 1),
            Err(PatchSieveError::OutOfBounds { .. })
        ));
        assert!(matches!(
            d.saxpy(1.0, &b1(0, 3), 1, &s, &b1(0, 3), 1, 1),
            Err(PatchSieveError::ComponentRange { comp: 1, ncomp: 1, available: 1 })
        ));
        assert!(matches!(
            d.invert(1.0, &b1(0, 3), 1, 2),
            Err(PatchSieveError::ComponentRange { .. })
        ));
        assert!(matches!(
            s.dot(&b1(0, 1), 0, &d, &b1(0, 2), 0, 1),
            Err(PatchSieveError::Configuration(_))
        ));
    }

    #[test]
    fn patch_mut_changes_values_only() {
        let mut p = patch(0, 3, 2);
        let mut view = PatchMut::new(&mut p);
        view.fill(1.0, 0, 2).unwrap();
        view.set(&IntVect([2]), 1, 5.0).unwrap();
        assert_eq!(view.bx(), &b1(0, 3));
        assert_eq!(view.ncomp(), 2);
        assert_eq!(p.get(&IntVect([2]), 1).unwrap(), 5.0);
        assert_eq!(p.sum(&b1(0, 3), 0, 2).unwrap(), 12.0);
    }
}
