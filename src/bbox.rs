use nalgebra as na;
use serde::{Deserialize, Serialize};
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-width-height format, what the detector hands to the tracker
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// Left-top-right-bottom format, what the tracker reports per confirmed track
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct BBox<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq>(
    [f32; 4],
    #[serde(skip)] PhantomData<F>,
);

impl<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], Default::default())
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], Default::default())
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    /// Integer pixel center. Corners are truncated first, then the midpoint
    /// is truncated toward zero.
    pub fn center(&self) -> na::Point2<i32> {
        let (l, t) = (self.left() as i32, self.top() as i32);
        let (r, b) = (self.right() as i32, self.bottom() as i32);

        na::Point2::new((l + r) / 2, (t + b) / 2)
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] + v.0[0], v.0[3] + v.0[1]],
            Default::default(),
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] - v.0[0], v.0[3] - v.0[1]],
            Default::default(),
        )
    }
}
