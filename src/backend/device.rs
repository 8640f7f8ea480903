use crate::backend::image::{ColorSpace, Picture, SpecialImage};
use crate::foundation::core::{Color4f, Rect};
use crate::geometry::irect::{IRect, ISize};
use crate::geometry::matrix::Matrix;
use crate::paint::Paint;
use crate::paint::blend::BlendMode;
use crate::paint::sampling::SamplingOptions;

/// How far image sampling may reach outside the drawn image's subset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SrcRectConstraint {
    /// Filter taps stay inside the subset.
    Strict,
    /// Filter taps may read the backing store just outside the subset.
    Fast,
}

/// A render target with a local-to-device transform and a stack of clip states.
///
/// Geometry passed to draw calls is in local coordinates and is mapped by
/// [`Device::local_to_device`] before rasterization.
pub trait Device {
    fn size(&self) -> ISize;

    fn color_space(&self) -> ColorSpace;

    fn local_to_device(&self) -> Matrix;

    fn set_local_to_device(&mut self, m: Matrix);

    /// Pre-concatenate `m` onto the current transform.
    fn concat(&mut self, m: &Matrix) {
        let next = self.local_to_device().pre_concat(m);
        self.set_local_to_device(next);
    }

    /// Device pixels the current clip can touch.
    fn dev_clip_bounds(&self) -> IRect;

    /// Intersect the clip with `rect` mapped by the current transform.
    fn clip_rect(&mut self, rect: Rect, anti_alias: bool);

    /// Save the clip and transform.
    fn push_clip_stack(&mut self);

    /// Restore the state saved by the matching [`Device::push_clip_stack`].
    fn pop_clip_stack(&mut self);

    /// Drop every saved state and reset to a wide-open clip and identity transform.
    fn reset_clip_stack(&mut self);

    /// Replace every pixel inside the clip with `color`.
    fn clear(&mut self, color: Color4f) {
        let paint = Paint::default()
            .with_color(color)
            .with_blend_mode(BlendMode::Src);
        self.draw_paint(&paint);
    }

    /// Shade every pixel inside the clip.
    fn draw_paint(&mut self, paint: &Paint);

    /// Draw `image`'s subset with `local` mapping its subset-local pixels into local space.
    ///
    /// The paint's shader is ignored; the image is the source color.
    fn draw_special(
        &mut self,
        image: &SpecialImage,
        local: &Matrix,
        sampling: SamplingOptions,
        paint: &Paint,
        constraint: SrcRectConstraint,
    );

    fn draw_picture(&mut self, picture: &Picture);

    /// No draw after this call may change pixels that were already snapped.
    fn set_immutable(&mut self);

    /// Image over `subset` of the device pixels.
    fn snap_special(&mut self, subset: IRect) -> Option<SpecialImage>;
}
