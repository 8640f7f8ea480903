use crate::backend::{Device, SurfaceProps};
use crate::context::Context;
use crate::filter_result::FilterResult;
use crate::foundation::core::Color4f;
use crate::geometry::irect::IRect;
use crate::geometry::matrix::Matrix;
use crate::geometry::space::LayerSpace;

/// Render target covering a layer-space rectangle, snapped once into a [`FilterResult`].
///
/// When allocation fails the surface is inert: [`AutoSurface::device`] is `None` and
/// [`AutoSurface::snap`] returns the transparent result. Dropping it without snapping releases
/// the device.
pub(crate) struct AutoSurface {
    device: Option<Box<dyn Device>>,
    dst_bounds: LayerSpace<IRect>,
}

impl AutoSurface {
    /// Allocate a device for `dst_bounds`, cleared, clipped to `dst_bounds`, and with layer space
    /// as its local space. With `render_in_parameter_space` the layer matrix is applied too, so
    /// draws are expressed in parameter space.
    ///
    /// `dst_bounds` is not intersected with the desired output.
    pub(crate) fn new(
        ctx: &Context,
        dst_bounds: LayerSpace<IRect>,
        render_in_parameter_space: bool,
        props: Option<&SurfaceProps>,
    ) -> Self {
        ctx.mark_new_surface();
        let device = if dst_bounds.is_empty() {
            None
        } else {
            ctx.backend()
                .make_device(dst_bounds.size().into_inner(), ctx.color_space(), props)
        };
        let device = device.map(|mut device| {
            device.set_local_to_device(Matrix::translate(
                -f64::from(dst_bounds.left()),
                -f64::from(dst_bounds.top()),
            ));
            device.clear(Color4f::TRANSPARENT);
            // The backend may hand out a larger device than asked for.
            device.clip_rect(dst_bounds.get().to_rect(), false);
            if render_in_parameter_space {
                device.concat(ctx.mapping().layer_matrix());
            }
            device
        });
        if device.is_none() {
            tracing::trace!(bounds = ?dst_bounds, "no surface");
        }
        Self { device, dst_bounds }
    }

    pub(crate) fn device(&mut self) -> Option<&mut dyn Device> {
        match &mut self.device {
            Some(device) => Some(device.as_mut()),
            None => None,
        }
    }

    /// Freeze the pixels and wrap them as a result positioned at the bounds' top-left.
    pub(crate) fn snap(self) -> FilterResult {
        let Some(mut device) = self.device else {
            return FilterResult::default();
        };
        device.reset_clip_stack();
        device.set_immutable();
        let subset = IRect::from_size(self.dst_bounds.size().into_inner());
        match device.snap_special(subset) {
            Some(image) => FilterResult::new(image, self.dst_bounds.top_left()),
            None => FilterResult::default(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter_result/surface.rs"]
mod tests;
