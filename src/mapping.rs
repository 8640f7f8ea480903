use crate::foundation::core::Point;
use crate::foundation::math::nearly_zero;
use crate::geometry::matrix::Matrix;
use crate::geometry::space::{DeviceSpace, LayerSpace, Mappable, ParameterSpace};

/// The kind of layer transform a filter can be evaluated under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixCapability {
    /// Only integer translations; everything else is applied after filtering.
    Translate,
    /// Scale and translate, with rotation, skew and perspective applied after filtering.
    ScaleTranslate,
    /// Any transform.
    #[default]
    Complex,
}

/// The transforms between parameter, layer and device space for one filter evaluation.
///
/// `layer_to_device * param_to_layer` reproduces the transform the mapping was derived from,
/// and `device_to_layer` is always the inverse of `layer_to_device`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mapping {
    param_to_layer: Matrix,
    layer_to_dev: Matrix,
    dev_to_layer: Matrix,
}

impl Default for Mapping {
    fn default() -> Self {
        Self::new(Matrix::IDENTITY)
    }
}

impl Mapping {
    /// Mapping whose layer space is device space.
    pub fn new(param_to_layer: Matrix) -> Self {
        Self {
            param_to_layer,
            layer_to_dev: Matrix::IDENTITY,
            dev_to_layer: Matrix::IDENTITY,
        }
    }

    /// `None` when `layer_to_dev` is singular.
    pub fn with_layer_to_device(param_to_layer: Matrix, layer_to_dev: Matrix) -> Option<Self> {
        let dev_to_layer = layer_to_dev.invert()?;
        Some(Self {
            param_to_layer,
            layer_to_dev,
            dev_to_layer,
        })
    }

    /// Split `ctm` into a layer transform the filter can work under and a remainder applied
    /// after filtering.
    ///
    /// With rotation, skew or perspective and a capability short of [`MatrixCapability::Complex`],
    /// the layer transform becomes a scale: the exact axis scales for affine transforms, or a
    /// single area-preserving scale measured at `representative` under perspective. Returns `None`
    /// when the remainder is singular, in which case the filter has no output.
    #[tracing::instrument(level = "trace")]
    pub fn decompose_ctm(
        ctm: &Matrix,
        capability: MatrixCapability,
        representative: ParameterSpace<Point>,
    ) -> Option<Self> {
        let (remainder, layer) = if capability == MatrixCapability::Translate {
            (*ctm, Matrix::IDENTITY)
        } else if ctm.is_scale_translate() || capability == MatrixCapability::Complex {
            (Matrix::IDENTITY, *ctm)
        } else {
            decompose_transform(ctm, representative.into_inner())
        };

        let Some(dev_to_layer) = remainder.invert() else {
            tracing::trace!("layer remainder is singular");
            return None;
        };
        Some(Self {
            param_to_layer: layer,
            layer_to_dev: remainder,
            dev_to_layer,
        })
    }

    /// Post-concatenate `layer` into the layer frame, keeping the total transform unchanged.
    ///
    /// Returns `false` and leaves the mapping untouched when `layer` is singular.
    pub fn adjust_layer_space(&mut self, layer: &Matrix) -> bool {
        let Some(inv) = layer.invert() else {
            return false;
        };
        self.param_to_layer = self.param_to_layer.post_concat(layer);
        self.dev_to_layer = self.dev_to_layer.post_concat(layer);
        self.layer_to_dev = self.layer_to_dev.pre_concat(&inv);
        true
    }

    /// Parameter-to-layer transform.
    pub fn layer_matrix(&self) -> &Matrix {
        &self.param_to_layer
    }

    pub fn layer_to_device_matrix(&self) -> &Matrix {
        &self.layer_to_dev
    }

    pub fn device_to_layer_matrix(&self) -> &Matrix {
        &self.dev_to_layer
    }

    /// Parameter-to-device transform.
    pub fn total_matrix(&self) -> Matrix {
        Matrix::concat(&self.layer_to_dev, &self.param_to_layer)
    }

    pub fn param_to_layer<T: Mappable>(&self, geom: &ParameterSpace<T>) -> LayerSpace<T> {
        LayerSpace::new(geom.get().map_by(&self.param_to_layer))
    }

    pub fn layer_to_device<T: Mappable>(&self, geom: &LayerSpace<T>) -> DeviceSpace<T> {
        DeviceSpace::new(geom.get().map_by(&self.layer_to_dev))
    }

    pub fn device_to_layer<T: Mappable>(&self, geom: &DeviceSpace<T>) -> LayerSpace<T> {
        LayerSpace::new(geom.get().map_by(&self.dev_to_layer))
    }
}

/// Split `transform` into `(remaining, scaling)` with `transform == remaining * scaling` and
/// `scaling` a pure scale.
pub(crate) fn decompose_transform(transform: &Matrix, representative: Point) -> (Matrix, Matrix) {
    if let Some((scale, remaining)) = transform.decompose_scale() {
        return (remaining, Matrix::scale(scale.width, scale.height));
    }
    let area = transform.differential_area_scale(representative);
    // Behind the w = 0 plane nothing is factored out.
    let s = if area.is_finite() && !nearly_zero(area) {
        area.sqrt()
    } else {
        1.0
    };
    (transform.pre_scale(1.0 / s, 1.0 / s), Matrix::scale(s, s))
}

#[cfg(test)]
#[path = "../tests/unit/mapping.rs"]
mod tests;
