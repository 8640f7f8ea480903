pub mod irect;
pub mod matrix;
pub mod quad;
pub mod rect;
pub mod space;
