pub mod post;
pub mod pre;

/// Maps model-input coordinates back to the original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub input_width: u32,
    pub input_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}
