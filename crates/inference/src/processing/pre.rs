use super::TransformParams;
use crate::config::DEFAULT_INPUT_SIZE;
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::RgbImage;
use ndarray::{Array, IxDyn};

const LETTERBOX_COLOR: u8 = 114;

pub struct PreProcessor {
    pub input_size: (u32, u32),
    letterboxed_buffer: Vec<u8>,
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            input_size,
            letterboxed_buffer: vec![LETTERBOX_COLOR; input_size.0 as usize * input_size.1 as usize * 3],
        }
    }

    pub fn square(side: u32) -> Self {
        Self::new((side, side))
    }

    /// Letterbox an RGB image into the model input and scale pixels to `[0, 1]`.
    pub fn preprocess_image(
        &mut self,
        image: &RgbImage,
    ) -> anyhow::Result<(Array<f32, IxDyn>, TransformParams)> {
        self.preprocess_from_u8_slice(image.as_raw(), image.width(), image.height())
    }

    pub fn preprocess_from_u8_slice(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<(Array<f32, IxDyn>, TransformParams)> {
        let _s = span!("preprocess_image");

        tracing::trace!(
            width,
            height,
            pixel_bytes = pixels.len(),
            "Preprocessing image dimensions"
        );

        if width == 0 || height == 0 {
            anyhow::bail!("Image has zero size: {}x{}", width, height);
        }

        let expected_size = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected_size {
            anyhow::bail!(
                "Buffer size mismatch: expected {}, got {} bytes",
                expected_size,
                pixels.len()
            );
        }

        let (scale, offset_x, offset_y) = self.resize_and_letterbox(pixels, width, height)?;
        let input = self.normalize()?;

        let transform = TransformParams {
            orig_width: width,
            orig_height: height,
            input_width: self.input_size.0,
            input_height: self.input_size.1,
            scale,
            offset_x,
            offset_y,
        };

        Ok((input, transform))
    }

    fn resize_and_letterbox(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<(f32, f32, f32)> {
        let _s = span!("resize_and_letterbox");

        let scale =
            (self.input_size.0 as f32 / width as f32).min(self.input_size.1 as f32 / height as f32);
        let new_width = ((width as f32 * scale) as u32).clamp(1, self.input_size.0);
        let new_height = ((height as f32 * scale) as u32).clamp(1, self.input_size.1);

        let offset_x = (self.input_size.0 - new_width) / 2;
        let offset_y = (self.input_size.1 - new_height) / 2;

        let src = ImageRef::new(width, height, pixels, PixelType::U8x3)?;

        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        self.letterboxed_buffer.fill(LETTERBOX_COLOR);

        let resized_data = resized.buffer();
        let stride = self.input_size.0 * 3;
        let row_bytes = (new_width * 3) as usize;

        for y in 0..new_height {
            let src_row = (y * new_width * 3) as usize;
            let dst_row = ((y + offset_y) * stride + offset_x * 3) as usize;

            self.letterboxed_buffer[dst_row..dst_row + row_bytes]
                .copy_from_slice(&resized_data[src_row..src_row + row_bytes]);
        }

        Ok((scale, offset_x as f32, offset_y as f32))
    }

    fn normalize(&self) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("normalize");

        let width = self.input_size.0 as usize;
        let height = self.input_size.1 as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in self.letterboxed_buffer.chunks_exact(3).enumerate() {
            output[i] = px[0] as f32 / 255.0;
            output[i + spatial] = px[1] as f32 / 255.0;
            output[i + 2 * spatial] = px[2] as f32 / 255.0;
        }

        Ok(Array::from_shape_vec(
            IxDyn(&[1, 3, height, width]),
            output,
        )?)
    }
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::square(DEFAULT_INPUT_SIZE)
    }
}
