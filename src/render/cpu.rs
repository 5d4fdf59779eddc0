use std::sync::Arc;

use crate::{
    assets::decode::PreparedImage,
    foundation::core::{Affine, Canvas, Rect, unpremultiply_rgba8_in_place},
    foundation::error::{LayercastError, LayercastResult},
    render::layout,
};

/// Canvas-sized drawing surface for a single composition.
///
/// Draws are recorded into one vello_cpu context and rasterized once by [`Surface::finish`].
/// Every draw takes its opacity as an argument and scopes it to its own layer, so nothing carries
/// over between draws.
pub struct Surface {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
}

impl Surface {
    pub fn new(canvas: Canvas) -> LayercastResult<Self> {
        let (width, height) = canvas.surface_dims()?;
        Ok(Self {
            width,
            height,
            ctx: vello_cpu::RenderContext::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Paint the whole canvas with a straight (non-premultiplied) color.
    pub fn clear(&mut self, [r, g, b, a]: [u8; 4]) {
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));
    }

    /// Draw `image` stretched into `dest` (canvas space) at `opacity`.
    pub fn draw_image(
        &mut self,
        image: &PreparedImage,
        dest: Rect,
        opacity: f32,
    ) -> LayercastResult<()> {
        if opacity <= 0.0 || dest.intersect(self.canvas().rect()).area() <= 0.0 {
            return Ok(());
        }

        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(image_premul_bytes_to_pixmap(
                image.rgba8_premul.as_slice(),
                image.width,
                image.height,
            )?)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };

        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(layout::image_to_rect(
            image.size(),
            dest,
        )));
        self.ctx.set_paint(paint);

        let layered = opacity < 1.0;
        if layered {
            self.ctx.push_opacity_layer(opacity);
        }
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(image.width),
            f64::from(image.height),
        ));
        if layered {
            self.ctx.pop_layer();
        }
        Ok(())
    }

    /// Rasterize everything drawn so far.
    pub fn finish(mut self) -> Frame {
        self.ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.render_to_pixmap(&mut pixmap);
        Frame { pixmap }
    }
}

/// Rasterized surface contents, premultiplied RGBA8.
pub struct Frame {
    pixmap: vello_cpu::Pixmap,
}

impl Frame {
    pub fn width(&self) -> u32 {
        u32::from(self.pixmap.width())
    }

    pub fn height(&self) -> u32 {
        u32::from(self.pixmap.height())
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let i = (y as usize * self.width() as usize + x as usize) * 4;
        self.as_premul_bytes()
            .get(i..i + 4)
            .and_then(|px| px.try_into().ok())
    }

    pub fn as_premul_bytes(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    /// Straight-alpha RGBA8 image, ready for encoding.
    pub fn into_rgba_image(self) -> LayercastResult<image::RgbaImage> {
        let (w, h) = (self.width(), self.height());
        let mut data = self.pixmap.data_as_u8_slice().to_vec();
        unpremultiply_rgba8_in_place(&mut data);
        image::RgbaImage::from_raw(w, h, data)
            .ok_or_else(|| LayercastError::encode("frame byte length does not match its size"))
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> LayercastResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| LayercastError::validation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| LayercastError::validation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(LayercastError::validation(
            "prepared image byte length mismatch",
        ));
    }

    let mut may_have_opacities = false;
    let pixels = rgba8_premul
        .chunks_exact(4)
        .map(|px| {
            may_have_opacities |= px[3] != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
        })
        .collect();

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}
