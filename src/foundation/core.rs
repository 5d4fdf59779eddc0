use crate::foundation::error::{LayercastError, LayercastResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Largest edge the CPU rasterizer can allocate a surface for.
pub const MAX_SURFACE_DIM: u32 = u16::MAX as u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
        }
    }
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> LayercastResult<Self> {
        let canvas = Self { width, height };
        canvas.surface_dims()?;
        Ok(canvas)
    }

    pub fn square(edge: u32) -> LayercastResult<Self> {
        Self::new(edge, edge)
    }

    pub fn size(self) -> kurbo::Size {
        kurbo::Size::new(f64::from(self.width), f64::from(self.height))
    }

    pub fn rect(self) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.size())
    }

    pub fn center(self) -> Point {
        self.rect().center()
    }

    /// Surface dimensions as the rasterizer expects them, or why they can't be had.
    pub fn surface_dims(self) -> LayercastResult<(u16, u16)> {
        if self.width == 0 || self.height == 0 {
            return Err(LayercastError::context_unavailable(format!(
                "canvas {}x{} has a zero dimension",
                self.width, self.height
            )));
        }
        let w: u16 = self.width.try_into().map_err(|_| {
            LayercastError::context_unavailable(format!(
                "canvas width {} exceeds {MAX_SURFACE_DIM}",
                self.width
            ))
        })?;
        let h: u16 = self.height.try_into().map_err(|_| {
            LayercastError::context_unavailable(format!(
                "canvas height {} exceeds {MAX_SURFACE_DIM}",
                self.height
            ))
        })?;
        Ok((w, h))
    }
}

impl std::fmt::Display for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Premultiply straight RGBA8 in place.
pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Inverse of [`premultiply_rgba8_in_place`], used before PNG encoding.
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}
