use crate::{
    composition::model::Placement,
    foundation::core::{Affine, Canvas, Rect, Vec2},
};

/// Uniform scale and offset that make an image cover the whole canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverFit {
    pub scale: f64,
    pub offset: Vec2,
}

impl CoverFit {
    /// Canvas-space rectangle the scaled image occupies (may extend past the canvas).
    pub fn dest_rect(self, image: kurbo::Size) -> Rect {
        Rect::from_origin_size(
            self.offset.to_point(),
            kurbo::Size::new(image.width * self.scale, image.height * self.scale),
        )
    }
}

/// Scale-to-cover: `max(cw / iw, ch / ih)`, centered on both axes.
pub fn cover_fit(image: kurbo::Size, canvas: Canvas) -> CoverFit {
    let c = canvas.size();
    let scale = (c.width / image.width).max(c.height / image.height);
    let offset = Vec2::new(
        (c.width - image.width * scale) / 2.0,
        (c.height - image.height * scale) / 2.0,
    );
    CoverFit { scale, offset }
}

/// Canvas-space rectangle for an overlay drawn with `placement`.
pub fn overlay_rect(placement: Placement, canvas: Canvas) -> Rect {
    match placement {
        Placement::FullCover => canvas.rect(),
        Placement::Centered { width, height } => {
            let c = canvas.size();
            Rect::from_origin_size(
                ((c.width - width) / 2.0, (c.height - height) / 2.0),
                (width, height),
            )
        }
    }
}

/// Maps image pixel space onto `dest`, stretching non-uniformly if needed.
pub fn image_to_rect(image: kurbo::Size, dest: Rect) -> Affine {
    Affine::translate(dest.origin().to_vec2())
        * Affine::scale_non_uniform(dest.width() / image.width, dest.height() / image.height)
}
