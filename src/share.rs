use url::Url;

use crate::foundation::error::{LayercastError, LayercastResult};

pub const MINT_BASE: &str = "https://zora.co/create/edition";
pub const POST_BASE: &str = "https://warpcast.com/~/compose";
pub const POST_TEXT: &str = "↑ higher";

/// Outbound links embedding an uploaded image URL.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ShareLinks {
    pub image: Url,
    pub mint: Url,
    pub post: Url,
}

impl ShareLinks {
    pub fn for_image(image: &Url) -> LayercastResult<Self> {
        Ok(Self {
            image: image.clone(),
            mint: mint_link(image)?,
            post: post_link(image)?,
        })
    }
}

pub fn mint_link(image: &Url) -> LayercastResult<Url> {
    Url::parse_with_params(MINT_BASE, [("image", image.as_str())])
        .map_err(|e| LayercastError::validation(format!("build mint link: {e}")))
}

pub fn post_link(image: &Url) -> LayercastResult<Url> {
    Url::parse_with_params(POST_BASE, [("text", POST_TEXT), ("embeds[]", image.as_str())])
        .map_err(|e| LayercastError::validation(format!("build post link: {e}")))
}
