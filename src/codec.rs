//! Transport transcoding for uploaded and fetched images.
//!
//! Only JPEG, PNG and WEBP are accepted on the way in; anything else is
//! rejected here, before a request to the model is ever built.

use base64::Engine;

use crate::capability::ImageFetcher;
use crate::error::{CodecError, FetchError};
use crate::types::{EncodedImage, ImageRef};

/// MIME types accepted from uploads and fetches.
pub const SUPPORTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Whether `mime_type` is on the upload allow-list (parameters are ignored).
pub fn is_supported(mime_type: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&essence(mime_type).as_str())
}

/// Encode raw image bytes for embedding in a JSON request.
pub fn encode(bytes: &[u8], mime_type: &str) -> Result<EncodedImage, CodecError> {
    if !is_supported(mime_type) {
        return Err(CodecError::UnsupportedFormat(mime_type.to_string()));
    }
    Ok(EncodedImage {
        mime_type: essence(mime_type),
        data: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes),
    })
}

/// Recover the raw bytes of an encoded image.
pub fn decode(image: &EncodedImage) -> Result<Vec<u8>, CodecError> {
    base64::engine::general_purpose::STANDARD
        .decode(image.data.trim())
        .map_err(|e| CodecError::InvalidPayload(e.to_string()))
}

/// Split a `data:<mime>;base64,<payload>` URL.
pub fn parse_data_url(url: &str) -> Result<EncodedImage, CodecError> {
    let rest = url.strip_prefix("data:").ok_or(CodecError::InvalidDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(CodecError::InvalidDataUrl)?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or(CodecError::InvalidDataUrl)?;
    if mime_type.is_empty() || payload.is_empty() {
        return Err(CodecError::InvalidDataUrl);
    }
    Ok(EncodedImage::new(mime_type, payload))
}

/// File extension for a content type: the subtype with any `+suffix` removed.
///
/// - `image/jpeg` -> `jpeg`
/// - `image/svg+xml` -> `svg`
/// - missing or odd values -> `png`
pub fn extension_for(content_type: Option<&str>) -> String {
    content_type
        .map(essence)
        .and_then(|ct| {
            ct.split('/')
                .nth(1)
                .and_then(|sub| sub.split('+').next())
                .map(|s| s.to_string())
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "png".to_string())
}

/// Turn any [`ImageRef`] into an [`EncodedImage`] a capability can accept.
///
/// Inline images and `data:` URLs are decoded locally, anything else goes
/// through `fetcher`. Every source must pass the allow-list and carry a valid
/// payload.
pub async fn resolve<F>(fetcher: &F, image: &ImageRef) -> Result<EncodedImage, FetchError>
where
    F: ImageFetcher,
{
    match image {
        ImageRef::Inline(encoded) => Ok(revalidate(encoded)?),
        ImageRef::Url(url) if url.starts_with("data:") => Ok(revalidate(&parse_data_url(url)?)?),
        ImageRef::Url(url) => {
            let fetched = fetcher.fetch(url).await?;
            let mime_type = fetched.content_type.as_deref().unwrap_or("");
            Ok(encode(&fetched.bytes, mime_type)?)
        }
    }
}

/// Round-trip an already encoded image through the codec so the allow-list
/// and the payload check apply to it as well.
fn revalidate(image: &EncodedImage) -> Result<EncodedImage, CodecError> {
    let bytes = decode(image)?;
    encode(&bytes, &image.mime_type)
}

/// Raw bytes and content type for any [`ImageRef`], without the allow-list.
pub(crate) async fn load_bytes<F>(
    fetcher: &F,
    image: &ImageRef,
) -> Result<(Vec<u8>, Option<String>), FetchError>
where
    F: ImageFetcher,
{
    let inline = match image {
        ImageRef::Inline(encoded) => encoded.clone(),
        ImageRef::Url(url) if url.starts_with("data:") => parse_data_url(url)?,
        ImageRef::Url(url) => {
            let fetched = fetcher.fetch(url).await?;
            return Ok((fetched.bytes, fetched.content_type));
        }
    };
    let bytes = decode(&inline)?;
    Ok((bytes, Some(inline.mime_type)))
}

/// Lowercased MIME type without parameters (`image/png; q=1` -> `image/png`).
fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
