use serde::{Deserialize, Serialize};

/// Identifier of a node in the exploration tree.
pub type NodeId = String;

/// An image in transport form: base64 payload plus its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    pub mime_type: String,
    /// Standard base64, no `data:` prefix.
    pub data: String,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Render as a `data:<mime>;base64,<payload>` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Where a node's image lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum ImageRef {
    /// Image bytes held in memory, e.g. generated output.
    Inline(EncodedImage),
    /// A remote or `data:` URL, e.g. a default sample image.
    Url(String),
}

impl ImageRef {
    /// The image as something a browser could display.
    pub fn as_url(&self) -> String {
        match self {
            ImageRef::Inline(image) => image.to_data_url(),
            ImageRef::Url(url) => url.clone(),
        }
    }
}

impl From<EncodedImage> for ImageRef {
    fn from(image: EncodedImage) -> Self {
        ImageRef::Inline(image)
    }
}

/// A candidate creative direction proposed for an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Idea {
    pub description: String,
    pub suggested_prompt: String,
}

impl Idea {
    pub fn new(description: impl Into<String>, suggested_prompt: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            suggested_prompt: suggested_prompt.into(),
        }
    }
}

/// One completed exploration: the image that was explored and what came back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeasHistoryItem {
    pub node_id: NodeId,
    pub image_url: String,
    pub ideas: Vec<Idea>,
    pub created_at: String,
}

/// Raw bytes returned by an [`ImageFetcher`](crate::ImageFetcher).
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}
