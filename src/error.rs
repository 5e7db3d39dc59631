use thiserror::Error;

/// Errors from converting raw image bytes to and from their transport form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The declared MIME type is not one of JPEG, PNG or WEBP.
    #[error("Unsupported file type '{0}'. Please use one of: image/jpeg, image/png, image/webp")]
    UnsupportedFormat(String),

    /// The encoded payload is not valid base64.
    #[error("Invalid image payload: {0}")]
    InvalidPayload(String),

    /// A `data:` URL that could not be split into MIME type and payload.
    #[error("Malformed data URL")]
    InvalidDataUrl,
}

/// Errors from fetching an image behind a URL.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Cannot fetch image from {url}: {message}")]
    Connection { url: String, message: String },

    #[error("Image fetch from {url} returned HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("Failed to read image bytes from {url}: {message}")]
    Read { url: String, message: String },

    #[error("{0}")]
    Codec(#[from] CodecError),
}

/// Errors from the structured image analysis capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The capability refused the request for policy reasons.
    #[error("Analysis was blocked: {0}")]
    Blocked(String),

    /// The capability answered without any usable text.
    #[error("The model returned an empty analysis")]
    EmptyResponse,

    #[error("Cannot reach the model at {endpoint}: {message}")]
    Unreachable { endpoint: String, message: String },

    #[error("Model API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response from the model: {0}")]
    InvalidResponse(String),
}

impl AnalysisError {
    /// Whether this failure is a policy refusal rather than a transient error.
    pub fn is_blocked(&self) -> bool {
        matches!(self, AnalysisError::Blocked(_))
    }
}

/// Errors from the creative idea capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExplorationError {
    #[error("Idea exploration was blocked: {0}")]
    Blocked(String),

    #[error("The model returned no ideas payload")]
    EmptyResponse,

    /// The model answered, but not with a list of `{description, suggestedPrompt}`.
    #[error("Could not parse ideas from the model response: {0}")]
    MalformedResponse(String),

    #[error("Cannot reach the model at {endpoint}: {message}")]
    Unreachable { endpoint: String, message: String },

    #[error("Model API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response from the model: {0}")]
    InvalidResponse(String),
}

impl ExplorationError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, ExplorationError::Blocked(_))
    }
}

/// Errors from the image generation capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Image generation was blocked: {0}")]
    Blocked(String),

    #[error("The model returned no candidates")]
    NoCandidates,

    /// The call succeeded but carried no image, possibly only text diagnostics.
    #[error("No image data found in the model response{}", text_suffix(.text))]
    NoImageInResponse { text: Option<String> },

    #[error("Cannot reach the model at {endpoint}: {message}")]
    Unreachable { endpoint: String, message: String },

    #[error("Model API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response from the model: {0}")]
    InvalidResponse(String),
}

fn text_suffix(text: &Option<String>) -> String {
    text.as_deref().map(|t| format!(": {}", t)).unwrap_or_default()
}

impl GenerationError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, GenerationError::Blocked(_))
    }
}

/// Local rejections from the exploration tree. None of these mutate the tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("No exploration session has been started")]
    NoSession,

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Node {0} is already exploring ideas")]
    AlreadyExploring(String),

    #[error("Idea {index} of node {node_id} is already being generated")]
    AlreadyGenerating { node_id: String, index: usize },

    #[error("Idea {index} is not part of the current ideas of node {node_id}")]
    StaleIdeaIndex { node_id: String, index: usize },

    /// The session this operation belonged to was replaced while it was in flight.
    #[error("The exploration session was reset while node {0} was busy")]
    SessionReset(String),
}

/// Errors surfaced by [`Explorer`](crate::Explorer) operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExplorerError {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Image(#[from] FetchError),

    #[error("{0}")]
    Exploration(#[from] ExplorationError),

    #[error("{0}")]
    Generation(#[from] GenerationError),
}

impl From<CodecError> for ExplorerError {
    fn from(err: CodecError) -> Self {
        ExplorerError::Image(FetchError::Codec(err))
    }
}

/// Errors from building a session archive or idea-history document.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No known nodes were selected for export")]
    EmptySelection,

    #[error("Failed to fetch image for node {node_id}: {source}")]
    Fetch { node_id: String, source: FetchError },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the single-image edit flow.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("No image has been loaded")]
    NoImage,

    #[error("Please analyze the image first before generating an edit")]
    NotAnalyzed,

    #[error("Please enter an editing prompt")]
    EmptyPrompt,

    #[error("{0}")]
    Codec(#[from] CodecError),

    #[error("{0}")]
    Analysis(#[from] AnalysisError),

    #[error("{0}")]
    Generation(#[from] GenerationError),
}
