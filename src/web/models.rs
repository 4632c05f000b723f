// Request and response shapes of the render API

use serde::{Deserialize, Serialize};

/// How the rendered result travels back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Image bytes as the response body, errors as bare status codes.
    Raw,
    /// Always HTTP 200 with a [`RenderEnvelope`] body.
    Envelope,
}

/// Diagram source extracted (and decoded) from a single request.
///
/// Kept as bytes: a raw `POST /d2` body reaches the renderer exactly as it was sent.
#[derive(Debug, Clone)]
pub struct DiagramRequest {
    pub text: Vec<u8>,
    pub mode: ResponseMode,
}

/// Query parameters of the `GET /d2/png*` routes, in the order they were sent
#[derive(Deserialize, Debug, Default)]
#[serde(transparent)]
pub struct DiagramQuery(Vec<(String, String)>);

impl DiagramQuery {
    /// The first `diagram` value; repeats are ignored.
    pub fn diagram(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == "diagram")
            .map(|(_, value)| value.as_str())
    }
}

/// JSON body accepted by `POST /d2`
#[derive(Deserialize, Debug)]
pub struct DiagramJsonRequest {
    #[serde(default)]
    pub diagram: String,
}

/// JSON body returned by `POST /d2`.
///
/// Exactly one field is present: `png` holds the rendered image encoded as standard
/// (padded) base64, `error` the reason rendering failed.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct RenderEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
