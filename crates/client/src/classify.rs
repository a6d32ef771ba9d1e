//! Request classification.
//!
//! Rules are evaluated in [`PRIORITY`] order and the first match wins. The
//! order matters for overlapping URLs: `/rest/v1/avatar.png` is an image, not
//! an API call.

use reqwest::Method;
use stowaway_core::AppConfig;

use crate::fetch::{FetchRequest, RequestMode};

/// Image file extensions, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "ico"];

/// The class of an intercepted `GET` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    Image,
    Api,
    Navigation,
    Static,
}

/// Evaluation order. `Static` matches everything, so classification is total.
pub const PRIORITY: [RequestClass; 4] =
    [RequestClass::Image, RequestClass::Api, RequestClass::Navigation, RequestClass::Static];

impl RequestClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestClass::Image => "image",
            RequestClass::Api => "api",
            RequestClass::Navigation => "navigation",
            RequestClass::Static => "static",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    api_markers: Vec<String>,
}

impl Classifier {
    pub fn new(api_markers: Vec<String>) -> Self {
        Self { api_markers }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.api_path_markers.clone())
    }

    /// Classify a request, or `None` for anything that is not a `GET`.
    ///
    /// `None` means the request must bypass the caching layer entirely.
    pub fn classify(&self, request: &FetchRequest) -> Option<RequestClass> {
        if request.method != Method::GET {
            return None;
        }

        PRIORITY.into_iter().find(|class| self.matches(*class, request))
    }

    fn matches(&self, class: RequestClass, request: &FetchRequest) -> bool {
        match class {
            RequestClass::Image => has_image_extension(request.url.path()),
            RequestClass::Api => {
                let url = request.url.as_str();
                self.api_markers.iter().any(|marker| url.contains(marker.as_str()))
            }
            RequestClass::Navigation => request.mode == RequestMode::Navigate,
            RequestClass::Static => true,
        }
    }
}

fn has_image_extension(path: &str) -> bool {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}
