//! Static catalog of speech model sizes and where their weights live.

use serde::Serialize;

/// Base URL of the whisper.cpp ggml weights repository.
pub const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// A selectable model size.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ModelOption {
    pub name: &'static str,
    pub description: &'static str,
}

/// Sizes offered by `GET /models`, smallest first.
pub const MODEL_OPTIONS: [ModelOption; 5] = [
    ModelOption {
        name: "tiny",
        description: "39M parameters, fastest, least accurate",
    },
    ModelOption {
        name: "base",
        description: "74M parameters, fast, good for quick transcription",
    },
    ModelOption {
        name: "small",
        description: "244M parameters, balanced",
    },
    ModelOption {
        name: "medium",
        description: "769M parameters, good accuracy (recommended)",
    },
    ModelOption {
        name: "large",
        description: "1550M parameters, best accuracy, slowest",
    },
];

pub fn find(name: &str) -> Option<&'static ModelOption> {
    MODEL_OPTIONS.iter().find(|opt| opt.name == name)
}

/// File name of the ggml weights for `name`.
///
/// `large` has no unversioned build upstream and resolves to the latest release.
/// Any other name (`medium.en`, `large-v2`, ...) maps straight through.
pub fn weights_file_name(name: &str) -> String {
    let resolved = match name {
        "large" => "large-v3",
        other => other,
    };
    format!("ggml-{resolved}.bin")
}

pub fn weights_url(name: &str) -> String {
    format!("{MODEL_BASE_URL}/{}", weights_file_name(name))
}
