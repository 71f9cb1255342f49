//! Vision classification: classifier seam, prompt, and the OpenAI-compatible client.

mod classifier;
mod openai;

pub use classifier::{
    build_prompt, ClassifyError, ImageClassifier, UNAVAILABLE_SENTINEL,
    UNRECOGNIZED_SENTINEL,
};
pub use openai::OpenAiClient;
