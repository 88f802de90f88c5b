//! External Generation Collaborators
//!
//! Trait interfaces and HTTP implementations for the text, image, and
//! speech generation services. Service internals are opaque; the
//! pipeline only depends on these contracts. Every call carries an
//! explicit timeout, and a timed-out call is the calling phase's
//! failure.

pub mod errors;
pub mod images;
pub mod llm;
pub mod speech;

pub use errors::ServiceError;
pub use images::{GeneratedImage, HttpImageGenerationService, ImageDimensions, ImageGenerationService};
pub use llm::{
    GenerationRequest, GenerationResponse, HttpTextGenerationService, TextGenerationService,
    TokenUsage,
};
pub use speech::{HttpSpeechService, SpeechItem, SpeechResult, SpeechService};
