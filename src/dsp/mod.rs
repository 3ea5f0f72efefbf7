//! DSP: deterministic synthesis of element cues.
//!
//! Everything here is pure and allocation-local: one call renders one
//! element into a buffer nobody else sees. The same code backs the WASM
//! preview and the offline batch export.

pub mod buffer;
pub mod envelope;
pub mod harmonics;
pub mod renderer;
pub mod synth;

pub use buffer::SampleBuffer;
pub use envelope::EnvelopeShaper;
pub use harmonics::{HarmonicMapper, HarmonicProfile, Overtone};
pub use renderer::{CueRenderer, encode_wav, write_wav};
pub use synth::Synthesizer;
