pub mod config;
pub mod dsp;
pub mod element;
pub mod error;
pub mod table;

#[cfg(feature = "export")]
pub mod batch;
#[cfg(feature = "export")]
pub mod export;

use crate::config::SynthConfig;
use crate::dsp::{CueRenderer, HarmonicMapper, HarmonicProfile, SampleBuffer};
use crate::element::Block;
use crate::error::CueError;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the periodic-tones version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Render one element's cue with the default constant set.
pub fn render_cue(period: u32, group: u32, block: &str) -> Result<SampleBuffer, CueError> {
    let block: Block = block.parse()?;
    CueRenderer::new(&SynthConfig::default()).render_coordinates(period, group, block)
}

/// Harmonic profile of one element with the default constant set.
pub fn harmonics(period: u32, group: u32, block: &str) -> Result<HarmonicProfile, CueError> {
    let block: Block = block.parse()?;
    HarmonicMapper::new(&SynthConfig::default()).profile(period, group, block)
}

/// WASM-exposed: mono f32 samples of an element's cue, for AudioWorklet playback.
#[wasm_bindgen]
pub fn element_cue_samples(period: u32, group: u32, block: &str) -> Result<Vec<f32>, JsValue> {
    let buffer = render_cue(period, group, block).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(buffer.to_f32())
}

/// WASM-exposed: an element's cue as a WAV byte array.
#[wasm_bindgen]
pub fn element_cue_wav(period: u32, group: u32, block: &str) -> Result<Vec<u8>, JsValue> {
    let buffer = render_cue(period, group, block).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    dsp::encode_wav(&buffer).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: fundamental and overtones of an element as a JS object.
#[wasm_bindgen]
pub fn element_harmonics(period: u32, group: u32, block: &str) -> Result<JsValue, JsValue> {
    let profile = harmonics(period, group, block).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    serde_wasm_bindgen::to_value(&profile).map_err(|e| JsValue::from_str(&format!("{e}")))
}
