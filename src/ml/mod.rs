pub mod converter;
pub mod inference;

pub use converter::{convert_canvas, load_canvas_image, IMAGE_SIZE, INPUT_LEN, NUM_CLASSES};
pub use inference::InferenceEngine;
