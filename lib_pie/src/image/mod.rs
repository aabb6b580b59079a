pub mod decoder;
pub mod encoder;
pub mod format;
pub mod validate;

pub use decoder::{decode, decode_to_vec, decode_with_palette, required_decoded_size};
pub use encoder::{encode, encode_to_vec, encode_with_palette, max_encoded_size};
