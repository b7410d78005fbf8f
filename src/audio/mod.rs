pub mod file;
pub mod pcm;

pub use file::AudioFile;
pub use pcm::{decode_base64_pcm, encode_base64_pcm, DecodeError};
