// Audio module
// Track timing read from WAV headers; sample data is never decoded

pub mod ingest;

pub use ingest::{companion_wav_path, ingest_wav, read_track_info, AudioError, TrackInfo};
