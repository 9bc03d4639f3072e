pub mod audio_engine;
pub mod capture_devices;
pub mod decoder;
pub mod delegate;
pub mod encoder;
pub mod player;
