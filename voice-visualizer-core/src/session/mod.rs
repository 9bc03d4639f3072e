pub mod acquisition;
mod capture;
mod cleanup;
mod decode;
mod playback;
mod sampler;
pub mod visualizer;

#[cfg(test)]
pub(crate) mod test_support;
