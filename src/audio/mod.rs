pub mod chroma;
pub mod decode;
pub mod features;
pub mod frame;
pub mod onset;
pub mod presets;
pub mod segment;
pub mod spectrum;
pub mod timeline;
pub mod track;
