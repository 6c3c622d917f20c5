// Engine modules: input pipeline and device adapters

pub mod devices;
pub mod input;
