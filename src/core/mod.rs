// Shared helpers used across the input pipeline

pub mod analog;
