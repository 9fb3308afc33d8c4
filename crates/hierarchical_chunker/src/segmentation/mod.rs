// src/segmentation/mod.rs

pub mod unicode;
