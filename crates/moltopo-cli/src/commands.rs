pub mod convert;
pub mod graph;
pub mod info;
pub mod replicate;
pub mod strip;
