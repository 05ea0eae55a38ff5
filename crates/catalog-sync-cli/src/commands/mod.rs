pub mod check;
pub mod chunk;
pub mod format;
pub mod product;
pub mod products;
pub mod prune;
pub mod start;
pub mod status;
pub mod sync;
