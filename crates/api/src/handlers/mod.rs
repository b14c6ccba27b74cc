pub mod search;
pub mod segments;
