pub mod segment_repo;

pub use segment_repo::SegmentRepo;
