pub mod batch;
pub mod matchers;
pub mod scan;
pub mod syncer;
