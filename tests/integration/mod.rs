//! Integration tests for the version-control status cache

mod cache_end_to_end;
mod git_working_copy;
mod shutdown;
mod support;
