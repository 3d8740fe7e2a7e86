//! Cross-cutting utility functions shared by the rest of the crate.
//!
//! Submodules:
//! - [`cores`] — CPU core counting via [`std::thread::available_parallelism`],
//!   used by [`crate::workerpool::WorkerPool`] to clamp `max_threads`.
//! - [`file_list`] — recursive directory expansion, used by
//!   [`crate::vdir::VDir::load_folder`] to enumerate a tree's regular files.

pub mod cores;
pub mod file_list;

pub use cores::count_cores;
pub use file_list::create_file_list;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_cores_at_least_one() {
        assert!(count_cores() >= 1);
    }
}
