/// Song entities served by catalog backends.
pub mod models;
/// Read-only song catalog consulted when rooms are created.
pub mod song_catalog;
/// Errors shared by catalog backends.
pub mod storage;
