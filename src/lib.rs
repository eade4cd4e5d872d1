//! Converting ChessBase databases (`.cbh`/`.cbg`/`.cbp`/`.cbt`) into
//! PGN. The interesting part is [`decode`]: a stateful interpreter that
//! reverses the context-dependent move-stream byte encoding against a
//! shadow board and piece catalog.

/// Batch conversion drivers and the per-record pipeline.
pub mod convert;
/// The four memory-mapped database files.
pub mod db;
/// The move-stream decoder.
pub mod decode;
/// Squares, chessmen, the board/catalog pair, and the game tree.
pub mod model;
/// FEN, SAN, and PGN output.
pub mod notation;
