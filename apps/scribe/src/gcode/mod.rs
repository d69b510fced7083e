// G-code export: glyph strokes, program emission, validation, and the
// background job machinery behind the Export API.
// Emission is CPU-bound and runs inside tokio::task::spawn_blocking.

pub mod emitter;
pub mod glyphs;
pub mod handlers;
pub mod job;
pub mod registry;
pub mod validator;
