// ── ReturnBot Atoms ────────────────────────────────────────────────────────
// Cross-cutting primitives with no dependency on the engine.

pub mod error;
