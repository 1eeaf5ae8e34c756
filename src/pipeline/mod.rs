//! Pipeline stages for receipt analysis.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the provider stage can be swapped for a stub.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ normalize ──▶ llm ──▶ parse
//! (size/name)  (render+encode) (VLM)  (fence/JSON)
//! ```
//!
//! 1. [`validate`]  — filename present, upload within 10 MiB
//! 2. [`normalize`] — image passthrough, or PDF page 1 rendered by
//!    [`render`] and PNG-encoded by [`encode`]
//! 3. [`llm`]       — the only stage with network I/O; sits behind the
//!    [`llm::Extractor`] trait
//! 4. [`parse`]     — strip code fences, decode JSON, detect the `error` key

pub mod encode;
pub mod llm;
pub mod normalize;
pub mod parse;
pub mod render;
pub mod validate;
