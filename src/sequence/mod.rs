//! Sequence assembly for the model.
//!
//! Combines question and context tokens into fixed-length inputs. Context
//! that does not fit is split into overlapping windows, each becoming an
//! independent [`EncodedSequence`].
//!
//! - **window**: window planning over context tokens
//! - **builder**: per-window layout, segment ids, padding and offsets

pub mod builder;
pub mod window;

pub use builder::{CLS_INDEX, EncodedSequence, SPECIAL_TOKEN_COUNT, SequenceBuilder};
pub use window::{effective_stride, plan_windows};
