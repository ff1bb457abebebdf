//! Model-level tests.
//!
//! These exercise the whole pipeline through [`Model`](crate::model::Model):
//! building, caching of derived stages and the failure modes of each stage.
