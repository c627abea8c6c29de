//! I/O infrastructure: scanner transport, artifacts, collaborator boundary.

pub mod aux;
pub mod export;
pub mod tim;
