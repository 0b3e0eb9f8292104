//! Python bindings via PyO3
//!
//! `Bridge` exposes the handle-based marshalling surface to Python.

mod bindings;

pub use bindings::PyBridge;
