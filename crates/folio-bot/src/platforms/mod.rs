//! Chat platform adapters
//!
//! Each adapter implements [`folio_core::ChatPort`]. The console
//! adapter is the reference implementation; a real messenger adapter
//! plugs in the same way.

pub mod console;

pub use console::ConsolePort;
