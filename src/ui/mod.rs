//! Terminal presentation: the page shell, the half-block pixel widget and
//! the error screen.

pub mod error;
pub mod halfblock;
pub mod shell;

pub use error::show_fatal;
pub use shell::{Page, Shell};
