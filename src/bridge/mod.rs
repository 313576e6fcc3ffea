//! Host bridges. The only one shipped speaks JSON lines over stdio.

pub mod stdio;
