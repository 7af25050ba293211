//! Inputs consumed from the external toolchains.

mod backend;
mod fragments;

pub use backend::{decode_pdf_string, LopdfBackend, PageSource, TextPages};
pub use fragments::{page_number_from_name, FragmentSet};
