//! View helpers: the filter input clear control and the empty-results banner.

pub mod error;
pub mod inputs;
pub mod narrow_error;

pub use {
    error::{Error, Result},
    inputs::{ClickTarget, FilterInputGroup, InputEvent, TextInput, clear_input},
    narrow_error::{NarrowBannerData, QueryWord, SearchData, narrow_error},
};
