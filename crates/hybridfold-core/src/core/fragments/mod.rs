pub mod library;

pub use library::{Fragment, FragmentError, FragmentLibrary, Frame};
