pub mod locks;
pub mod state;
pub mod test_utils;
