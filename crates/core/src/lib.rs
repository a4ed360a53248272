pub mod authenticity;
pub mod detection;
pub mod imaging;
pub mod pipeline;
pub mod shared;
pub mod templates;

#[cfg(test)]
pub(crate) mod testutil;
