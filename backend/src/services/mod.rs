pub mod fallback;
pub mod fetcher;
pub mod formatting;
pub mod metadata;
pub mod thumbnail;
pub mod transcript;
pub mod youtube;

#[cfg(test)]
pub mod testing;
