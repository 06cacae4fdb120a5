pub mod positions;
pub mod claims;
pub mod records;
pub mod store;
pub mod merge;

#[cfg(test)]
mod tests;
