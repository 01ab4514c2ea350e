pub mod config;
pub mod duplex;
pub mod link;
pub mod proto;
pub mod runtime;
pub mod sim;
pub mod viz;

#[cfg(test)]
mod test;
