pub mod app;
pub mod client;
pub mod conf;
pub mod guard;
pub mod labels;
pub mod notify;
pub mod ports;
pub mod retry;
pub mod topic;
pub mod trigger;

#[cfg(test)]
mod testing;
