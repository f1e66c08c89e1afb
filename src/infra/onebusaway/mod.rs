mod client;

pub use client::OneBusAwayClient;
