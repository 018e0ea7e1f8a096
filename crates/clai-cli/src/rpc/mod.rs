// Local-socket transport: a line-delimited JSON protocol shared by RPC
// calls (`op`-tagged, one reply line each) and the shell-hook shim path
// (`type`-tagged fire-and-forget event records).

pub mod client;
pub mod server;

pub use client::RpcClient;
pub use server::serve;
