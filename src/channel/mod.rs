// チャンネル層 - ステージ間の有界FIFOとクローズ保証

pub mod bounded;

pub use bounded::{BoundedChannel, ProducerGuard};
