// gifstamp - watermarking for animated GIFs

pub mod cache;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod scheduler;
pub mod watermark;
