pub mod cpu;
pub mod export;
pub mod layout;
pub mod pipeline;
