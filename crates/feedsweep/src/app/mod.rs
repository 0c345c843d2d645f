//! Application layer: card resolution, sweeping, and the page-lifetime wiring.

pub mod activation;
pub mod remover;
pub mod resolver;
pub mod signatures;
pub mod subscription;
pub mod sweeper;
