// ABOUTME: Data models shared across the console

pub mod records;

pub use records::{ChallengeSummary, ContainerInfo, GameSummary, TeamSummary};
